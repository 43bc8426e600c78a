//! Object operations.
//!
//! Management calls address objects through the encoded
//! `bucket:filename` entry. Upload calls authenticate with an upload
//! token instead of the management token.

use crate::client::{
    self, KodoClient, CONTENT_TYPE_JSON, CONTENT_TYPE_STREAM, CONTENT_TYPE_URLENCODED,
};
use crate::config::Config;
use crate::sign::UploadPolicy;
use bridge_core::utils::nonce_str;
use bridge_core::{Context, Result};
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use serde_json::{json, Map, Value};

/// Options for direct uploads.
#[derive(Clone, Debug)]
pub struct UploadOptions {
    /// Storage type of the object (0 standard, 1 infrequent, 2
    /// archive, 3 deep archive, 4 archive instant retrieval).
    pub storage_type: u8,
    /// Custom variables, echoed back through `$(x:key)` magic
    /// variables in the response body.
    pub custom: Vec<(String, String)>,
    /// Custom metadata, stored as `x-qn-meta-*`.
    pub meta: Vec<(String, String)>,
    /// Upload token validity in seconds.
    pub expire: i64,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            storage_type: 0,
            custom: Vec::new(),
            meta: Vec::new(),
            expire: 3600,
        }
    }
}

/// Lifecycle transitions in days after upload. Unset fields are left
/// untouched, `-1` cancels a transition.
#[derive(Clone, Copy, Debug, Default)]
pub struct Lifecycle {
    pub to_ia_after_days: Option<i32>,
    pub to_archive_ir_after_days: Option<i32>,
    pub to_archive_after_days: Option<i32>,
    pub to_deep_archive_after_days: Option<i32>,
    pub delete_after_days: Option<i32>,
}

impl Lifecycle {
    fn segments(&self) -> String {
        let mut path = String::new();
        if let Some(days) = self.to_ia_after_days {
            path.push_str(&format!("/toIAAfterDays/{days}"));
        }
        if let Some(days) = self.to_archive_ir_after_days {
            path.push_str(&format!("/toArchiveIRAfterDays/{days}"));
        }
        if let Some(days) = self.to_archive_after_days {
            path.push_str(&format!("/toArchiveAfterDays/{days}"));
        }
        if let Some(days) = self.to_deep_archive_after_days {
            path.push_str(&format!("/toDeepArchiveAfterDays/{days}"));
        }
        if let Some(days) = self.delete_after_days {
            path.push_str(&format!("/deleteAfterDays/{days}"));
        }
        path
    }
}

/// One entry of a [`Objects::batch`] call.
#[derive(Clone, Debug)]
pub enum BatchOperation {
    /// Query object metadata.
    Stat { filename: String },
    /// Change mime type, metadata or both.
    ChangeMeta {
        filename: String,
        mime_type: Option<String>,
        meta: Vec<(String, String)>,
        cond: Vec<(String, String)>,
    },
    /// Move an object. `target_bucket` of `None` stays in the source
    /// bucket.
    Move {
        source: String,
        target: String,
        target_bucket: Option<String>,
        force: bool,
    },
    /// Copy an object.
    Copy {
        source: String,
        target: String,
        target_bucket: Option<String>,
        force: bool,
    },
    /// Delete an object.
    Delete { filename: String },
    /// Enable or disable an object.
    SetStatus { filename: String, disable: bool },
    /// Change the storage type.
    SetStorageType { filename: String, storage_type: u8 },
    /// Thaw an archived object for `duration` days.
    Thaw { filename: String, duration: u8 },
    /// Delete the object `duration` days after upload, 0 cancels.
    SetExpireDeleteDuration { filename: String, duration: u32 },
    /// Change lifecycle transitions.
    SetLifecycle { filename: String, rules: Lifecycle },
}

impl BatchOperation {
    fn render(&self, bucket: &str) -> String {
        match self {
            Self::Stat { filename } => {
                format!("op=/stat/{}", client::entry(bucket, filename))
            }
            Self::ChangeMeta {
                filename,
                mime_type,
                meta,
                cond,
            } => format!(
                "op={}",
                chgm_path(&client::entry(bucket, filename), mime_type.as_deref(), meta, cond)
            ),
            Self::Move {
                source,
                target,
                target_bucket,
                force,
            } => format!(
                "op={}",
                transfer_path("move", bucket, source, target, target_bucket.as_deref(), *force)
            ),
            Self::Copy {
                source,
                target,
                target_bucket,
                force,
            } => format!(
                "op={}",
                transfer_path("copy", bucket, source, target, target_bucket.as_deref(), *force)
            ),
            Self::Delete { filename } => {
                format!("op=/delete/{}", client::entry(bucket, filename))
            }
            Self::SetStatus { filename, disable } => format!(
                "op=/chstatus/{}/status/{}",
                client::entry(bucket, filename),
                u8::from(*disable)
            ),
            Self::SetStorageType {
                filename,
                storage_type,
            } => format!(
                "op=/chtype/{}/type/{storage_type}",
                client::entry(bucket, filename)
            ),
            Self::Thaw { filename, duration } => format!(
                "op=/restoreAr/{}/freezeAfterDays/{duration}",
                client::entry(bucket, filename)
            ),
            Self::SetExpireDeleteDuration { filename, duration } => format!(
                "op=/deleteAfterDays/{}/{duration}",
                client::entry(bucket, filename)
            ),
            Self::SetLifecycle { filename, rules } => format!(
                "op=/lifecycle/{}{}",
                client::entry(bucket, filename),
                rules.segments()
            ),
        }
    }
}

/// Object operations on one bucket.
#[derive(Clone, Debug)]
pub struct Objects {
    client: KodoClient,
    bucket: String,
}

impl Objects {
    /// Create the facade over the configured default bucket.
    pub fn new(ctx: Context, config: Config) -> Result<Self> {
        Ok(Self {
            client: KodoClient::new(ctx, config)?,
            bucket: String::new(),
        })
    }

    /// Target another bucket than the configured one.
    pub fn set_bucket(&mut self, name: impl Into<String>) -> &mut Self {
        self.bucket = name.into();
        self
    }

    fn bucket(&self) -> Result<&str> {
        client::require_bucket(&self.bucket, self.client.config())
    }

    fn entry(&self, filename: &str) -> Result<String> {
        Ok(client::entry(self.bucket()?, filename))
    }

    /// Upload an object through this process.
    ///
    /// Builds the multipart form body, including a CRC32 of the data,
    /// and asks the gateway to echo name, size, hash and the custom
    /// variables back.
    pub async fn upload(&self, filename: &str, data: &[u8], options: UploadOptions) -> Result<Value> {
        let fields = self.upload_form_fields(filename, data, &options)?;
        let (content_type, body) = form_data(&fields, filename, data);
        let headers = vec![(CONTENT_TYPE.to_string(), content_type)];
        self.client
            .send(
                Method::POST,
                self.client.region().upload,
                "/",
                headers,
                Vec::new(),
                Some(body),
                false,
            )
            .await
    }

    /// Describe a direct upload for a client to perform itself.
    ///
    /// Returns the method, URL, form fields and token; the client adds
    /// the file under the `file` form key.
    pub fn client_upload(
        &self,
        filename: &str,
        data: &[u8],
        options: UploadOptions,
    ) -> Result<Value> {
        let fields = self.upload_form_fields(filename, data, &options)?;
        let body: Map<String, Value> = fields
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        Ok(json!({
            "method": "POST",
            "url": format!("{}://{}", self.client.scheme(), self.client.region().upload),
            "content_type": "multipart/form-data",
            "header": {},
            "query": {},
            "body": body,
            "file_key": "file",
            "file_path": self.access_path(filename),
        }))
    }

    /// Public URL of an object behind the configured access domain.
    pub fn access_path(&self, filename: &str) -> String {
        format!(
            "{}://{}/{filename}",
            self.client.scheme(),
            self.client.config().access_domain
        )
    }

    fn upload_form_fields(
        &self,
        filename: &str,
        data: &[u8],
        options: &UploadOptions,
    ) -> Result<Vec<(String, String)>> {
        let bucket = self.bucket()?.to_string();
        let mut return_body = Map::new();
        return_body.insert("name".to_string(), json!("$(fname)"));
        return_body.insert("size".to_string(), json!("$(fsize)"));
        return_body.insert("hash".to_string(), json!("$(etag)"));
        let mut fields = vec![
            ("key".to_string(), filename.to_string()),
            ("fileName".to_string(), filename.to_string()),
            ("crc32".to_string(), crc32fast::hash(data).to_string()),
        ];
        for (key, value) in &options.custom {
            return_body.insert(key.clone(), json!(format!("$(x:{key})")));
            fields.push((format!("x:{key}"), value.clone()));
        }
        for (key, value) in &options.meta {
            fields.push((format!("x-qn-meta-{key}"), value.clone()));
        }
        let policy = UploadPolicy {
            scope: format!("{bucket}:{filename}"),
            deadline: self.client.deadline(options.expire),
            return_body: Some(Value::Object(return_body).to_string()),
            file_type: Some(options.storage_type),
        };
        let token = self.client.upload_token(&policy)?;
        fields.push(("token".to_string(), token));
        Ok(fields)
    }

    fn up_auth(&self, filename: &str, expire: i64, file_type: Option<u8>) -> Result<(String, String)> {
        let mut policy = UploadPolicy::new(self.bucket()?, filename, self.client.deadline(expire));
        policy.file_type = file_type;
        Ok((
            AUTHORIZATION.to_string(),
            format!("UpToken {}", self.client.upload_token(&policy)?),
        ))
    }

    fn uploads_path(&self, filename: &str) -> Result<String> {
        Ok(format!(
            "/buckets/{}/objects/{}/uploads",
            self.bucket()?,
            client::encode(filename)
        ))
    }

    /// Start a multipart upload, returns the upload id.
    pub async fn init_part(&self, filename: &str, storage_type: u8, expire: i64) -> Result<Value> {
        let path = self.uploads_path(filename)?;
        let headers = vec![
            (CONTENT_TYPE.to_string(), CONTENT_TYPE_URLENCODED.to_string()),
            self.up_auth(filename, expire, Some(storage_type))?,
        ];
        self.client
            .send(
                Method::POST,
                self.client.region().upload,
                &path,
                headers,
                Vec::new(),
                None,
                false,
            )
            .await
    }

    /// Upload one part, `part_number` in 1-1000.
    pub async fn upload_part(
        &self,
        filename: &str,
        upload_id: &str,
        part_number: u32,
        data: Vec<u8>,
        expire: i64,
    ) -> Result<Value> {
        let path = format!("{}/{upload_id}/{part_number}", self.uploads_path(filename)?);
        let headers = vec![
            (CONTENT_TYPE.to_string(), CONTENT_TYPE_STREAM.to_string()),
            self.up_auth(filename, expire, None)?,
        ];
        self.client
            .send(
                Method::PUT,
                self.client.region().upload,
                &path,
                headers,
                Vec::new(),
                Some(Bytes::from(data)),
                false,
            )
            .await
    }

    /// Describe one part upload for a client to perform itself.
    pub fn client_upload_part(
        &self,
        filename: &str,
        upload_id: &str,
        part_number: u32,
        expire: i64,
    ) -> Result<Value> {
        let path = format!("{}/{upload_id}/{part_number}", self.uploads_path(filename)?);
        let (_, token) = self.up_auth(filename, expire, None)?;
        Ok(json!({
            "method": "PUT",
            "url": format!("{}://{}{path}", self.client.scheme(), self.client.region().upload),
            "content_type": CONTENT_TYPE_STREAM,
            "header": { "Authorization": token },
            "query": {},
            "part_number": part_number,
            "file_path": self.access_path(filename),
        }))
    }

    /// Combine uploaded parts into the final object.
    pub async fn complete_part(
        &self,
        filename: &str,
        upload_id: &str,
        parts: &[(u32, String)],
        expire: i64,
    ) -> Result<Value> {
        let path = format!("{}/{upload_id}", self.uploads_path(filename)?);
        let part_list: Vec<Value> = parts
            .iter()
            .map(|(number, etag)| json!({"partNumber": number, "etag": etag}))
            .collect();
        let body = json!({"parts": part_list, "fname": filename}).to_string();
        let headers = vec![
            (CONTENT_TYPE.to_string(), CONTENT_TYPE_JSON.to_string()),
            self.up_auth(filename, expire, None)?,
        ];
        self.client
            .send(
                Method::POST,
                self.client.region().upload,
                &path,
                headers,
                Vec::new(),
                Some(Bytes::from(body)),
                false,
            )
            .await
    }

    /// Abort a multipart upload.
    pub async fn stop_part(&self, filename: &str, upload_id: &str, expire: i64) -> Result<Value> {
        let path = format!("{}/{upload_id}", self.uploads_path(filename)?);
        let headers = vec![
            (CONTENT_TYPE.to_string(), CONTENT_TYPE_URLENCODED.to_string()),
            self.up_auth(filename, expire, None)?,
        ];
        self.client
            .send(
                Method::DELETE,
                self.client.region().upload,
                &path,
                headers,
                Vec::new(),
                None,
                false,
            )
            .await
    }

    /// List uploaded parts of a multipart upload.
    pub async fn part_list(
        &self,
        filename: &str,
        upload_id: &str,
        part_number_marker: Option<u32>,
        max_parts: u32,
    ) -> Result<Value> {
        let path = format!("{}/{upload_id}", self.uploads_path(filename)?);
        let mut query = vec![("max-parts".to_string(), Some(max_parts.to_string()))];
        if let Some(marker) = part_number_marker {
            query.push(("part-number-marker".to_string(), Some(marker.to_string())));
        }
        let headers = vec![self.up_auth(filename, 10, None)?];
        self.client
            .send(Method::GET, self.client.region().upload, &path, headers, query, None, false)
            .await
    }

    /// Enumerate objects. `limit` of 0 means the server default.
    pub async fn list(
        &self,
        marker: Option<&str>,
        limit: u32,
        prefix: Option<&str>,
        delimiter: Option<&str>,
    ) -> Result<Value> {
        let mut query = vec![("bucket".to_string(), Some(self.bucket()?.to_string()))];
        if let Some(marker) = marker {
            query.push(("marker".to_string(), Some(marker.to_string())));
        }
        if limit > 0 {
            query.push(("limit".to_string(), Some(limit.to_string())));
        }
        if let Some(prefix) = prefix {
            query.push(("prefix".to_string(), Some(client::encode(prefix))));
        }
        if let Some(delimiter) = delimiter {
            query.push(("delimiter".to_string(), Some(client::encode(delimiter))));
        }
        self.client
            .managed(
                Method::GET,
                self.client.region().object_enum,
                "/list",
                Vec::new(),
                query,
                None,
                false,
            )
            .await
    }

    /// Query object metadata.
    pub async fn get_meta_data(&self, filename: &str) -> Result<Value> {
        let path = format!("/stat/{}", self.entry(filename)?);
        self.manage(Method::GET, &path, false).await
    }

    /// Change mime type, metadata or both, optionally guarded by a
    /// condition on the current state.
    pub async fn set_meta_data(
        &self,
        filename: &str,
        mime_type: Option<&str>,
        meta: &[(String, String)],
        cond: &[(String, String)],
    ) -> Result<Value> {
        let path = chgm_path(&self.entry(filename)?, mime_type, meta, cond);
        self.manage(Method::POST, &path, true).await
    }

    /// Move an object, optionally across buckets.
    pub async fn move_to(
        &self,
        source: &str,
        target: &str,
        target_bucket: Option<&str>,
        force: bool,
    ) -> Result<Value> {
        let path = transfer_path("move", self.bucket()?, source, target, target_bucket, force);
        self.manage(Method::POST, &path, true).await
    }

    /// Copy an object, optionally across buckets.
    pub async fn copy(
        &self,
        source: &str,
        target: &str,
        target_bucket: Option<&str>,
        force: bool,
    ) -> Result<Value> {
        let path = transfer_path("copy", self.bucket()?, source, target, target_bucket, force);
        self.manage(Method::POST, &path, true).await
    }

    /// Delete an object.
    pub async fn delete(&self, filename: &str) -> Result<Value> {
        let path = format!("/delete/{}", self.entry(filename)?);
        self.manage(Method::POST, &path, true).await
    }

    /// Enable or disable an object.
    pub async fn set_status(&self, filename: &str, disable: bool) -> Result<Value> {
        let path = format!("/chstatus/{}/status/{}", self.entry(filename)?, u8::from(disable));
        self.manage(Method::POST, &path, true).await
    }

    /// Change the storage type.
    pub async fn set_storage_type(&self, filename: &str, storage_type: u8) -> Result<Value> {
        let path = format!("/chtype/{}/type/{storage_type}", self.entry(filename)?);
        self.manage(Method::POST, &path, true).await
    }

    /// Thaw an archived object, `duration` in 1-7 days.
    pub async fn thaw(&self, filename: &str, duration: u8) -> Result<Value> {
        let path = format!("/restoreAr/{}/freezeAfterDays/{duration}", self.entry(filename)?);
        self.manage(Method::POST, &path, true).await
    }

    /// Delete the object `duration` days after upload, 0 cancels.
    pub async fn set_expire_delete_duration(&self, filename: &str, duration: u32) -> Result<Value> {
        let path = format!("/deleteAfterDays/{}/{duration}", self.entry(filename)?);
        self.manage(Method::POST, &path, true).await
    }

    /// Change lifecycle transitions of an object.
    pub async fn set_lifecycle(&self, filename: &str, rules: Lifecycle) -> Result<Value> {
        let path = format!("/lifecycle/{}{}", self.entry(filename)?, rules.segments());
        self.manage(Method::POST, &path, true).await
    }

    /// Refresh an object from the bucket's mirror source.
    pub async fn image_source_update(&self, filename: &str) -> Result<Value> {
        let path = format!("/prefetch/{}", self.entry(filename)?);
        let headers = vec![(CONTENT_TYPE.to_string(), CONTENT_TYPE_URLENCODED.to_string())];
        self.client
            .managed(
                Method::POST,
                self.client.region().download,
                &path,
                headers,
                Vec::new(),
                None,
                true,
            )
            .await
    }

    /// Ask the gateway to fetch a URL into the bucket asynchronously.
    ///
    /// `options` merges into the request body next to `url` and
    /// `bucket` (callback settings, target key, etag check, ...).
    pub async fn create_async_fetch_task(&self, url: &str, options: Value) -> Result<Value> {
        let mut body = Map::new();
        body.insert("url".to_string(), json!(url));
        body.insert("bucket".to_string(), json!(self.bucket()?));
        if let Value::Object(options) = options {
            body.extend(options);
        }
        let body = Value::Object(body).to_string();
        let headers = vec![(CONTENT_TYPE.to_string(), CONTENT_TYPE_JSON.to_string())];
        self.client
            .managed(
                Method::POST,
                self.client.region().query,
                "/sisyphus/fetch",
                headers,
                Vec::new(),
                Some(body),
                false,
            )
            .await
    }

    /// Query an async fetch task by id.
    pub async fn query_async_fetch_task(&self, task_id: &str) -> Result<Value> {
        let query = vec![("id".to_string(), Some(task_id.to_string()))];
        self.client
            .managed(
                Method::GET,
                self.client.region().query,
                "/sisyphus/fetch",
                Vec::new(),
                query,
                None,
                false,
            )
            .await
    }

    /// Run several management operations in one request. The result
    /// carries one `{code, data}` entry per operation.
    pub async fn batch(&self, operations: &[BatchOperation]) -> Result<Value> {
        let bucket = self.bucket()?;
        let body = operations
            .iter()
            .map(|op| op.render(bucket))
            .collect::<Vec<_>>()
            .join("&");
        let headers = vec![(CONTENT_TYPE.to_string(), CONTENT_TYPE_URLENCODED.to_string())];
        self.client
            .managed(
                Method::POST,
                self.client.region().object_manage,
                "/batch",
                headers,
                Vec::new(),
                Some(body),
                false,
            )
            .await
    }

    async fn manage(&self, method: Method, path: &str, empty_response: bool) -> Result<Value> {
        let headers = vec![(CONTENT_TYPE.to_string(), CONTENT_TYPE_URLENCODED.to_string())];
        self.client
            .managed(
                method,
                self.client.region().object_manage,
                path,
                headers,
                Vec::new(),
                None,
                empty_response,
            )
            .await
    }
}

fn chgm_path(
    entry: &str,
    mime_type: Option<&str>,
    meta: &[(String, String)],
    cond: &[(String, String)],
) -> String {
    let mut path = format!("/chgm/{entry}");
    if let Some(mime) = mime_type {
        path.push_str(&format!("/mime/{}", client::encode(mime)));
    }
    for (key, value) in meta {
        path.push_str(&format!("/x-qn-meta-{key}/{}", client::encode(value)));
    }
    if !cond.is_empty() {
        let joined = cond
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        path.push_str(&format!("/cond/{}", client::encode(&joined)));
    }
    path
}

fn transfer_path(
    verb: &str,
    bucket: &str,
    source: &str,
    target: &str,
    target_bucket: Option<&str>,
    force: bool,
) -> String {
    let target_bucket = target_bucket.unwrap_or(bucket);
    format!(
        "/{verb}/{}/{}/force/{force}",
        client::entry(bucket, source),
        client::entry(target_bucket, target)
    )
}

fn form_data(fields: &[(String, String)], filename: &str, data: &[u8]) -> (String, Bytes) {
    let boundary = nonce_str(32);
    let mut body = Vec::new();
    for (key, value) in fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{key}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{filename}\"\r\nContent-Type: {CONTENT_TYPE_STREAM}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), Bytes::from(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chgm_path_segments() {
        let meta = vec![("author".to_string(), "me".to_string())];
        let cond = vec![("mime".to_string(), "text/plain".to_string())];
        assert_eq!(
            chgm_path("RU5UUlk=", Some("text/html"), &meta, &cond),
            "/chgm/RU5UUlk=/mime/dGV4dC9odG1s/x-qn-meta-author/bWU=/cond/bWltZT10ZXh0L3BsYWlu"
        );
    }

    #[test]
    fn test_transfer_path_defaults_to_source_bucket() {
        assert_eq!(
            transfer_path("move", "bkt", "a.txt", "b.txt", None, true),
            "/move/Ymt0OmEudHh0/Ymt0OmIudHh0/force/true"
        );
    }

    #[test]
    fn test_lifecycle_segments_keep_declared_order() {
        let rules = Lifecycle {
            to_ia_after_days: Some(10),
            delete_after_days: Some(-1),
            ..Default::default()
        };
        assert_eq!(rules.segments(), "/toIAAfterDays/10/deleteAfterDays/-1");
    }

    #[test]
    fn test_batch_operation_rendering() {
        let op = BatchOperation::SetStatus {
            filename: "a.txt".to_string(),
            disable: true,
        };
        assert_eq!(op.render("bkt"), "op=/chstatus/Ymt0OmEudHh0/status/1");
        let op = BatchOperation::Thaw {
            filename: "a.txt".to_string(),
            duration: 3,
        };
        assert_eq!(op.render("bkt"), "op=/restoreAr/Ymt0OmEudHh0/freezeAfterDays/3");
    }

    #[test]
    fn test_form_data_layout() {
        let fields = vec![("key".to_string(), "a.txt".to_string())];
        let (content_type, body) = form_data(&fields, "a.txt", b"DATA");
        let boundary = content_type
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap()
            .to_string();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert_eq!(
            body,
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"key\"\r\n\r\na.txt\r\n\
                 --{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"a.txt\"\r\nContent-Type: application/octet-stream\r\n\r\nDATA\r\n\
                 --{boundary}--\r\n"
            )
        );
    }
}
