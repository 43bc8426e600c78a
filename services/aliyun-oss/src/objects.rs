//! Object storage operations on a single bucket.

use crate::bucket::tag_set;
use crate::client::{
    headers_to_value, Headers, OssClient, Query, CONTENT_TYPE_STREAM, CONTENT_TYPE_URLENCODED,
    CONTENT_TYPE_XML,
};
use crate::config::Config;
use crate::sign::rawurlencode;
use crate::xml;
use bridge_core::hash::base64_encode;
use bridge_core::time::{self, DateTime};
use bridge_core::{Context, Error, Result};
use http::header::CONTENT_TYPE;
use http::Method;
use serde_json::{json, Value};

/// Optional headers for [`Objects::put`] and [`Objects::append`].
#[derive(Clone, Debug, Default)]
pub struct PutOptions {
    /// MIME type of the payload. Defaults to `application/octet-stream`.
    pub content_type: Option<String>,
    pub acl: Option<String>,
    pub storage_class: Option<String>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    /// Base64 MD5 of the payload for end-to-end integrity checks.
    pub content_md5: Option<String>,
    pub expires: Option<DateTime>,
    pub forbid_overwrite: Option<bool>,
    pub server_side_encryption: Option<String>,
    pub server_side_data_encryption: Option<String>,
    pub encryption_key_id: Option<String>,
    /// User metadata, sent as `x-oss-meta-{key}` headers.
    pub meta: Vec<(String, String)>,
    pub tags: Vec<(String, String)>,
}

/// Optional parameters for [`Objects::get`].
#[derive(Clone, Debug, Default)]
pub struct GetOptions {
    pub response_content_type: Option<String>,
    pub response_content_language: Option<String>,
    pub response_expires: Option<DateTime>,
    pub response_cache_control: Option<String>,
    pub response_content_disposition: Option<String>,
    pub response_content_encoding: Option<String>,
    pub range: Option<String>,
    pub if_modified_since: Option<DateTime>,
    pub if_unmodified_since: Option<DateTime>,
    pub if_match: Option<String>,
    pub if_none_match: Option<String>,
    pub accept_encoding: Option<String>,
}

/// Optional headers for [`Objects::copy`].
#[derive(Clone, Debug, Default)]
pub struct CopyOptions {
    pub acl: Option<String>,
    pub storage_class: Option<String>,
    pub if_modified_since: Option<DateTime>,
    pub if_unmodified_since: Option<DateTime>,
    pub if_match: Option<String>,
    pub if_none_match: Option<String>,
    pub server_side_encryption: Option<String>,
    pub encryption_key_id: Option<String>,
    /// `COPY` keeps the source metadata, `REPLACE` takes `meta`.
    pub metadata_directive: Option<String>,
    pub meta: Vec<(String, String)>,
    /// `COPY` keeps the source tags, `REPLACE` takes `tags`.
    pub tagging_directive: Option<String>,
    pub tags: Vec<(String, String)>,
}

/// Optional parameters for [`Objects::list`].
#[derive(Clone, Debug, Default)]
pub struct ListOptions {
    pub delimiter: Option<String>,
    pub start_after: Option<String>,
    pub continuation_token: Option<String>,
    pub max_keys: Option<u32>,
    pub prefix: Option<String>,
    pub encoding_type: Option<String>,
    pub fetch_owner: bool,
}

/// Optional headers for [`Objects::init_part`].
#[derive(Clone, Debug, Default)]
pub struct InitPartOptions {
    pub storage_class: Option<String>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub expires: Option<DateTime>,
    pub forbid_overwrite: Option<bool>,
    pub server_side_encryption: Option<String>,
    pub encryption_key_id: Option<String>,
    pub tags: Vec<(String, String)>,
}

/// Optional parameters for [`Objects::part_task_list`].
#[derive(Clone, Debug, Default)]
pub struct PartTaskListOptions {
    pub delimiter: Option<String>,
    pub max_uploads: Option<u32>,
    pub key_marker: Option<String>,
    pub prefix: Option<String>,
    pub upload_id_marker: Option<String>,
    pub encoding_type: Option<String>,
}

/// Object operations scoped to one bucket.
#[derive(Clone, Debug)]
pub struct Objects {
    client: OssClient,
    bucket: String,
}

impl Objects {
    /// Create the facade on the configured default bucket.
    pub fn new(ctx: Context, config: Config) -> Result<Self> {
        let bucket = config.bucket_name.clone();
        Ok(Self {
            client: OssClient::new(ctx, config)?,
            bucket,
        })
    }

    /// Switch to another bucket in the same region.
    pub fn set_bucket(&mut self, name: &str) {
        self.bucket = name.to_string();
    }

    fn bucket(&self) -> Result<&str> {
        if self.bucket.is_empty() {
            return Err(Error::argument_invalid("bucket name cannot be empty"));
        }
        Ok(&self.bucket)
    }

    /// Public URL of an object, honoring the configured access domain.
    pub fn access_path(&self, filename: &str) -> Result<String> {
        let config = self.client.config();
        if !config.access_domain.is_empty() {
            let scheme = if config.is_https { "https" } else { "http" };
            return Ok(format!("{scheme}://{}/{filename}", config.access_domain));
        }
        Ok(format!(
            "https://{}.{}/{filename}",
            self.bucket()?,
            self.client.region().extranet_endpoint
        ))
    }

    /// List objects, V2 protocol.
    pub async fn list(&self, options: ListOptions) -> Result<Value> {
        let mut query: Query = vec![("list-type".to_string(), Some("2".to_string()))];
        push_query(&mut query, "delimiter", options.delimiter);
        push_query(&mut query, "start-after", options.start_after);
        push_query(&mut query, "continuation-token", options.continuation_token);
        push_query(&mut query, "max-keys", options.max_keys.map(|n| n.to_string()));
        push_query(&mut query, "prefix", options.prefix);
        push_query(&mut query, "encoding-type", options.encoding_type);
        if options.fetch_owner {
            query.push(("fetch-owner".to_string(), Some("true".to_string())));
        }
        self.request_urlencoded(Method::GET, None, query).await
    }

    /// Upload an object.
    pub async fn put(&self, filename: &str, data: String, options: PutOptions) -> Result<Value> {
        let headers = put_headers(&options);
        self.client
            .request(
                Method::PUT,
                Some(self.bucket()?),
                Some(filename),
                headers,
                Vec::new(),
                Some(data),
            )
            .await
    }

    /// Download an object. Returns `{content, header}`.
    pub async fn get(&self, filename: &str, options: GetOptions) -> Result<Value> {
        let mut headers: Headers =
            vec![(CONTENT_TYPE.to_string(), CONTENT_TYPE_URLENCODED.to_string())];
        push_header(&mut headers, "Range", options.range);
        push_date_header(&mut headers, "If-Modified-Since", options.if_modified_since);
        push_date_header(&mut headers, "If-Unmodified-Since", options.if_unmodified_since);
        push_header(&mut headers, "If-Match", options.if_match);
        push_header(&mut headers, "If-None-Match", options.if_none_match);
        push_header(&mut headers, "Accept-Encoding", options.accept_encoding);

        let mut query = Query::new();
        push_query(&mut query, "response-content-type", options.response_content_type);
        push_query(
            &mut query,
            "response-content-language",
            options.response_content_language,
        );
        push_query(
            &mut query,
            "response-expires",
            options.response_expires.map(time::format_rfc3339),
        );
        push_query(&mut query, "response-cache-control", options.response_cache_control);
        push_query(
            &mut query,
            "response-content-disposition",
            options.response_content_disposition,
        );
        push_query(
            &mut query,
            "response-content-encoding",
            options.response_content_encoding,
        );

        let (content, response_headers) = self
            .client
            .request_with_headers(
                Method::GET,
                Some(self.bucket()?),
                Some(filename),
                headers,
                query,
                None,
            )
            .await?;
        Ok(json!({
            "content": content,
            "header": headers_to_value(&response_headers),
        }))
    }

    /// Server-side copy.
    pub async fn copy(
        &self,
        filename: &str,
        source_filename: &str,
        source_bucket: Option<&str>,
        options: CopyOptions,
    ) -> Result<Value> {
        let source_bucket = match source_bucket {
            Some(bucket) => bucket,
            None => self.bucket()?,
        };
        let mut headers: Headers = vec![
            (CONTENT_TYPE.to_string(), CONTENT_TYPE_URLENCODED.to_string()),
            (
                "x-oss-copy-source".to_string(),
                format!("/{source_bucket}/{source_filename}"),
            ),
        ];
        push_header(&mut headers, "x-oss-object-acl", options.acl);
        push_header(&mut headers, "x-oss-storage-class", options.storage_class);
        push_date_header(
            &mut headers,
            "x-oss-copy-source-if-modified-since",
            options.if_modified_since,
        );
        push_date_header(
            &mut headers,
            "x-oss-copy-source-if-unmodified-since",
            options.if_unmodified_since,
        );
        push_header(&mut headers, "x-oss-copy-source-if-match", options.if_match);
        push_header(&mut headers, "x-oss-copy-source-if-none-match", options.if_none_match);
        push_header(
            &mut headers,
            "x-oss-server-side-encryption",
            options.server_side_encryption,
        );
        push_header(
            &mut headers,
            "x-oss-server-side-encryption-key-id",
            options.encryption_key_id,
        );
        push_header(&mut headers, "x-oss-metadata-directive", options.metadata_directive);
        for (key, value) in &options.meta {
            headers.push((format!("x-oss-meta-{key}"), value.clone()));
        }
        push_header(&mut headers, "x-oss-tagging-directive", options.tagging_directive);
        if !options.tags.is_empty() {
            headers.push(("x-oss-tagging".to_string(), tag_query(&options.tags)));
        }
        self.client
            .request(
                Method::PUT,
                Some(self.bucket()?),
                Some(filename),
                headers,
                Vec::new(),
                None,
            )
            .await
    }

    /// Append to an appendable object at the given position.
    pub async fn append(
        &self,
        filename: &str,
        position: u64,
        data: String,
        options: PutOptions,
    ) -> Result<Value> {
        let headers = put_headers(&options);
        let query = vec![
            ("append".to_string(), None),
            ("position".to_string(), Some(position.to_string())),
        ];
        self.client
            .request(
                Method::POST,
                Some(self.bucket()?),
                Some(filename),
                headers,
                query,
                Some(data),
            )
            .await
    }

    /// Delete an object. `Some("")` as the version id deletes the
    /// `null` version permanently.
    pub async fn delete(&self, filename: &str, version_id: Option<&str>) -> Result<Value> {
        let mut query = Query::new();
        if let Some(version) = version_id {
            let version = if version.is_empty() { "null" } else { version };
            query.push(("versionId".to_string(), Some(version.to_string())));
        }
        self.request_urlencoded(Method::DELETE, Some(filename), query)
            .await
    }

    /// Delete up to 1000 objects in one request. Each entry is a file
    /// name with an optional version id, empty meaning the `null`
    /// version.
    pub async fn delete_multiple(
        &self,
        files: &[(String, Option<String>)],
        quiet: bool,
        encoding_type: Option<&str>,
    ) -> Result<Value> {
        let objects: Vec<Value> = files
            .iter()
            .map(|(key, version)| match version {
                Some(version) => json!({
                    "Key": key,
                    "VersionId": if version.is_empty() { "null" } else { version },
                }),
                None => json!({"Key": key}),
            })
            .collect();
        let body = xml::to_xml(
            "Delete",
            &json!({
                "Quiet": if quiet { "true" } else { "false" },
                "Object": objects,
            }),
        )?;
        let mut headers: Headers = vec![
            (CONTENT_TYPE.to_string(), CONTENT_TYPE_XML.to_string()),
            (
                "Content-MD5".to_string(),
                base64_encode(&md5::compute(body.as_bytes()).0),
            ),
        ];
        push_header(&mut headers, "Encoding-type", encoding_type.map(str::to_string));
        self.client
            .request(
                Method::POST,
                Some(self.bucket()?),
                None,
                headers,
                vec![("delete".to_string(), None)],
                Some(body),
            )
            .await
    }

    /// Object headers without the body.
    pub async fn head(
        &self,
        filename: &str,
        version_id: Option<&str>,
        if_match: Option<&str>,
        if_none_match: Option<&str>,
    ) -> Result<Value> {
        let mut headers = Headers::new();
        push_header(&mut headers, "If-Match", if_match.map(str::to_string));
        push_header(&mut headers, "If-None-Match", if_none_match.map(str::to_string));
        let mut query = Query::new();
        push_query(&mut query, "versionId", version_id.map(str::to_string));
        let (_, response_headers) = self
            .client
            .request_with_headers(
                Method::HEAD,
                Some(self.bucket()?),
                Some(filename),
                headers,
                query,
                None,
            )
            .await?;
        Ok(headers_to_value(&response_headers))
    }

    /// Object metadata (ETag, size, last modified) without the body.
    pub async fn meta(&self, filename: &str, version_id: Option<&str>) -> Result<Value> {
        let headers = vec![(CONTENT_TYPE.to_string(), CONTENT_TYPE_URLENCODED.to_string())];
        let mut query: Query = vec![("objectMeta".to_string(), None)];
        push_query(&mut query, "versionId", version_id.map(str::to_string));
        let (_, response_headers) = self
            .client
            .request_with_headers(
                Method::HEAD,
                Some(self.bucket()?),
                Some(filename),
                headers,
                query,
                None,
            )
            .await?;
        Ok(headers_to_value(&response_headers))
    }

    /// Restore an archived object for `days` days.
    pub async fn restore(&self, filename: &str, days: u32, tier: Option<&str>) -> Result<Value> {
        let mut body = json!({"Days": days.to_string()});
        if let Some(tier) = tier {
            body["JobParameters"] = json!({"Tier": tier});
        }
        let body = xml::to_xml("RestoreRequest", &body)?;
        let headers = vec![(CONTENT_TYPE.to_string(), CONTENT_TYPE_XML.to_string())];
        self.client
            .request(
                Method::POST,
                Some(self.bucket()?),
                Some(filename),
                headers,
                vec![("restore".to_string(), None)],
                Some(body),
            )
            .await
    }

    /// Start a multipart upload and return its upload id.
    pub async fn init_part(&self, filename: &str, options: InitPartOptions) -> Result<Value> {
        let mut headers: Headers =
            vec![(CONTENT_TYPE.to_string(), CONTENT_TYPE_URLENCODED.to_string())];
        push_header(&mut headers, "x-oss-storage-class", options.storage_class);
        push_header(&mut headers, "Cache-Control", options.cache_control);
        push_header(&mut headers, "Content-Disposition", options.content_disposition);
        push_header(&mut headers, "Content-Encoding", options.content_encoding);
        push_date_header(&mut headers, "Expires", options.expires);
        push_overwrite(&mut headers, options.forbid_overwrite);
        push_header(
            &mut headers,
            "x-oss-server-side-encryption",
            options.server_side_encryption,
        );
        push_header(
            &mut headers,
            "x-oss-server-side-encryption-key-id",
            options.encryption_key_id,
        );
        if !options.tags.is_empty() {
            headers.push(("x-oss-tagging".to_string(), tag_query(&options.tags)));
        }
        self.client
            .request(
                Method::POST,
                Some(self.bucket()?),
                Some(filename),
                headers,
                vec![("uploads".to_string(), None)],
                None,
            )
            .await
    }

    /// Upload one part. Returns the ETag and checksums from the
    /// response headers.
    pub async fn upload_part(
        &self,
        filename: &str,
        upload_id: &str,
        part_number: u32,
        data: String,
    ) -> Result<Value> {
        let headers = vec![(CONTENT_TYPE.to_string(), CONTENT_TYPE_STREAM.to_string())];
        let query = vec![
            ("partNumber".to_string(), Some(part_number.to_string())),
            ("uploadId".to_string(), Some(upload_id.to_string())),
        ];
        let (_, response_headers) = self
            .client
            .request_with_headers(
                Method::PUT,
                Some(self.bucket()?),
                Some(filename),
                headers,
                query,
                Some(data),
            )
            .await?;
        let all = headers_to_value(&response_headers);
        Ok(json!({
            "ETag": all["etag"],
            "MD5": all["content-md5"],
            "hash-crc64ecma": all["x-oss-hash-crc64ecma"],
        }))
    }

    /// Complete a multipart upload from `(part_number, etag)` pairs.
    /// With `complete_all` the server assembles every uploaded part
    /// and the pair list is ignored.
    pub async fn complete_part(
        &self,
        filename: &str,
        upload_id: &str,
        etags: &[(u32, String)],
        encoding_type: Option<&str>,
        forbid_overwrite: Option<bool>,
        complete_all: bool,
    ) -> Result<Value> {
        let mut query: Query = vec![("uploadId".to_string(), Some(upload_id.to_string()))];
        push_query(&mut query, "encoding-type", encoding_type.map(str::to_string));
        let mut headers: Headers = vec![(CONTENT_TYPE.to_string(), CONTENT_TYPE_XML.to_string())];
        push_overwrite(&mut headers, forbid_overwrite);
        let body = if complete_all {
            headers.push(("x-oss-complete-all".to_string(), "yes".to_string()));
            None
        } else {
            let parts: Vec<Value> = etags
                .iter()
                .map(|(number, etag)| json!({"PartNumber": number.to_string(), "ETag": etag}))
                .collect();
            Some(xml::to_xml("CompleteMultipartUpload", &json!({"Part": parts}))?)
        };
        self.client
            .request(
                Method::POST,
                Some(self.bucket()?),
                Some(filename),
                headers,
                query,
                body,
            )
            .await
    }

    /// Abort a multipart upload and drop its parts.
    pub async fn abort_part(&self, filename: &str, upload_id: &str) -> Result<Value> {
        let query = vec![("uploadId".to_string(), Some(upload_id.to_string()))];
        self.request_urlencoded(Method::DELETE, Some(filename), query)
            .await
    }

    /// List in-flight multipart upload tasks.
    pub async fn part_task_list(&self, options: PartTaskListOptions) -> Result<Value> {
        let mut query: Query = vec![("uploads".to_string(), None)];
        push_query(&mut query, "delimiter", options.delimiter);
        push_query(&mut query, "max-uploads", options.max_uploads.map(|n| n.to_string()));
        push_query(&mut query, "key-marker", options.key_marker);
        push_query(&mut query, "prefix", options.prefix);
        push_query(&mut query, "upload-id-marker", options.upload_id_marker);
        push_query(&mut query, "encoding-type", options.encoding_type);
        self.request_urlencoded(Method::GET, None, query).await
    }

    /// List the parts uploaded under one upload id.
    pub async fn part_list(
        &self,
        filename: &str,
        upload_id: &str,
        max_parts: Option<u32>,
        part_number_marker: Option<u32>,
        encoding_type: Option<&str>,
    ) -> Result<Value> {
        let mut query: Query = vec![("uploadId".to_string(), Some(upload_id.to_string()))];
        push_query(&mut query, "max-parts", max_parts.map(|n| n.to_string()));
        push_query(
            &mut query,
            "part-number-marker",
            part_number_marker.map(|n| n.to_string()),
        );
        push_query(&mut query, "encoding-type", encoding_type.map(str::to_string));
        self.request_urlencoded(Method::GET, Some(filename), query)
            .await
    }

    /// Set the object ACL.
    pub async fn set_acl(&self, filename: &str, acl: &str) -> Result<Value> {
        let headers = vec![
            (CONTENT_TYPE.to_string(), CONTENT_TYPE_URLENCODED.to_string()),
            ("x-oss-object-acl".to_string(), acl.to_string()),
        ];
        self.client
            .request(
                Method::PUT,
                Some(self.bucket()?),
                Some(filename),
                headers,
                vec![("acl".to_string(), None)],
                None,
            )
            .await
    }

    /// Get the object ACL.
    pub async fn get_acl(&self, filename: &str) -> Result<Value> {
        self.request_urlencoded(Method::GET, Some(filename), vec![("acl".to_string(), None)])
            .await
    }

    /// Create a symlink pointing at `source_filename`.
    pub async fn create_symlink(
        &self,
        filename: &str,
        source_filename: &str,
        forbid_overwrite: Option<bool>,
        acl: Option<&str>,
        storage_class: Option<&str>,
    ) -> Result<Value> {
        let mut headers: Headers = vec![
            (CONTENT_TYPE.to_string(), CONTENT_TYPE_URLENCODED.to_string()),
            ("x-oss-symlink-target".to_string(), rawurlencode(source_filename)),
        ];
        push_overwrite(&mut headers, forbid_overwrite);
        push_header(&mut headers, "x-oss-object-acl", acl.map(str::to_string));
        push_header(&mut headers, "x-oss-storage-class", storage_class.map(str::to_string));
        self.client
            .request(
                Method::PUT,
                Some(self.bucket()?),
                Some(filename),
                headers,
                vec![("symlink".to_string(), None)],
                None,
            )
            .await
    }

    /// Resolve a symlink. Returns `{source_filename}`.
    pub async fn get_symlink(&self, filename: &str, version_id: Option<&str>) -> Result<Value> {
        let headers = vec![(CONTENT_TYPE.to_string(), CONTENT_TYPE_URLENCODED.to_string())];
        let mut query: Query = vec![("symlink".to_string(), None)];
        push_query(&mut query, "versionId", version_id.map(str::to_string));
        let (_, response_headers) = self
            .client
            .request_with_headers(
                Method::GET,
                Some(self.bucket()?),
                Some(filename),
                headers,
                query,
                None,
            )
            .await?;
        let all = headers_to_value(&response_headers);
        Ok(json!({"source_filename": all["x-oss-symlink-target"]}))
    }

    /// Replace the object tags.
    pub async fn set_tag(
        &self,
        filename: &str,
        tags: &[(String, String)],
        version_id: Option<&str>,
    ) -> Result<Value> {
        let headers = vec![(CONTENT_TYPE.to_string(), CONTENT_TYPE_XML.to_string())];
        let mut query: Query = vec![("tagging".to_string(), None)];
        push_query(&mut query, "versionId", version_id.map(str::to_string));
        let body = xml::to_xml("Tagging", &tag_set(tags))?;
        self.client
            .request(
                Method::PUT,
                Some(self.bucket()?),
                Some(filename),
                headers,
                query,
                Some(body),
            )
            .await
    }

    /// Get the object tags.
    pub async fn get_tag(&self, filename: &str, version_id: Option<&str>) -> Result<Value> {
        let mut query: Query = vec![("tagging".to_string(), None)];
        push_query(&mut query, "versionId", version_id.map(str::to_string));
        self.request_urlencoded(Method::GET, Some(filename), query)
            .await
    }

    /// Delete the object tags.
    pub async fn delete_tag(&self, filename: &str, version_id: Option<&str>) -> Result<Value> {
        let mut query: Query = vec![("tagging".to_string(), None)];
        push_query(&mut query, "versionId", version_id.map(str::to_string));
        self.request_urlencoded(Method::DELETE, Some(filename), query)
            .await
    }

    async fn request_urlencoded(
        &self,
        method: Method,
        object: Option<&str>,
        query: Query,
    ) -> Result<Value> {
        let headers = vec![(CONTENT_TYPE.to_string(), CONTENT_TYPE_URLENCODED.to_string())];
        self.client
            .request(method, Some(self.bucket()?), object, headers, query, None)
            .await
    }
}

fn put_headers(options: &PutOptions) -> Headers {
    let content_type = options
        .content_type
        .clone()
        .unwrap_or_else(|| CONTENT_TYPE_STREAM.to_string());
    let mut headers: Headers = vec![(CONTENT_TYPE.to_string(), content_type)];
    push_header(&mut headers, "x-oss-object-acl", options.acl.clone());
    push_header(&mut headers, "x-oss-storage-class", options.storage_class.clone());
    push_header(&mut headers, "Cache-Control", options.cache_control.clone());
    push_header(&mut headers, "Content-Disposition", options.content_disposition.clone());
    push_header(&mut headers, "Content-Encoding", options.content_encoding.clone());
    push_header(&mut headers, "Content-MD5", options.content_md5.clone());
    push_date_header(&mut headers, "Expires", options.expires);
    push_overwrite(&mut headers, options.forbid_overwrite);
    push_header(
        &mut headers,
        "x-oss-server-side-encryption",
        options.server_side_encryption.clone(),
    );
    push_header(
        &mut headers,
        "x-oss-server-side-data-encryption",
        options.server_side_data_encryption.clone(),
    );
    push_header(
        &mut headers,
        "x-oss-server-side-encryption-key-id",
        options.encryption_key_id.clone(),
    );
    for (key, value) in &options.meta {
        headers.push((format!("x-oss-meta-{key}"), value.clone()));
    }
    if !options.tags.is_empty() {
        headers.push(("x-oss-tagging".to_string(), tag_query(&options.tags)));
    }
    headers
}

fn push_header(headers: &mut Headers, name: &str, value: Option<String>) {
    if let Some(value) = value {
        headers.push((name.to_string(), value));
    }
}

fn push_date_header(headers: &mut Headers, name: &str, value: Option<DateTime>) {
    if let Some(value) = value {
        headers.push((name.to_string(), time::format_rfc3339(value)));
    }
}

fn push_overwrite(headers: &mut Headers, forbid_overwrite: Option<bool>) {
    if let Some(forbid) = forbid_overwrite {
        headers.push((
            "x-oss-forbid-overwrite".to_string(),
            if forbid { "true" } else { "false" }.to_string(),
        ));
    }
}

fn push_query(query: &mut Query, name: &str, value: Option<String>) {
    if let Some(value) = value {
        query.push((name.to_string(), Some(value)));
    }
}

fn tag_query(tags: &[(String, String)]) -> String {
    tags.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::ErrorKind;
    use pretty_assertions::assert_eq;

    fn test_objects(access_domain: &str, is_https: bool, bucket: &str) -> Objects {
        let config = Config {
            access_key_id: "ak_id".to_string(),
            access_key_secret: "ak_secret".to_string(),
            region_id: "cn-hangzhou".to_string(),
            bucket_name: bucket.to_string(),
            access_domain: access_domain.to_string(),
            is_https,
        };
        Objects::new(Context::new(), config).unwrap()
    }

    #[test]
    fn test_access_path_uses_bucket_endpoint() {
        let objects = test_objects("", true, "mybucket");
        assert_eq!(
            objects.access_path("a.txt").unwrap(),
            "https://mybucket.oss-cn-hangzhou.aliyuncs.com/a.txt"
        );
    }

    #[test]
    fn test_access_path_prefers_access_domain() {
        let objects = test_objects("cdn.example.com", false, "mybucket");
        assert_eq!(
            objects.access_path("a.txt").unwrap(),
            "http://cdn.example.com/a.txt"
        );
    }

    #[test]
    fn test_empty_bucket_is_rejected() {
        let objects = test_objects("", true, "");
        let err = objects.access_path("a.txt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentInvalid);
    }

    #[test]
    fn test_put_headers_defaults_and_meta() {
        let options = PutOptions {
            acl: Some("private".to_string()),
            meta: vec![("owner".to_string(), "tests".to_string())],
            tags: vec![("env".to_string(), "dev".to_string())],
            ..Default::default()
        };
        let headers = put_headers(&options);
        assert!(headers.contains(&("content-type".to_string(), CONTENT_TYPE_STREAM.to_string())));
        assert!(headers.contains(&("x-oss-meta-owner".to_string(), "tests".to_string())));
        assert!(headers.contains(&("x-oss-tagging".to_string(), "env=dev".to_string())));
    }

    #[test]
    fn test_tag_query_joins_pairs() {
        let tags = vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ];
        assert_eq!(tag_query(&tags), "a=1&b=2");
    }
}
