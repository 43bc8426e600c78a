//! Bucket management.

use crate::client::{self, KodoClient, CONTENT_TYPE_JSON, CONTENT_TYPE_URLENCODED};
use crate::config::Config;
use crate::region;
use bridge_core::{Context, Result};
use http::header::CONTENT_TYPE;
use http::Method;
use serde_json::{json, Value};

/// Bucket management operations.
#[derive(Clone, Debug)]
pub struct Bucket {
    client: KodoClient,
    bucket: String,
}

impl Bucket {
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

    /// Known regions as `{id, name}` pairs.
    pub fn region_list(&self) -> Value {
        Value::Array(
            region::all()
                .iter()
                .map(|r| json!({"id": r.id, "name": r.name}))
                .collect(),
        )
    }

    /// Create the bucket in the given region.
    pub async fn create(&self, region_id: &str) -> Result<Value> {
        let host = region::find(region_id)?.bucket_manage;
        let path = format!("/mkbucketv3/{}/region/{region_id}", self.bucket()?);
        self.client
            .managed(Method::POST, host, &path, Vec::new(), Vec::new(), None, false)
            .await
    }

    /// Drop the bucket.
    pub async fn delete(&self) -> Result<Value> {
        let path = format!("/drop/{}", self.bucket()?);
        self.client
            .managed(
                Method::POST,
                self.client.region().bucket_manage,
                &path,
                Vec::new(),
                Vec::new(),
                None,
                false,
            )
            .await
    }

    /// Domains bound to the bucket.
    pub async fn domain(&self) -> Result<Value> {
        let query = vec![("tbl".to_string(), Some(self.bucket()?.to_string()))];
        self.client
            .managed(
                Method::GET,
                self.client.region().query,
                "/v6/domain/list",
                Vec::new(),
                query,
                None,
                false,
            )
            .await
    }

    /// Set the mirror source of the bucket.
    pub async fn set_image_source(&self, access_url: &str, host: Option<&str>) -> Result<Value> {
        let path = format!(
            "/image/{}/from/{}/host/{}",
            self.bucket()?,
            client::encode(access_url),
            client::encode(host.unwrap_or_default()),
        );
        self.client
            .managed(
                Method::POST,
                self.client.region().bucket_manage,
                &path,
                Vec::new(),
                Vec::new(),
                None,
                false,
            )
            .await
    }

    /// Switch the bucket between private and public access.
    pub async fn set_access_auth(&self, private: bool) -> Result<Value> {
        let query = vec![
            ("bucket".to_string(), Some(self.bucket()?.to_string())),
            ("private".to_string(), Some(if private { "1" } else { "0" }.to_string())),
        ];
        let headers = vec![(CONTENT_TYPE.to_string(), CONTENT_TYPE_URLENCODED.to_string())];
        self.client
            .managed(
                Method::POST,
                self.client.region().bucket_manage,
                "/private",
                headers,
                query,
                None,
                false,
            )
            .await
    }

    /// Replace the bucket tags.
    pub async fn set_tag(&self, tags: &[(String, String)]) -> Result<Value> {
        let query = vec![("bucket".to_string(), Some(self.bucket()?.to_string()))];
        let tag_list: Vec<Value> = tags
            .iter()
            .map(|(k, v)| json!({"Key": k, "Value": v}))
            .collect();
        let body = json!({ "Tags": tag_list }).to_string();
        let headers = vec![(CONTENT_TYPE.to_string(), CONTENT_TYPE_JSON.to_string())];
        self.client
            .managed(
                Method::PUT,
                self.client.region().bucket_manage,
                "/bucketTagging",
                headers,
                query,
                Some(body),
                false,
            )
            .await
    }

    /// Get the bucket tags.
    pub async fn get_tag(&self) -> Result<Value> {
        self.tagging(Method::GET).await
    }

    /// Delete all bucket tags.
    pub async fn delete_tag(&self) -> Result<Value> {
        self.tagging(Method::DELETE).await
    }

    async fn tagging(&self, method: Method) -> Result<Value> {
        let query = vec![("bucket".to_string(), Some(self.bucket()?.to_string()))];
        self.client
            .managed(
                method,
                self.client.region().bucket_manage,
                "/bucketTagging",
                Vec::new(),
                query,
                None,
                false,
            )
            .await
    }
}
