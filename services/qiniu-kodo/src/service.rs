use crate::client::{self, KodoClient, CONTENT_TYPE_URLENCODED};
use crate::config::Config;
use bridge_core::{Context, Result};
use http::header::CONTENT_TYPE;
use http::Method;
use serde_json::Value;

/// Account level operations.
#[derive(Clone, Debug)]
pub struct Service {
    client: KodoClient,
}

impl Service {
    /// Create the facade.
    pub fn new(ctx: Context, config: Config) -> Result<Self> {
        Ok(Self {
            client: KodoClient::new(ctx, config)?,
        })
    }

    /// List the buckets of the account, optionally filtered by tags.
    pub async fn bucket_list(&self, tags: &[(String, String)]) -> Result<Value> {
        let mut query = Vec::new();
        if !tags.is_empty() {
            let condition = tags
                .iter()
                .map(|(k, v)| format!("key={k}&value={v}"))
                .collect::<Vec<_>>()
                .join(";");
            query.push(("tagCondition".to_string(), Some(client::encode(&condition))));
        }
        let headers = vec![(CONTENT_TYPE.to_string(), CONTENT_TYPE_URLENCODED.to_string())];
        self.client
            .managed(
                Method::GET,
                self.client.region().bucket_manage,
                "/buckets",
                headers,
                query,
                None,
                false,
            )
            .await
    }
}
