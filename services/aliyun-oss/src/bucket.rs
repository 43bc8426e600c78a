//! Bucket management.

use crate::client::{OssClient, CONTENT_TYPE_URLENCODED, CONTENT_TYPE_XML};
use crate::config::Config;
use crate::{region, xml};
use bridge_core::{Context, Result};
use http::header::CONTENT_TYPE;
use http::Method;
use serde_json::{json, Value};

/// Bucket management operations.
#[derive(Clone, Debug)]
pub struct Bucket {
    client: OssClient,
}

impl Bucket {
    /// Create the facade.
    pub fn new(ctx: Context, config: Config) -> Result<Self> {
        Ok(Self {
            client: OssClient::new(ctx, config)?,
        })
    }

    /// List the buckets owned by the requester.
    pub async fn list(
        &self,
        prefix: Option<&str>,
        marker: Option<&str>,
        max_keys: Option<u32>,
        resource_group_id: Option<&str>,
    ) -> Result<Value> {
        let mut headers = vec![(CONTENT_TYPE.to_string(), CONTENT_TYPE_URLENCODED.to_string())];
        if let Some(id) = resource_group_id {
            headers.push(("x-oss-resource-group-id".to_string(), id.to_string()));
        }
        let mut query = Vec::new();
        if let Some(prefix) = prefix {
            query.push(("prefix".to_string(), Some(prefix.to_string())));
        }
        if let Some(marker) = marker {
            query.push(("marker".to_string(), Some(marker.to_string())));
        }
        if let Some(n) = max_keys {
            query.push(("max-keys".to_string(), Some(n.to_string())));
        }
        self.client
            .request(Method::GET, None, None, headers, query, None)
            .await
    }

    /// Known public regions as `{id, name}` pairs.
    pub fn region_list(&self) -> Value {
        Value::Array(
            region::all()
                .iter()
                .map(|r| json!({"id": r.id, "name": r.name}))
                .collect(),
        )
    }

    /// Create a bucket.
    pub async fn create(
        &self,
        name: &str,
        storage_class: Option<&str>,
        data_redundancy_type: Option<&str>,
        acl: Option<&str>,
        resource_group_id: Option<&str>,
    ) -> Result<Value> {
        let mut headers = vec![(CONTENT_TYPE.to_string(), CONTENT_TYPE_XML.to_string())];
        if let Some(acl) = acl {
            headers.push(("x-oss-acl".to_string(), acl.to_string()));
        }
        if let Some(id) = resource_group_id {
            headers.push(("x-oss-resource-group-id".to_string(), id.to_string()));
        }
        let mut body = json!({});
        if let Some(class) = storage_class {
            body["StorageClass"] = json!(class);
        }
        if let Some(redundancy) = data_redundancy_type {
            body["DataRedundancyType"] = json!(redundancy);
        }
        let body = xml::to_xml("CreateBucketConfiguration", &body)?;
        self.client
            .request(Method::PUT, Some(name), None, headers, Vec::new(), Some(body))
            .await
    }

    /// Delete an empty bucket.
    pub async fn delete(&self, name: &str) -> Result<Value> {
        self.simple(Method::DELETE, name, Vec::new()).await
    }

    /// Bucket details, the `Bucket` node of the `BucketInfo` response.
    pub async fn info(&self, name: &str) -> Result<Value> {
        let mut response = self
            .simple(Method::GET, name, vec![("bucketInfo".to_string(), None)])
            .await?;
        Ok(response["Bucket"].take())
    }

    /// The region the bucket lives in.
    pub async fn location(&self, name: &str) -> Result<Value> {
        self.simple(Method::GET, name, vec![("location".to_string(), None)])
            .await
    }

    /// Storage capacity and object count statistics.
    pub async fn stat(&self, name: &str) -> Result<Value> {
        self.simple(Method::GET, name, vec![("stat".to_string(), None)])
            .await
    }

    /// Set the bucket ACL.
    pub async fn set_acl(&self, name: &str, acl: &str) -> Result<Value> {
        let headers = vec![("x-oss-acl".to_string(), acl.to_string())];
        self.client
            .request(
                Method::PUT,
                Some(name),
                None,
                headers,
                vec![("acl".to_string(), None)],
                None,
            )
            .await
    }

    /// Get the bucket ACL.
    pub async fn get_acl(&self, name: &str) -> Result<Value> {
        self.simple(Method::GET, name, vec![("acl".to_string(), None)])
            .await
    }

    /// Install lifecycle rules. `rules` is an array of `Rule` nodes.
    pub async fn set_lifecycle(
        &self,
        name: &str,
        rules: Value,
        allow_same_action_overlap: Option<bool>,
    ) -> Result<Value> {
        let mut headers = vec![(CONTENT_TYPE.to_string(), CONTENT_TYPE_XML.to_string())];
        if let Some(overlap) = allow_same_action_overlap {
            headers.push((
                "x-oss-allow-same-action-overlap".to_string(),
                if overlap { "true" } else { "false" }.to_string(),
            ));
        }
        let body = xml::to_xml("LifecycleConfiguration", &json!({ "Rule": rules }))?;
        self.client
            .request(
                Method::PUT,
                Some(name),
                None,
                headers,
                vec![("lifecycle".to_string(), None)],
                Some(body),
            )
            .await
    }

    /// Get the lifecycle rules.
    pub async fn get_lifecycle(&self, name: &str) -> Result<Value> {
        self.simple(Method::GET, name, vec![("lifecycle".to_string(), None)])
            .await
    }

    /// Drop all lifecycle rules.
    pub async fn delete_lifecycle(&self, name: &str) -> Result<Value> {
        self.simple(Method::DELETE, name, vec![("lifecycle".to_string(), None)])
            .await
    }

    /// Enable or suspend versioning.
    pub async fn set_versioning(&self, name: &str, enabled: bool) -> Result<Value> {
        let headers = vec![(CONTENT_TYPE.to_string(), CONTENT_TYPE_XML.to_string())];
        let body = xml::to_xml(
            "VersioningConfiguration",
            &json!({"Status": if enabled { "Enabled" } else { "Suspended" }}),
        )?;
        self.client
            .request(
                Method::PUT,
                Some(name),
                None,
                headers,
                vec![("versioning".to_string(), None)],
                Some(body),
            )
            .await
    }

    /// Get the versioning state.
    pub async fn get_versioning(&self, name: &str) -> Result<Value> {
        self.simple(Method::GET, name, vec![("versioning".to_string(), None)])
            .await
    }

    /// Replace the bucket tags.
    pub async fn set_tag(&self, name: &str, tags: &[(String, String)]) -> Result<Value> {
        let headers = vec![(CONTENT_TYPE.to_string(), CONTENT_TYPE_XML.to_string())];
        let body = xml::to_xml("Tagging", &tag_set(tags))?;
        self.client
            .request(
                Method::PUT,
                Some(name),
                None,
                headers,
                vec![("tagging".to_string(), None)],
                Some(body),
            )
            .await
    }

    /// Get the bucket tags.
    pub async fn get_tag(&self, name: &str) -> Result<Value> {
        self.simple(Method::GET, name, vec![("tagging".to_string(), None)])
            .await
    }

    /// Delete bucket tags. An empty key list deletes all of them.
    pub async fn delete_tag(&self, name: &str, keys: &[String]) -> Result<Value> {
        let value = if keys.is_empty() {
            None
        } else {
            Some(keys.join(","))
        };
        self.simple(Method::DELETE, name, vec![("tagging".to_string(), value)])
            .await
    }

    async fn simple(
        &self,
        method: Method,
        name: &str,
        query: Vec<(String, Option<String>)>,
    ) -> Result<Value> {
        let headers = vec![(CONTENT_TYPE.to_string(), CONTENT_TYPE_URLENCODED.to_string())];
        self.client
            .request(method, Some(name), None, headers, query, None)
            .await
    }
}

pub(crate) fn tag_set(tags: &[(String, String)]) -> Value {
    let tag_list: Vec<Value> = tags
        .iter()
        .map(|(k, v)| json!({"Key": k, "Value": v}))
        .collect();
    json!({"TagSet": {"Tag": tag_list}})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_set_shape() {
        let tags = vec![("env".to_string(), "prod".to_string())];
        assert_eq!(
            xml::to_xml("Tagging", &tag_set(&tags)).unwrap(),
            "<Tagging><TagSet><Tag><Key>env</Key><Value>prod</Value></Tag></TagSet></Tagging>"
        );
    }

    #[test]
    fn test_region_list_carries_ids() {
        let config = Config {
            access_key_id: "ak_id".to_string(),
            access_key_secret: "ak_secret".to_string(),
            region_id: "cn-hangzhou".to_string(),
            ..Default::default()
        };
        let bucket = Bucket::new(Context::new(), config).unwrap();
        let list = bucket.region_list();
        assert!(list
            .as_array()
            .unwrap()
            .iter()
            .any(|r| r["id"] == "cn-beijing"));
    }
}
