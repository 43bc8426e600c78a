//! Kodo credentials.
//!
//! Management APIs authenticate with a token over the request line,
//! host and selected headers. Uploads authenticate with a token over
//! an upload policy; the policy rides inside the token itself.

use bridge_core::hash::{base64_urlsafe_encode, hmac_sha1};
use bridge_core::{Error, Result};
use serde::Serialize;

const CONTENT_TYPE_STREAM: &str = "application/octet-stream";

/// Render query pairs as sent on the wire. A `None` value serializes
/// as the bare key.
pub(crate) fn query_string(query: &[(String, Option<String>)]) -> String {
    query
        .iter()
        .map(|(k, v)| match v {
            Some(v) => format!("{k}={v}"),
            None => k.clone(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Management token, `Qiniu <ak>:<sig>`.
///
/// Signs the request line, the host, the content type and any
/// `X-Qiniu-*` headers (sorted). The body is covered unless it is an
/// octet stream or the request carries no content type.
pub fn management_token(
    access_key: &str,
    secret_key: &str,
    method: &str,
    host: &str,
    path: &str,
    query: &[(String, Option<String>)],
    headers: &[(String, String)],
    body: Option<&str>,
) -> String {
    let mut sign_str = format!("{method} {path}");
    if !query.is_empty() {
        sign_str.push('?');
        sign_str.push_str(&query_string(query));
    }
    sign_str.push_str(&format!("\nHost: {host}"));

    let content_type = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("Content-Type"))
        .map(|(_, v)| v.as_str())
        .unwrap_or_default();
    if !content_type.is_empty() {
        sign_str.push_str(&format!("\nContent-Type: {content_type}"));
    }
    let mut qiniu_headers: Vec<&(String, String)> = headers
        .iter()
        .filter(|(k, _)| k.starts_with("X-Qiniu-"))
        .collect();
    qiniu_headers.sort_by(|a, b| a.0.cmp(&b.0));
    for (key, value) in qiniu_headers {
        sign_str.push_str(&format!("\n{key}: {value}"));
    }
    sign_str.push_str("\n\n");
    if let Some(body) = body {
        if !body.is_empty() && !content_type.is_empty() && content_type != CONTENT_TYPE_STREAM {
            sign_str.push_str(body);
        }
    }

    let sign = base64_urlsafe_encode(&hmac_sha1(secret_key.as_bytes(), sign_str.as_bytes()));
    format!("Qiniu {access_key}:{sign}")
}

/// Upload policy carried inside an upload token.
#[derive(Clone, Debug, Serialize)]
pub struct UploadPolicy {
    /// `bucket` or `bucket:key`.
    pub scope: String,
    /// Unix timestamp after which the token is rejected.
    pub deadline: i64,
    /// Response body template with `$(fname)` style magic variables.
    #[serde(rename = "returnBody", skip_serializing_if = "Option::is_none")]
    pub return_body: Option<String>,
    /// Storage type of the uploaded object.
    #[serde(rename = "fileType", skip_serializing_if = "Option::is_none")]
    pub file_type: Option<u8>,
}

impl UploadPolicy {
    /// Policy over a single object.
    pub fn new(bucket: &str, filename: &str, deadline: i64) -> Self {
        Self {
            scope: format!("{bucket}:{filename}"),
            deadline,
            return_body: None,
            file_type: None,
        }
    }
}

/// Upload token, `<ak>:<sig>:<policy>`.
pub fn upload_token(access_key: &str, secret_key: &str, policy: &UploadPolicy) -> Result<String> {
    let encoded = base64_urlsafe_encode(
        serde_json::to_string(policy)
            .map_err(|e| Error::unexpected("cannot encode upload policy").with_source(e))?
            .as_bytes(),
    );
    let sign = base64_urlsafe_encode(&hmac_sha1(secret_key.as_bytes(), encoded.as_bytes()));
    Ok(format!("{access_key}:{sign}:{encoded}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_management_token_covers_query_and_body() {
        let token = management_token(
            "qn_ak",
            "qn_sk",
            "POST",
            "uc.qiniuapi.com",
            "/buckets",
            &[("tagCondition".to_string(), Some("a".to_string()))],
            &[(
                "Content-Type".to_string(),
                "application/x-www-form-urlencoded".to_string(),
            )],
            Some("name=test"),
        );
        assert_eq!(token, "Qiniu qn_ak:7vVkDcsVU384btjGkMAhOeW_c_0=");
    }

    #[test]
    fn test_management_token_skips_octet_stream_body() {
        let headers = vec![(
            "Content-Type".to_string(),
            "application/octet-stream".to_string(),
        )];
        let with_body = management_token(
            "qn_ak", "qn_sk", "PUT", "h", "/p", &[], &headers, Some("chunk"),
        );
        let without = management_token("qn_ak", "qn_sk", "PUT", "h", "/p", &[], &headers, None);
        assert_eq!(with_body, without);
    }

    #[test]
    fn test_management_token_orders_qiniu_headers() {
        let unordered = vec![
            ("X-Qiniu-Bbb".to_string(), "2".to_string()),
            ("X-Qiniu-Aaa".to_string(), "1".to_string()),
        ];
        let ordered = vec![
            ("X-Qiniu-Aaa".to_string(), "1".to_string()),
            ("X-Qiniu-Bbb".to_string(), "2".to_string()),
        ];
        assert_eq!(
            management_token("qn_ak", "qn_sk", "GET", "h", "/p", &[], &unordered, None),
            management_token("qn_ak", "qn_sk", "GET", "h", "/p", &[], &ordered, None),
        );
    }

    #[test]
    fn test_upload_token_embeds_policy() {
        let policy = UploadPolicy {
            scope: "bkt:a.txt".to_string(),
            deadline: 1_700_000_000,
            return_body: Some("{}".to_string()),
            file_type: Some(0),
        };
        assert_eq!(
            upload_token("qn_ak", "qn_sk", &policy).unwrap(),
            "qn_ak:NspkvHXr0vNqmS9CBoz3ODqp-iQ=:eyJzY29wZSI6ImJrdDphLnR4dCIsImRlYWRsaW5lIjox\
             NzAwMDAwMDAwLCJyZXR1cm5Cb2R5Ijoie30iLCJmaWxlVHlwZSI6MH0="
        );
    }

    #[test]
    fn test_upload_token_policy_omits_unset_fields() {
        let token = upload_token("qn_ak", "qn_sk", &UploadPolicy::new("bkt", "a.txt", 1)).unwrap();
        let encoded = token.rsplit(':').next().unwrap();
        let policy = bridge_core::hash::base64_urlsafe_decode(encoded).unwrap();
        assert_eq!(
            String::from_utf8(policy).unwrap(),
            r#"{"scope":"bkt:a.txt","deadline":1}"#
        );
    }
}
