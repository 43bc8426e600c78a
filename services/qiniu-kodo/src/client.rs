use crate::config::Config;
use crate::region::{self, Region};
use crate::sign;
use bridge_core::hash::base64_urlsafe_encode;
use bridge_core::{time, Context, Error, Result};
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_LENGTH, DATE, HOST};
use http::Method;
use log::debug;
use serde_json::Value;

pub(crate) const CONTENT_TYPE_URLENCODED: &str = "application/x-www-form-urlencoded";
pub(crate) const CONTENT_TYPE_JSON: &str = "application/json";
pub(crate) const CONTENT_TYPE_STREAM: &str = "application/octet-stream";

pub(crate) type Query = Vec<(String, Option<String>)>;
pub(crate) type Headers = Vec<(String, String)>;

/// Client for the Kodo APIs.
///
/// Picks the host per API role from the configured region, signs
/// management calls and decodes JSON payloads into
/// `serde_json::Value`.
#[derive(Clone, Debug)]
pub struct KodoClient {
    ctx: Context,
    config: Config,
    region: &'static Region,
}

impl KodoClient {
    /// Create a client. Fails when required configuration is missing
    /// or the configured region id is unknown.
    pub fn new(ctx: Context, config: Config) -> Result<Self> {
        config.check()?;
        let region = region::from_config(&config.region_id)?;
        Ok(Self { ctx, config, region })
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn region(&self) -> &'static Region {
        self.region
    }

    pub(crate) fn scheme(&self) -> &'static str {
        if self.config.is_ssl {
            "https"
        } else {
            "http"
        }
    }

    /// Deadline for an upload token valid for `expire` seconds.
    pub(crate) fn deadline(&self, expire: i64) -> i64 {
        time::now().timestamp() + expire
    }

    pub(crate) fn upload_token(&self, policy: &sign::UploadPolicy) -> Result<String> {
        sign::upload_token(&self.config.access_key, &self.config.secret_key, policy)
    }

    /// Issue a management request, signing it over the final headers.
    pub(crate) async fn managed(
        &self,
        method: Method,
        host: &str,
        path: &str,
        mut headers: Headers,
        query: Query,
        body: Option<String>,
        empty_response: bool,
    ) -> Result<Value> {
        let token = sign::management_token(
            &self.config.access_key,
            &self.config.secret_key,
            method.as_str(),
            host,
            path,
            &query,
            &headers,
            body.as_deref(),
        );
        headers.push((AUTHORIZATION.as_str().to_string(), token));
        self.send(method, host, path, headers, query, body.map(Bytes::from), empty_response)
            .await
    }

    /// Issue a request as-is. Callers carrying an upload token push
    /// their own `Authorization` header.
    pub(crate) async fn send(
        &self,
        method: Method,
        host: &str,
        path: &str,
        headers: Headers,
        query: Query,
        body: Option<Bytes>,
        empty_response: bool,
    ) -> Result<Value> {
        let url = if query.is_empty() {
            format!("{}://{host}{path}", self.scheme())
        } else {
            format!("{}://{host}{path}?{}", self.scheme(), sign::query_string(&query))
        };
        debug!("kodo request: {} {url}", method.as_str());

        let body = body.unwrap_or_default();
        let mut builder = http::Request::builder()
            .method(method)
            .uri(url)
            .header(DATE, time::format_gmt(time::now()))
            .header(HOST, host);
        if !body.is_empty() {
            builder = builder.header(CONTENT_LENGTH, body.len());
        }
        for (key, value) in &headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        let req = builder.body(body)?;

        let resp = self.ctx.http_send_as_string(req).await?;
        let (parts, response_body) = resp.into_parts();

        if parts.status != http::StatusCode::OK && parts.status != http::StatusCode::NO_CONTENT {
            if let Ok(envelope) = serde_json::from_str::<Value>(&response_body) {
                if let Some(message) = envelope.get("error").and_then(Value::as_str) {
                    let mut err = Error::vendor_response(message);
                    if let Some(id) = parts.headers.get("X-Reqid").and_then(|v| v.to_str().ok()) {
                        err = err.with_request_id(id);
                    }
                    return Err(err);
                }
            }
            return Err(Error::response_invalid(format!(
                "Request exception: status {}",
                parts.status
            )));
        }

        if empty_response || response_body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response_body)
            .map_err(|e| Error::decode_invalid("response body is not JSON").with_source(e))
    }
}

/// URL-safe base64 used in path segments and query filters.
pub(crate) fn encode(content: &str) -> String {
    base64_urlsafe_encode(content.as_bytes())
}

/// Encoded `bucket:filename` entry, the object address of the
/// management APIs.
pub(crate) fn entry(bucket: &str, filename: &str) -> String {
    encode(&format!("{bucket}:{filename}"))
}

/// Resolved bucket name, explicit override first, config second.
pub(crate) fn require_bucket<'a>(overriding: &'a str, config: &'a Config) -> Result<&'a str> {
    if !overriding.is_empty() {
        Ok(overriding)
    } else if !config.bucket_name.is_empty() {
        Ok(&config.bucket_name)
    } else {
        Err(Error::argument_invalid("Missing Options [bucketName]"))
    }
}
