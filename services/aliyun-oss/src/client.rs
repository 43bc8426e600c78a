use crate::config::Config;
use crate::region::{self, Region};
use crate::{sign, xml};
use bridge_core::{time, Context, Error, Result};
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE, HOST};
use http::{HeaderMap, Method};
use log::debug;
use serde_json::{Map, Value};

pub(crate) const CONTENT_TYPE_URLENCODED: &str = "application/x-www-form-urlencoded";
pub(crate) const CONTENT_TYPE_XML: &str = "application/xml";
pub(crate) const CONTENT_TYPE_STREAM: &str = "application/octet-stream";

pub(crate) type Query = Vec<(String, Option<String>)>;
pub(crate) type Headers = Vec<(String, String)>;

/// Client for the OSS REST API.
///
/// Signs every request with the V4 header scheme and decodes the XML
/// or JSON payload into `serde_json::Value`.
#[derive(Clone, Debug)]
pub struct OssClient {
    ctx: Context,
    config: Config,
    region: &'static Region,
}

impl OssClient {
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

    /// Host serving the given bucket, or the bare regional endpoint.
    pub(crate) fn host(&self, bucket: Option<&str>) -> String {
        match bucket {
            Some(bucket) => format!("{bucket}.{}", self.region.extranet_endpoint),
            None => self.region.extranet_endpoint.to_string(),
        }
    }

    pub(crate) async fn request(
        &self,
        method: Method,
        bucket: Option<&str>,
        object: Option<&str>,
        headers: Headers,
        query: Query,
        body: Option<String>,
    ) -> Result<Value> {
        let (value, _) = self
            .request_with_headers(method, bucket, object, headers, query, body)
            .await?;
        Ok(value)
    }

    /// Issue a signed request, returning the decoded payload and the
    /// response headers.
    pub(crate) async fn request_with_headers(
        &self,
        method: Method,
        bucket: Option<&str>,
        object: Option<&str>,
        mut headers: Headers,
        query: Query,
        body: Option<String>,
    ) -> Result<(Value, HeaderMap)> {
        let host = self.host(bucket);
        headers.push((HOST.as_str().to_string(), host.clone()));
        let now = time::now();
        headers.push(("x-oss-date".to_string(), time::format_iso8601(now)));
        headers.push(("x-oss-content-sha256".to_string(), "UNSIGNED-PAYLOAD".to_string()));
        let authorization = sign::authorization(
            &self.config.access_key_id,
            &self.config.access_key_secret,
            &self.config.region_id,
            method.as_str(),
            bucket,
            object,
            &query,
            &headers,
            now,
        );
        debug!("signed oss request: {} {host} {object:?}", method.as_str());

        let path = match object {
            Some(object) => format!("/{object}"),
            None => "/".to_string(),
        };
        let url = if query.is_empty() {
            format!("https://{host}{path}")
        } else {
            format!("https://{host}{path}?{}", query_string(&query))
        };

        let mut builder = http::Request::builder()
            .method(method)
            .uri(url)
            .header(AUTHORIZATION, authorization);
        for (key, value) in &headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        let req = builder.body(Bytes::from(body.unwrap_or_default()))?;

        let resp = self.ctx.http_send_as_string(req).await?;
        let (parts, response_body) = resp.into_parts();
        let is_xml = content_type_is(&parts.headers, "xml");

        if parts.status != http::StatusCode::OK && parts.status != http::StatusCode::NO_CONTENT {
            if !response_body.is_empty() && is_xml {
                let envelope = xml::from_xml(&response_body)?;
                let message = envelope
                    .get("Message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                let mut err = Error::vendor_response(message);
                if let Some(code) = envelope.get("Code").and_then(Value::as_str) {
                    err = err.with_vendor_code(code);
                }
                if let Some(id) = envelope.get("RequestId").and_then(Value::as_str) {
                    err = err.with_request_id(id);
                }
                return Err(err);
            }
            return Err(Error::response_invalid(format!(
                "Request exception: status {}",
                parts.status
            )));
        }

        let decoded = if response_body.is_empty() {
            Value::Null
        } else if is_xml {
            xml::from_xml(&response_body)?
        } else if content_type_is(&parts.headers, "json") {
            serde_json::from_str(&response_body)
                .map_err(|e| Error::decode_invalid("response body is not JSON").with_source(e))?
        } else {
            Value::String(response_body)
        };
        Ok((decoded, parts.headers))
    }
}

fn query_string(query: &Query) -> String {
    query
        .iter()
        .map(|(k, v)| match v {
            Some(v) => format!("{k}={v}"),
            None => k.clone(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn content_type_is(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains(token))
        .unwrap_or(false)
}

/// Response headers as a JSON object of string values.
pub(crate) fn headers_to_value(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            map.insert(name.as_str().to_string(), Value::String(value.to_string()));
        }
    }
    Value::Object(map)
}
