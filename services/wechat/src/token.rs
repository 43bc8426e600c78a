//! Access-token plumbing shared by the official-account and mini-app
//! clients.
//!
//! Tokens are cached through the context's cache store with a safety
//! margin below the vendor expiry. When the vendor rejects a request
//! with a stale-token code the cached token is dropped and the request
//! retried exactly once.

use bridge_core::{Context, Error, ErrorKind, Result};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::Method;
use log::debug;
use serde_json::Value;

use crate::config::{MiniappConfig, OfficialConfig};

const TOKEN_URL: &str = "https://api.weixin.qq.com/cgi-bin/token";

/// Vendor codes that mean the cached access token is no longer usable.
const STALE_TOKEN_CODES: [&str; 4] = ["40014", "40001", "41001", "42001"];

#[derive(Clone, Debug)]
pub(crate) struct ApiClient {
    ctx: Context,
    app_id: String,
    app_secret: String,
    cache_key: String,
}

impl ApiClient {
    pub(crate) fn official(ctx: Context, config: OfficialConfig) -> Result<Self> {
        config.check()?;
        let cache_key = format!("wechat_official_access_token_{}", config.app_id);
        Ok(Self {
            ctx,
            app_id: config.app_id,
            app_secret: config.app_secret,
            cache_key,
        })
    }

    pub(crate) fn miniapp(ctx: Context, config: MiniappConfig) -> Result<Self> {
        config.check()?;
        let cache_key = format!("wechat_miniapp_access_token_{}", config.app_id);
        Ok(Self {
            ctx,
            app_id: config.app_id,
            app_secret: config.app_secret,
            cache_key,
        })
    }

    pub(crate) fn ctx(&self) -> &Context {
        &self.ctx
    }

    pub(crate) fn app_id(&self) -> &str {
        &self.app_id
    }

    pub(crate) fn app_secret(&self) -> &str {
        &self.app_secret
    }

    /// The application access token, fetched on a cache miss.
    pub(crate) async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.ctx.cache_get(&self.cache_key).await? {
            if !token.is_empty() {
                return Ok(token);
            }
        }

        let query = [
            ("grant_type", "client_credential".to_string()),
            ("appid", self.app_id.clone()),
            ("secret", self.app_secret.clone()),
        ];
        let result = self.send(Method::GET, TOKEN_URL, &query, Value::Null).await?;
        let token = result
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::response_invalid("token response carries no access_token"))?;
        let expires_in = result
            .get("expires_in")
            .and_then(Value::as_i64)
            .unwrap_or(7200);
        // Renew well before the vendor-side expiry.
        self.ctx
            .cache_set(&self.cache_key, token, expires_in - 300)
            .await?;
        Ok(token.to_string())
    }

    /// Issue a request, substituting `ACCESS_TOKEN` in the URL and
    /// optionally appending the token as a query parameter.
    pub(crate) async fn request(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Value,
        append_token: bool,
    ) -> Result<Value> {
        let mut retried = false;
        loop {
            let result = self
                .request_once(method.clone(), url, query, body.clone(), append_token)
                .await;
            match result {
                Err(err) if !retried && is_stale_token(&err) => {
                    debug!("access token rejected, refreshing: {err}");
                    self.ctx.cache_del(&self.cache_key).await?;
                    retried = true;
                }
                other => return other,
            }
        }
    }

    async fn request_once(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Value,
        append_token: bool,
    ) -> Result<Value> {
        let needs_token = append_token || url.contains("ACCESS_TOKEN");
        let mut query: Vec<(&str, String)> = query.to_vec();
        let url = if needs_token {
            let token = self.access_token().await?;
            if append_token {
                query.push(("access_token", token.clone()));
            }
            url.replace("ACCESS_TOKEN", &urlencode(&token))
        } else {
            url.to_string()
        };
        self.send(method, &url, &query, body).await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Value,
    ) -> Result<Value> {
        let url = if query.is_empty() {
            url.to_string()
        } else {
            let mut serializer = form_urlencoded::Serializer::new(String::new());
            for (k, v) in query {
                serializer.append_pair(k, v);
            }
            let sep = if url.contains('?') { '&' } else { '?' };
            format!("{url}{sep}{}", serializer.finish())
        };

        let mut builder = http::Request::builder().method(method.clone()).uri(&url);
        let body_bytes = if method == Method::POST {
            builder = builder.header(CONTENT_TYPE, "application/json");
            if body.is_null() {
                Bytes::from("{}")
            } else {
                let body = serde_json::to_string(&body)
                    .map_err(|e| Error::unexpected("cannot serialize request body").with_source(e))?;
                Bytes::from(body)
            }
        } else {
            Bytes::new()
        };
        let req = builder.body(body_bytes)?;

        let resp = self.ctx.http_send_as_string(req).await?;
        let (parts, response_body) = resp.into_parts();
        if response_body.is_empty() {
            return Err(Error::response_invalid(format!(
                "Request exception: status {}",
                parts.status
            )));
        }
        let result: Value = serde_json::from_str(&response_body)
            .map_err(|e| Error::decode_invalid("response body is not JSON").with_source(e))?;

        let errcode = result.get("errcode").and_then(Value::as_i64).unwrap_or(0);
        if errcode != 0 {
            let errmsg = result
                .get("errmsg")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(Error::vendor_response(errmsg).with_vendor_code(errcode.to_string()));
        }
        Ok(result)
    }
}

pub(crate) fn urlencode(content: &str) -> String {
    form_urlencoded::byte_serialize(content.as_bytes()).collect()
}

fn is_stale_token(err: &Error) -> bool {
    err.kind() == ErrorKind::VendorResponse
        && err
            .vendor_code()
            .map_or(false, |code| STALE_TOKEN_CODES.contains(&code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_token_predicate() {
        assert!(is_stale_token(
            &Error::vendor_response("access_token expired").with_vendor_code("42001")
        ));
        assert!(!is_stale_token(
            &Error::vendor_response("invalid openid").with_vendor_code("40003")
        ));
        assert!(!is_stale_token(&Error::response_invalid("not json")));
    }
}
