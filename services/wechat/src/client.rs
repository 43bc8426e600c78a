use bridge_core::rsa::parse_rsa_private_key;
use bridge_core::utils::nonce_str;
use bridge_core::{time, Context, Error, Result};
use bytes::Bytes;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use log::debug;
use rsa::RsaPrivateKey;
use serde_json::Value;

use crate::config::PaymentConfig;
use crate::sign;

const API_ORIGIN: &str = "https://api.mch.weixin.qq.com";

/// Client for the WeChat Pay v3 REST gateway.
///
/// Holds the merchant key material and runs the signed-request
/// pipeline. The platform certificate used to verify webhooks is
/// fetched lazily and cached through the context's cache store.
#[derive(Clone, Debug)]
pub struct PayClient {
    ctx: Context,
    config: PaymentConfig,
    private_key: RsaPrivateKey,
    serial_no: String,
}

impl PayClient {
    /// Create a client, reading the merchant certificate and key
    /// through the context's file reader.
    pub async fn new(ctx: Context, config: PaymentConfig) -> Result<Self> {
        config.check()?;
        let key_pem = ctx.file_read_as_string(&config.ssl_key).await?;
        let private_key = parse_rsa_private_key(&key_pem)?;
        let cert_pem = ctx.file_read_as_string(&config.ssl_cert).await?;
        let serial_no = sign::certificate_serial(&cert_pem)?;
        Ok(Self {
            ctx,
            config,
            private_key,
            serial_no,
        })
    }

    pub(crate) fn config(&self) -> &PaymentConfig {
        &self.config
    }

    pub(crate) fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    /// Issue a signed request and return the decoded JSON payload.
    ///
    /// Empty success bodies (204 from order close) decode to `Null`.
    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Value,
    ) -> Result<Value> {
        let uri = if query.is_empty() {
            path.to_string()
        } else {
            let qs: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
            format!("{path}?{}", qs.join("&"))
        };
        let body_str = if body.is_null() {
            String::new()
        } else {
            serde_json::to_string(&body)
                .map_err(|e| Error::unexpected("cannot serialize request body").with_source(e))?
        };

        let authorization = sign::authorization(
            &self.private_key,
            &self.config.mch_id,
            &self.serial_no,
            method.as_str(),
            &uri,
            &body_str,
            &nonce_str(32),
            time::now().timestamp(),
        )?;
        debug!("signed wechat pay request: {} {uri}", method.as_str());

        let req = http::Request::builder()
            .method(method)
            .uri(format!("{API_ORIGIN}{uri}"))
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(Bytes::from(body_str))?;

        let resp = self.ctx.http_send_as_string(req).await?;
        let (parts, response_body) = resp.into_parts();

        if response_body.is_empty() {
            if parts.status.is_success() {
                return Ok(Value::Null);
            }
            return Err(Error::response_invalid(format!(
                "Request exception: status {}",
                parts.status
            )));
        }

        let result: Value = serde_json::from_str(&response_body)
            .map_err(|e| Error::decode_invalid("response body is not JSON").with_source(e))?;

        // v3 success payloads never carry a code field.
        if let Some(code) = result.get("code").and_then(Value::as_str) {
            let message = result
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            let mut err = Error::vendor_response(message).with_vendor_code(code);
            if let Some(id) = parts.headers.get("request-id").and_then(|v| v.to_str().ok()) {
                err = err.with_request_id(id);
            }
            return Err(err);
        }
        Ok(result)
    }

    /// The platform certificate PEM, fetched from `/v3/certificates`
    /// and cached for eleven hours.
    pub(crate) async fn platform_certificate(&self) -> Result<String> {
        let cache_key = format!("wechat_public_cert_{}", self.config.mch_id);
        if let Some(cert) = self.ctx.cache_get(&cache_key).await? {
            if !cert.is_empty() {
                return Ok(cert);
            }
        }

        let result = self
            .request(Method::GET, "/v3/certificates", &[], Value::Null)
            .await?;
        let data = result
            .get("data")
            .and_then(Value::as_array)
            .filter(|entries| !entries.is_empty())
            .ok_or_else(|| Error::response_invalid("certificate list is empty"))?;
        // The newest certificate comes last.
        let envelope = data[data.len() - 1]
            .get("encrypt_certificate")
            .ok_or_else(|| Error::response_invalid("certificate entry carries no envelope"))?;
        let field = |name: &str| -> Result<&str> {
            envelope.get(name).and_then(Value::as_str).ok_or_else(|| {
                Error::response_invalid(format!("certificate envelope misses {name}"))
            })
        };

        let plain = sign::aes_256_gcm_decrypt(
            &self.config.mch_key,
            field("nonce")?,
            field("associated_data")?,
            field("ciphertext")?,
        )?;
        let cert = String::from_utf8(plain)?;
        self.ctx.cache_set(&cache_key, &cert, 3600 * 11).await?;
        Ok(cert)
    }
}
