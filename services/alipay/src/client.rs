use crate::cert::CertProfile;
use crate::config::Config;
use crate::sign;
use bridge_core::rsa::{parse_rsa_private_key, parse_rsa_public_key};
use bridge_core::utils::nonce_str;
use bridge_core::{time, Context, Error, Result};
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use log::debug;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::Value;

/// Client for the Alipay OpenAPI v3 REST gateway.
///
/// Holds the parsed key material and runs the signed-request pipeline:
/// encrypt (optional), sign, send, check the certificate SN echo,
/// verify the response signature, decrypt, decode.
#[derive(Clone, Debug)]
pub struct GatewayClient {
    ctx: Context,
    config: Config,
    private_key: RsaPrivateKey,
    alipay_public_key: RsaPublicKey,
    certs: Option<CertProfile>,
}

impl GatewayClient {
    /// Create a client, loading certificates through the context's
    /// file reader when certificate mode is configured.
    ///
    /// All key material is parsed here so a malformed key fails before
    /// any network call.
    pub async fn new(ctx: Context, config: Config) -> Result<Self> {
        config.check()?;
        let private_key = parse_rsa_private_key(&config.private_key)?;

        let certs = if config.certificate_mode() {
            let app_path = config.app_public_cert_path.as_deref().unwrap_or_default();
            let alipay_path = config
                .alipay_public_cert_path
                .as_deref()
                .ok_or_else(|| Error::config_invalid("Missing Config [ali.payment.alipay_public_cert_path]"))?;
            let root_path = config
                .alipay_root_cert_path
                .as_deref()
                .ok_or_else(|| Error::config_invalid("Missing Config [ali.payment.alipay_root_cert_path]"))?;

            let app_cert = ctx.file_read_as_string(app_path).await?;
            let alipay_cert = ctx.file_read_as_string(alipay_path).await?;
            let root_chain = ctx.file_read_as_string(root_path).await?;
            Some(CertProfile::new(&app_cert, &alipay_cert, &root_chain)?)
        } else {
            None
        };

        let alipay_public_key = match &certs {
            Some(profile) => profile.alipay_public_key.clone(),
            None => parse_rsa_public_key(&config.alipay_public_key)?,
        };

        Ok(Self {
            ctx,
            config,
            private_key,
            alipay_public_key,
            certs,
        })
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn certs(&self) -> Option<&CertProfile> {
        self.certs.as_ref()
    }

    pub(crate) fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    pub(crate) fn alipay_public_key(&self) -> &RsaPublicKey {
        &self.alipay_public_key
    }

    /// Issue a signed request and return the decoded JSON payload.
    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Value,
    ) -> Result<Value> {
        let body_str = if body.is_null() {
            "{}".to_string()
        } else {
            serde_json::to_string(&body)
                .map_err(|e| Error::unexpected("cannot serialize request body").with_source(e))?
        };

        let (body_str, encrypted) = match self.config.encrypt_key.as_deref() {
            Some(key) => (sign::encrypt_content(body_str.as_bytes(), key)?, true),
            None => (body_str, false),
        };

        let uri = if query.is_empty() {
            path.to_string()
        } else {
            let qs: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
            format!("{path}?{}", qs.join("&"))
        };

        let authorization = sign::v3_authorization(
            &self.private_key,
            &self.config.app_id,
            self.certs.as_ref().map(|c| c.app_cert_sn.as_str()),
            method.as_str(),
            &uri,
            &body_str,
            None,
            &nonce_str(32),
            time::now().timestamp_millis(),
        )?;
        debug!("signed alipay request: {} {uri}", method.as_str());

        let mut builder = http::Request::builder()
            .method(method)
            .uri(format!("{}{uri}", self.config.gateway()))
            .header(CONTENT_TYPE, "text/plain;charset=utf-8")
            .header(AUTHORIZATION, authorization);
        if encrypted {
            builder = builder.header("alipay-encrypt-type", "AES");
        }
        let req = builder.body(Bytes::from(body_str))?;

        let resp = self.ctx.http_send_as_string(req).await?;
        let (parts, response_body) = resp.into_parts();

        if parts.status != http::StatusCode::OK {
            if response_body.is_empty() {
                return Err(Error::response_invalid(format!(
                    "Request exception: status {}",
                    parts.status
                )));
            }
            let envelope: Value = serde_json::from_str(&response_body)
                .map_err(|e| Error::response_invalid("error body is not JSON").with_source(e))?;
            let message = envelope
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            let mut err = Error::vendor_response(message);
            if let Some(code) = envelope.get("code").and_then(Value::as_str) {
                err = err.with_vendor_code(code);
            }
            return Err(err);
        }

        // The gateway echoes the SN of the certificate it signed with.
        // A mismatch means our cached Alipay certificate is stale.
        if let Some(profile) = &self.certs {
            let echoed = header_str(&parts, "alipay-sn").unwrap_or_default();
            if echoed != profile.alipay_cert_sn {
                return Err(Error::response_invalid("Alipay certificate has expired"));
            }
        }

        let timestamp = require_header(&parts, "alipay-timestamp")?;
        let nonce = require_header(&parts, "alipay-nonce")?;
        let signature = require_header(&parts, "alipay-signature")?;
        sign::v3_verify(
            &self.alipay_public_key,
            &timestamp,
            &nonce,
            &response_body,
            &signature,
        )?;

        let decoded = if self.config.encrypt_key.is_some() {
            let plain =
                sign::decrypt_content(&response_body, self.config.encrypt_key.as_deref().unwrap())?;
            String::from_utf8(plain)?
        } else {
            response_body
        };

        serde_json::from_str(&decoded)
            .map_err(|e| Error::decode_invalid("response body is not JSON").with_source(e))
    }
}

fn header_str(parts: &http::response::Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

fn require_header(parts: &http::response::Parts, name: &str) -> Result<String> {
    header_str(parts, name)
        .ok_or_else(|| Error::response_invalid(format!("missing response header {name}")))
}
