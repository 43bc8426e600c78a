use bridge_core::utils::Redact;
use bridge_core::{require_config, Result};
use std::fmt::{Debug, Formatter};

/// Config carries everything the Alipay clients need to sign requests.
///
/// Keys may be full PEM documents or the bare base64 body as copied
/// from the Alipay console.
#[derive(Clone, Default)]
pub struct Config {
    /// Use the sandbox gateway instead of the production one.
    pub sandbox: bool,
    /// Signature algorithm for the legacy form gateway, `RSA2` or `RSA`.
    pub sign_type: SignType,
    /// Application id issued by Alipay.
    pub app_id: String,
    /// Application RSA private key.
    pub private_key: String,
    /// Alipay's RSA public key, used to verify responses and webhooks.
    ///
    /// Ignored in certificate mode, where the key is extracted from
    /// `alipay_public_cert_path` instead.
    pub alipay_public_key: String,
    /// Path to the application public certificate. Setting this
    /// switches the client to certificate mode.
    pub app_public_cert_path: Option<String>,
    /// Path to the Alipay public certificate.
    pub alipay_public_cert_path: Option<String>,
    /// Path to the Alipay root certificate chain.
    pub alipay_root_cert_path: Option<String>,
    /// Base64-encoded AES-128 key for content encryption, if enabled.
    pub encrypt_key: Option<String>,
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("sandbox", &self.sandbox)
            .field("sign_type", &self.sign_type)
            .field("app_id", &self.app_id)
            .field("private_key", &Redact::from(&self.private_key))
            .field("alipay_public_key", &self.alipay_public_key)
            .field("app_public_cert_path", &self.app_public_cert_path)
            .field("alipay_public_cert_path", &self.alipay_public_cert_path)
            .field("alipay_root_cert_path", &self.alipay_root_cert_path)
            .field("encrypt_key", &Redact::from(&self.encrypt_key))
            .finish()
    }
}

/// Signature algorithm for the legacy form gateway.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SignType {
    /// SHA256withRSA, the current default.
    #[default]
    Rsa2,
    /// SHA1withRSA, kept for merchants with old keys.
    Rsa,
}

impl SignType {
    /// The wire name of the algorithm, as sent in `sign_type` fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignType::Rsa2 => "RSA2",
            SignType::Rsa => "RSA",
        }
    }
}

impl Config {
    /// Validate required fields, naming missing ones by dotted path.
    pub fn check(&self) -> Result<()> {
        require_config(
            "ali.payment",
            &[
                ("app_id", &self.app_id),
                ("alipay_public_key", &self.alipay_public_key),
                ("private_key", &self.private_key),
            ],
        )
    }

    /// The OpenAPI gateway origin for this config.
    pub fn gateway(&self) -> &'static str {
        if self.sandbox {
            "https://openapi-sandbox.dl.alipaydev.com"
        } else {
            "https://openapi.alipay.com"
        }
    }

    /// Whether certificate mode is configured.
    pub fn certificate_mode(&self) -> bool {
        self.app_public_cert_path.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::ErrorKind;

    #[test]
    fn test_check_reports_dotted_paths() {
        let config = Config {
            app_id: "2021000".to_string(),
            ..Default::default()
        };
        let err = config.check().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(
            err.to_string(),
            "Missing Config [ali.payment.alipay_public_key, ali.payment.private_key]"
        );
    }

    #[test]
    fn test_debug_redacts_key_material() {
        let config = Config {
            private_key: "MIIEvQIBADANBgkqhkiG9w0BAQEFAASC".to_string(),
            encrypt_key: Some("aWx2Qm9JVmtsV1ZsZkdMbw==".to_string()),
            ..Default::default()
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("MIIEvQIBADANBgkqhkiG9w0BAQEFAASC"));
        assert!(printed.contains("private_key: MII***ASC"));
        assert!(printed.contains("encrypt_key: aWx***w=="));
    }

    #[test]
    fn test_gateway_selection() {
        let mut config = Config::default();
        assert_eq!(config.gateway(), "https://openapi.alipay.com");
        config.sandbox = true;
        assert_eq!(config.gateway(), "https://openapi-sandbox.dl.alipaydev.com");
    }
}
