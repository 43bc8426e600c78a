use bridge_core::utils::Redact;
use bridge_core::{require_config, Result};
use std::fmt::{Debug, Formatter};

/// Merchant credentials for WeChat Pay v3.
#[derive(Clone, Default)]
pub struct PaymentConfig {
    /// Application id bound to the merchant.
    pub app_id: String,
    /// Merchant id assigned by WeChat Pay.
    pub mch_id: String,
    /// APIv3 key, exactly 32 bytes. Decrypts platform payloads.
    pub mch_key: String,
    /// Path to the merchant certificate (`apiclient_cert.pem`).
    pub ssl_cert: String,
    /// Path to the merchant private key (`apiclient_key.pem`).
    pub ssl_key: String,
}

impl Debug for PaymentConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("app_id", &self.app_id)
            .field("mch_id", &self.mch_id)
            .field("mch_key", &Redact::from(&self.mch_key))
            .field("ssl_cert", &self.ssl_cert)
            .field("ssl_key", &self.ssl_key)
            .finish()
    }
}

impl PaymentConfig {
    /// Validate required fields, naming missing ones by dotted path.
    pub fn check(&self) -> Result<()> {
        require_config(
            "wechat.payment",
            &[
                ("app_id", &self.app_id),
                ("mch_id", &self.mch_id),
                ("mch_key", &self.mch_key),
                ("ssl_cert", &self.ssl_cert),
                ("ssl_key", &self.ssl_key),
            ],
        )
    }
}

/// Credentials of an official account (公众号).
#[derive(Clone, Default)]
pub struct OfficialConfig {
    /// Application id of the official account.
    pub app_id: String,
    /// Application secret, used to fetch access tokens.
    pub app_secret: String,
}

impl Debug for OfficialConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfficialConfig")
            .field("app_id", &self.app_id)
            .field("app_secret", &Redact::from(&self.app_secret))
            .finish()
    }
}

impl OfficialConfig {
    /// Validate required fields, naming missing ones by dotted path.
    pub fn check(&self) -> Result<()> {
        require_config(
            "wechat.official",
            &[
                ("app_id", &self.app_id),
                ("app_secret", &self.app_secret),
            ],
        )
    }
}

/// Credentials of a mini program.
#[derive(Clone, Default)]
pub struct MiniappConfig {
    /// Application id of the mini program.
    pub app_id: String,
    /// Application secret, used to fetch access tokens.
    pub app_secret: String,
}

impl Debug for MiniappConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiniappConfig")
            .field("app_id", &self.app_id)
            .field("app_secret", &Redact::from(&self.app_secret))
            .finish()
    }
}

impl MiniappConfig {
    /// Validate required fields, naming missing ones by dotted path.
    pub fn check(&self) -> Result<()> {
        require_config(
            "wechat.miniapp",
            &[
                ("app_id", &self.app_id),
                ("app_secret", &self.app_secret),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::ErrorKind;

    #[test]
    fn test_payment_check_reports_dotted_paths() {
        let config = PaymentConfig {
            app_id: "wx1234567890".to_string(),
            ssl_cert: "/etc/wechat/cert.pem".to_string(),
            ssl_key: "/etc/wechat/key.pem".to_string(),
            ..Default::default()
        };
        let err = config.check().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(
            err.to_string(),
            "Missing Config [wechat.payment.mch_id, wechat.payment.mch_key]"
        );
    }

    #[test]
    fn test_debug_redacts_key_material() {
        let config = PaymentConfig {
            mch_key: "0123456789abcdef0123456789abcdef".to_string(),
            ..Default::default()
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("0123456789abcdef0123456789abcdef"));
        assert!(printed.contains("mch_key: 012***def"));

        let config = OfficialConfig {
            app_secret: "secret".to_string(),
            ..Default::default()
        };
        assert!(format!("{config:?}").contains("app_secret: ***"));
    }

    #[test]
    fn test_official_check_names_its_scope() {
        let err = OfficialConfig::default().check().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing Config [wechat.official.app_id, wechat.official.app_secret]"
        );
    }
}
