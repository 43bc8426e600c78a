use bridge_core::utils::Redact;
use bridge_core::{require_config, Result};
use std::fmt::{Debug, Formatter};

/// Credentials and defaults for an OSS tenant.
#[derive(Clone)]
pub struct Config {
    /// Access key id.
    pub access_key_id: String,
    /// Access key secret.
    pub access_key_secret: String,
    /// Region id, e.g. `cn-hangzhou`. Must name a known region.
    pub region_id: String,
    /// Default bucket for the [`crate::Objects`] facade.
    pub bucket_name: String,
    /// Custom access domain for public object URLs. Empty means the
    /// bucket's regional endpoint.
    pub access_domain: String,
    /// Scheme of public object URLs built from `access_domain`.
    pub is_https: bool,
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &Redact::from(&self.access_key_secret))
            .field("region_id", &self.region_id)
            .field("bucket_name", &self.bucket_name)
            .field("access_domain", &self.access_domain)
            .field("is_https", &self.is_https)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_key_id: String::new(),
            access_key_secret: String::new(),
            region_id: String::new(),
            bucket_name: String::new(),
            access_domain: String::new(),
            is_https: true,
        }
    }
}

impl Config {
    /// Validate required fields, naming missing ones by dotted path.
    pub fn check(&self) -> Result<()> {
        require_config(
            "ali.oss",
            &[
                ("access_key_id", &self.access_key_id),
                ("access_key_secret", &self.access_key_secret),
                ("region_id", &self.region_id),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_check_reports_dotted_paths() {
        let config = Config {
            access_key_id: "ak_id".to_string(),
            ..Default::default()
        };
        let err = config.check().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(
            err.to_string(),
            "Missing Config [ali.oss.access_key_secret, ali.oss.region_id]"
        );
    }

    #[test]
    fn test_default_uses_https() {
        assert!(Config::default().is_https);
    }

    #[test]
    fn test_debug_redacts_key_material() {
        let config = Config {
            access_key_secret: "LTAI4FxxSecretMaterial01".to_string(),
            ..Default::default()
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("LTAI4FxxSecretMaterial01"));
        assert!(printed.contains("access_key_secret: LTA***l01"));
    }
}
