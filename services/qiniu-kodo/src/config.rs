use bridge_core::utils::Redact;
use bridge_core::{require_config, Result};
use std::fmt::{Debug, Formatter};

/// Credentials and defaults for a Kodo tenant.
#[derive(Clone)]
pub struct Config {
    /// Access key.
    pub access_key: String,
    /// Secret key.
    pub secret_key: String,
    /// Region id, e.g. `z1`. Must name a known region.
    pub region_id: String,
    /// Domain bound to the bucket, used for public object URLs.
    pub access_domain: String,
    /// Scheme of public object URLs and API requests.
    pub is_ssl: bool,
    /// Default bucket for the [`crate::Bucket`] and [`crate::Objects`]
    /// facades. Can be overridden per facade with `set_bucket`.
    pub bucket_name: String,
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("access_key", &self.access_key)
            .field("secret_key", &Redact::from(&self.secret_key))
            .field("region_id", &self.region_id)
            .field("access_domain", &self.access_domain)
            .field("is_ssl", &self.is_ssl)
            .field("bucket_name", &self.bucket_name)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            secret_key: String::new(),
            region_id: String::new(),
            access_domain: String::new(),
            is_ssl: true,
            bucket_name: String::new(),
        }
    }
}

impl Config {
    /// Validate required fields, naming missing ones by dotted path.
    pub fn check(&self) -> Result<()> {
        require_config(
            "qiniu.kodo",
            &[
                ("access_key", &self.access_key),
                ("secret_key", &self.secret_key),
                ("region_id", &self.region_id),
                ("access_domain", &self.access_domain),
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
            access_key: "qn_ak".to_string(),
            region_id: "z1".to_string(),
            ..Default::default()
        };
        let err = config.check().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(
            err.to_string(),
            "Missing Config [qiniu.kodo.secret_key, qiniu.kodo.access_domain]"
        );
    }

    #[test]
    fn test_default_uses_ssl() {
        assert!(Config::default().is_ssl);
    }

    #[test]
    fn test_debug_redacts_key_material() {
        let config = Config {
            secret_key: "kodoSecretKeyMaterial001".to_string(),
            ..Default::default()
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("kodoSecretKeyMaterial001"));
        assert!(printed.contains("secret_key: kod***001"));
    }
}
