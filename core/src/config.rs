//! Config validation helpers shared by the vendor clients.

use crate::{Error, Result};

/// Check that every listed field is non-empty, reporting all misses at
/// once under their dotted path.
///
/// `scope` is the dotted prefix of the config section, for example
/// `wechat.payment`. A single missing `mch_id` yields
/// `Missing Config [wechat.payment.mch_id]`.
pub fn require_config(scope: &str, fields: &[(&str, &str)]) -> Result<()> {
    let missing: Vec<String> = fields
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| format!("{scope}.{name}"))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::config_invalid(format!(
            "Missing Config [{}]",
            missing.join(", ")
        )))
    }
}

/// Check that every listed option is non-empty, for caller-supplied
/// structured arguments rather than config sections.
pub fn require_options(fields: &[(&str, &str)]) -> Result<()> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::argument_invalid(format!(
            "Missing Options [{}]",
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_require_config_ok() {
        require_config("ali.payment", &[("app_id", "2021000"), ("private_key", "k")]).unwrap();
    }

    #[test]
    fn test_require_config_names_dotted_path() {
        let err = require_config(
            "wechat.payment",
            &[("app_id", "wx123"), ("mch_id", ""), ("mch_key", "")],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(
            err.to_string(),
            "Missing Config [wechat.payment.mch_id, wechat.payment.mch_key]"
        );
    }

    #[test]
    fn test_require_options() {
        let err = require_options(&[("identity", ""), ("identity_type", "ALIPAY_USER_ID")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentInvalid);
        assert_eq!(err.to_string(), "Missing Options [identity]");
    }
}
