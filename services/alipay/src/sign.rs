//! Canonical strings, signatures and content encryption for the two
//! Alipay protocol profiles.
//!
//! The form profile signs a sorted `key=value&...` rendering of the
//! request parameters. The OpenAPI v3 profile signs an auth string
//! plus the literal request line and body, newline separated.

use crate::config::SignType;
use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use bridge_core::hash::{base64_decode, base64_encode};
use bridge_core::rsa::{sha1_sign, sha1_verify, sha256_sign, sha256_verify};
use bridge_core::{Error, Result};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::Value;
use std::collections::BTreeMap;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

const AES_BLOCK: usize = 16;

/// Sorted `key=value&...` canonical string over the request parameters.
///
/// `sign` is always excluded. `sign_type` is part of the signed string
/// for requests but excluded when verifying webhooks, controlled by
/// `need_sign_type`. Empty and null values are dropped entirely.
pub fn canonicalize(params: &BTreeMap<String, Value>, need_sign_type: bool) -> String {
    params
        .iter()
        .filter(|(key, _)| key.as_str() != "sign")
        .filter(|(key, _)| need_sign_type || key.as_str() != "sign_type")
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(format!("{key}={s}")),
            other => Some(format!("{key}={other}")),
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Sign the canonical form of `params`, returning the base64 signature.
pub fn sign_form(
    params: &BTreeMap<String, Value>,
    key: &RsaPrivateKey,
    sign_type: SignType,
) -> Result<String> {
    let canonical = canonicalize(params, true);
    let signature = match sign_type {
        SignType::Rsa2 => sha256_sign(key, canonical.as_bytes())?,
        SignType::Rsa => sha1_sign(key, canonical.as_bytes())?,
    };
    Ok(base64_encode(&signature))
}

/// Verify a signed parameter map, as received on the webhook surface.
///
/// The signed string excludes both `sign` and `sign_type`; the
/// algorithm is taken from the map's own `sign_type` field.
pub fn verify_form(params: &BTreeMap<String, Value>, key: &RsaPublicKey) -> Result<()> {
    let sign = params
        .get("sign")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::verify_failed("missing sign field"))?;
    let sign_type = params
        .get("sign_type")
        .and_then(Value::as_str)
        .unwrap_or("RSA2");
    let signature = base64_decode(sign)?;
    let canonical = canonicalize(params, false);
    match sign_type {
        "RSA" => sha1_verify(key, canonical.as_bytes(), &signature),
        _ => sha256_verify(key, canonical.as_bytes(), &signature),
    }
}

/// Verify a signature over an explicit canonical string, used by the
/// form gateway which signs the response node's JSON rendering.
pub fn verify_content(
    content: &str,
    sign: &str,
    sign_type: SignType,
    key: &RsaPublicKey,
) -> Result<()> {
    let signature = base64_decode(sign)?;
    match sign_type {
        SignType::Rsa2 => sha256_verify(key, content.as_bytes(), &signature),
        SignType::Rsa => sha1_verify(key, content.as_bytes(), &signature),
    }
}

/// The OpenAPI v3 `Authorization` header and the auth string embedded
/// in it.
///
/// The signed content is `authString\nMETHOD\nURI\n[BODY\n][TOKEN\n]`,
/// with the URI carrying its query string and a trailing newline after
/// the last element.
#[allow(clippy::too_many_arguments)]
pub fn v3_authorization(
    key: &RsaPrivateKey,
    app_id: &str,
    app_cert_sn: Option<&str>,
    method: &str,
    uri: &str,
    body: &str,
    app_auth_token: Option<&str>,
    nonce: &str,
    timestamp_ms: i64,
) -> Result<String> {
    let mut auth_parts = vec![
        format!("app_id={app_id}"),
        format!("nonce={nonce}"),
        format!("timestamp={timestamp_ms}"),
    ];
    if let Some(sn) = app_cert_sn {
        auth_parts.push(format!("app_cert_sn={sn}"));
    }
    let auth_string = auth_parts.join(",");

    let mut content_parts = vec![auth_string.as_str(), method, uri];
    if !body.is_empty() {
        content_parts.push(body);
    }
    if let Some(token) = app_auth_token {
        content_parts.push(token);
    }
    let content = format!("{}\n", content_parts.join("\n"));

    let signature = base64_encode(&sha256_sign(key, content.as_bytes())?);
    Ok(format!(
        "ALIPAY-SHA256withRSA {auth_string},sign={signature}"
    ))
}

/// Verify a v3 response or webhook over `timestamp\nnonce\nbody\n`.
pub fn v3_verify(
    key: &RsaPublicKey,
    timestamp: &str,
    nonce: &str,
    body: &str,
    sign: &str,
) -> Result<()> {
    let content = format!("{timestamp}\n{nonce}\n{body}\n");
    let signature = base64_decode(sign)?;
    sha256_verify(key, content.as_bytes(), &signature)
}

/// PKCS7-pad to the AES block size. Block-aligned input grows by a
/// full padding block.
pub fn add_pkcs7_padding(mut source: Vec<u8>) -> Vec<u8> {
    let pad = AES_BLOCK - source.len() % AES_BLOCK;
    source.extend(std::iter::repeat(pad as u8).take(pad));
    source
}

/// Strip PKCS7 padding.
///
/// A trailing byte of 62 means "already unpadded" and the input is
/// returned unchanged. This mirrors gateway behavior observed in
/// production; do not generalize it.
pub fn strip_pkcs7_padding(source: Vec<u8>) -> Result<Vec<u8>> {
    let Some(&last) = source.last() else {
        return Ok(source);
    };
    if last == 62 {
        return Ok(source);
    }
    let pad = last as usize;
    if pad == 0 || pad > source.len() {
        return Err(Error::decode_invalid("invalid PKCS7 padding"));
    }
    let mut source = source;
    source.truncate(source.len() - pad);
    Ok(source)
}

fn content_key(encrypt_key: &str) -> Result<Vec<u8>> {
    let key = base64_decode(encrypt_key)
        .map_err(|e| Error::config_invalid("encrypt_key is not valid base64").with_source(e))?;
    if key.len() != AES_BLOCK {
        return Err(Error::config_invalid("encrypt_key must decode to 16 bytes"));
    }
    Ok(key)
}

/// Encrypt a request body: PKCS7 pad, AES-128-CBC with a zero IV,
/// base64 encode.
pub fn encrypt_content(plain: &[u8], encrypt_key: &str) -> Result<String> {
    let key = content_key(encrypt_key)?;
    let padded = add_pkcs7_padding(plain.to_vec());
    let cipher = Aes128CbcEnc::new_from_slices(&key, &[0u8; AES_BLOCK])
        .map_err(|e| Error::config_invalid("invalid AES key").with_source(e))?;
    let encrypted = cipher.encrypt_padded_vec_mut::<NoPadding>(&padded);
    Ok(base64_encode(&encrypted))
}

/// Decrypt a response body, the inverse of [`encrypt_content`].
pub fn decrypt_content(encoded: &str, encrypt_key: &str) -> Result<Vec<u8>> {
    let key = content_key(encrypt_key)?;
    let encrypted = base64_decode(encoded)?;
    let cipher = Aes128CbcDec::new_from_slices(&key, &[0u8; AES_BLOCK])
        .map_err(|e| Error::config_invalid("invalid AES key").with_source(e))?;
    let decrypted = cipher
        .decrypt_padded_vec_mut::<NoPadding>(&encrypted)
        .map_err(|e| Error::decode_invalid("Encrypt fail").with_source(e))?;
    strip_pkcs7_padding(decrypted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::rsa::parse_rsa_private_key;
    use serde_json::json;
    use test_case::test_case;

    const TEST_KEY_PEM: &str = include_str!("../testdata/app_key.pem");
    // base64 of a 16-byte key
    const TEST_ENCRYPT_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZg==";

    fn params() -> BTreeMap<String, Value> {
        let mut map = BTreeMap::new();
        map.insert("app_id".to_string(), json!("2021000"));
        map.insert("method".to_string(), json!("alipay.trade.query"));
        map.insert("sign".to_string(), json!("ignored"));
        map.insert("sign_type".to_string(), json!("RSA2"));
        map.insert("empty".to_string(), json!(""));
        map.insert("absent".to_string(), Value::Null);
        map.insert("charset".to_string(), json!("UTF-8"));
        map
    }

    #[test]
    fn test_canonicalize_with_sign_type() {
        assert_eq!(
            canonicalize(&params(), true),
            "app_id=2021000&charset=UTF-8&method=alipay.trade.query&sign_type=RSA2"
        );
    }

    #[test]
    fn test_canonicalize_without_sign_type() {
        assert_eq!(
            canonicalize(&params(), false),
            "app_id=2021000&charset=UTF-8&method=alipay.trade.query"
        );
    }

    #[test]
    fn test_sign_form_covers_sign_type() {
        let key = parse_rsa_private_key(TEST_KEY_PEM).unwrap();
        let public = rsa::RsaPublicKey::from(&key);

        let sign = sign_form(&params(), &key, SignType::Rsa2).unwrap();
        let signed_string = canonicalize(&params(), true);
        verify_content(&signed_string, &sign, SignType::Rsa2, &public).unwrap();
    }

    #[test]
    fn test_verify_form_round_trip() {
        // Webhook payloads exclude sign_type from the signed string.
        let key = parse_rsa_private_key(TEST_KEY_PEM).unwrap();
        let public = rsa::RsaPublicKey::from(&key);

        let mut map = params();
        let canonical = canonicalize(&map, false);
        let sig = sha256_sign(&key, canonical.as_bytes()).unwrap();
        map.insert("sign".to_string(), json!(base64_encode(&sig)));
        verify_form(&map, &public).unwrap();
    }

    #[test]
    fn test_verify_form_rejects_tamper() {
        let key = parse_rsa_private_key(TEST_KEY_PEM).unwrap();
        let public = rsa::RsaPublicKey::from(&key);

        let mut map = params();
        map.remove("sign_type");
        let canonical = canonicalize(&map, false);
        let sig = sha256_sign(&key, canonical.as_bytes()).unwrap();
        map.insert("sign".to_string(), json!(base64_encode(&sig)));
        map.insert("app_id".to_string(), json!("2021001"));
        let err = verify_form(&map, &public).unwrap_err();
        assert_eq!(err.kind(), bridge_core::ErrorKind::VerifyFailed);
    }

    #[test]
    fn test_v3_authorization_shape() {
        let key = parse_rsa_private_key(TEST_KEY_PEM).unwrap();
        let auth = v3_authorization(
            &key,
            "2021000",
            None,
            "POST",
            "/v3/alipay/trade/query",
            "{}",
            None,
            "nonce123",
            1700000000000,
        )
        .unwrap();
        assert!(auth.starts_with(
            "ALIPAY-SHA256withRSA app_id=2021000,nonce=nonce123,timestamp=1700000000000,sign="
        ));
    }

    #[test]
    fn test_v3_authorization_cert_mode_appends_sn() {
        let key = parse_rsa_private_key(TEST_KEY_PEM).unwrap();
        let auth = v3_authorization(
            &key,
            "2021000",
            Some("abc123"),
            "GET",
            "/v3/alipay/fund/account/query?account_type=ACCTRANS_ACCOUNT",
            "{}",
            None,
            "n",
            1,
        )
        .unwrap();
        assert!(auth.contains("app_cert_sn=abc123,sign="));
    }

    #[test]
    fn test_v3_verify_round_trip() {
        let key = parse_rsa_private_key(TEST_KEY_PEM).unwrap();
        let public = rsa::RsaPublicKey::from(&key);
        let body = r#"{"code":"10000"}"#;
        let content = format!("1700000000\nnonce\n{body}\n");
        let sig = base64_encode(&sha256_sign(&key, content.as_bytes()).unwrap());

        v3_verify(&public, "1700000000", "nonce", body, &sig).unwrap();
        let err = v3_verify(&public, "1700000001", "nonce", body, &sig).unwrap_err();
        assert_eq!(err.kind(), bridge_core::ErrorKind::VerifyFailed);
    }

    #[test_case(b"".to_vec(); "empty grows a full block")]
    #[test_case(b"hello".to_vec(); "short input")]
    #[test_case(b"0123456789abcdef".to_vec(); "block aligned input")]
    #[test_case(b"0123456789abcdef0".to_vec(); "just over a block")]
    fn test_pkcs7_round_trip(input: Vec<u8>) {
        let padded = add_pkcs7_padding(input.clone());
        assert_eq!(padded.len() % AES_BLOCK, 0);
        assert!(padded.len() > input.len());
        assert_eq!(strip_pkcs7_padding(padded).unwrap(), input);
    }

    #[test]
    fn test_strip_pkcs7_keeps_trailing_62() {
        // '>' is byte 62, the sentinel for already-unpadded content.
        let data = b"raw data ending in >".to_vec();
        assert_eq!(strip_pkcs7_padding(data.clone()).unwrap(), data);
    }

    #[test]
    fn test_content_encryption_round_trip() {
        let plain = br#"{"out_trade_no":"T1"}"#;
        let encrypted = encrypt_content(plain, TEST_ENCRYPT_KEY).unwrap();
        assert_ne!(encrypted.as_bytes(), plain);
        assert_eq!(decrypt_content(&encrypted, TEST_ENCRYPT_KEY).unwrap(), plain);
    }

    #[test]
    fn test_bad_encrypt_key_is_config_invalid() {
        let err = encrypt_content(b"{}", "dG9vc2hvcnQ=").unwrap_err();
        assert_eq!(err.kind(), bridge_core::ErrorKind::ConfigInvalid);
    }
}
