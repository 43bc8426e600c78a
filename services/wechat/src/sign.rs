//! WeChat Pay v3 signing primitives.
//!
//! Requests carry a `WECHATPAY2-SHA256-RSA2048` Authorization header
//! signed with the merchant key; responses and webhooks are verified
//! against the platform certificate; platform payloads are sealed with
//! AEAD_AES_256_GCM under the merchant's APIv3 key.

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use bridge_core::hash::{base64_decode, base64_encode};
use bridge_core::rsa::{sha256_sign, sha256_verify};
use bridge_core::{Error, Result};
use der::Encode;
use rsa::pkcs8::DecodePublicKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use x509_cert::Certificate;

/// Sign a message assembled from parts, each followed by a newline.
///
/// SHA256withRSA, base64-encoded. This one layout covers the request
/// Authorization header, the client pay packages and webhook bodies.
pub fn sign_parts(key: &RsaPrivateKey, parts: &[&str]) -> Result<String> {
    let mut content = String::new();
    for part in parts {
        content.push_str(part);
        content.push('\n');
    }
    Ok(base64_encode(&sha256_sign(key, content.as_bytes())?))
}

/// Verify a signature over parts joined the same way as [`sign_parts`].
pub fn verify_parts(key: &RsaPublicKey, parts: &[&str], signature: &str) -> Result<()> {
    let mut content = String::new();
    for part in parts {
        content.push_str(part);
        content.push('\n');
    }
    let signature = base64_decode(signature)?;
    sha256_verify(key, content.as_bytes(), &signature)
}

/// Build the `WECHATPAY2-SHA256-RSA2048` Authorization header value.
///
/// The signed content is `METHOD\nURL\nTIMESTAMP\nNONCE\nBODY\n` where
/// `URL` is the path with its query string and an empty body signs as
/// an empty line.
#[allow(clippy::too_many_arguments)]
pub fn authorization(
    key: &RsaPrivateKey,
    mch_id: &str,
    serial_no: &str,
    method: &str,
    url: &str,
    body: &str,
    nonce: &str,
    timestamp: i64,
) -> Result<String> {
    let timestamp = timestamp.to_string();
    let signature = sign_parts(key, &[method, url, &timestamp, nonce, body])?;
    Ok(format!(
        "WECHATPAY2-SHA256-RSA2048 mchid=\"{mch_id}\",serial_no=\"{serial_no}\",\
         nonce_str=\"{nonce}\",timestamp=\"{timestamp}\",signature=\"{signature}\""
    ))
}

fn parse_one(pem: &str) -> Result<Certificate> {
    let mut certs = Certificate::load_pem_chain(pem.as_bytes())
        .map_err(|e| Error::config_invalid("cannot parse certificate").with_source(e))?;
    let cert = certs
        .drain(..)
        .next()
        .ok_or_else(|| Error::config_invalid("certificate file contains no certificate"));
    cert
}

/// Uppercase hex serial number of a PEM certificate, as WeChat Pay
/// identifies merchant certificates.
pub fn certificate_serial(pem: &str) -> Result<String> {
    let cert = parse_one(pem)?;
    let bytes = cert.tbs_certificate.serial_number.as_bytes();
    // DER integers keep a leading zero octet for high serials.
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    Ok(hex::encode_upper(&bytes[start..]))
}

/// Extract the RSA public key carried by a certificate.
pub fn public_key_from_cert(pem: &str) -> Result<RsaPublicKey> {
    let cert = parse_one(pem)?;
    let spki = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| Error::config_invalid("cannot encode public key").with_source(e))?;
    RsaPublicKey::from_public_key_der(&spki)
        .map_err(|e| Error::config_invalid("certificate does not carry an RSA key").with_source(e))
}

/// Open an AEAD_AES_256_GCM envelope from the platform.
///
/// The base64 ciphertext carries the 16-byte tag at its end; the nonce
/// and associated data come verbatim from the envelope.
pub fn aes_256_gcm_decrypt(
    key: &str,
    nonce: &str,
    associated_data: &str,
    ciphertext: &str,
) -> Result<Vec<u8>> {
    if key.len() != 32 {
        return Err(Error::config_invalid(
            "Missing Config [wechat.payment.mch_key]",
        ));
    }
    if nonce.len() != 12 {
        return Err(Error::decode_invalid("AEAD nonce must be 12 bytes"));
    }
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| Error::config_invalid("Missing Config [wechat.payment.mch_key]"))?;
    let raw = base64_decode(ciphertext)?;
    cipher
        .decrypt(
            Nonce::from_slice(nonce.as_bytes()),
            Payload {
                msg: &raw,
                aad: associated_data.as_bytes(),
            },
        )
        .map_err(|_| Error::decode_invalid("AEAD decryption failed"))
}
