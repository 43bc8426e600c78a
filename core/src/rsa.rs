//! RSA key loading and PKCS#1 v1.5 signatures.
//!
//! Vendor consoles hand keys around in inconsistent shapes: full PEM
//! documents, or the bare base64 body with the envelope stripped. The
//! parsers here accept both, and both PKCS#1 and PKCS#8 encodings.

use crate::hash::base64_decode;
use crate::{Error, Result};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::Sha256;

/// Strip a PEM envelope (if any) and decode the base64 body to DER.
fn pem_body_to_der(content: &str) -> Result<Vec<u8>> {
    let body: String = content
        .lines()
        .filter(|line| !line.trim_start().starts_with("-----"))
        .map(|line| line.trim())
        .collect();
    base64_decode(&body)
        .map_err(|e| Error::config_invalid("key material is not valid base64").with_source(e))
}

/// Parse an RSA private key from a PEM document or a bare base64 body.
pub fn parse_rsa_private_key(content: &str) -> Result<RsaPrivateKey> {
    let der = pem_body_to_der(content)?;
    RsaPrivateKey::from_pkcs1_der(&der)
        .or_else(|_| RsaPrivateKey::from_pkcs8_der(&der))
        .map_err(|e| Error::config_invalid("cannot parse RSA private key").with_source(e))
}

/// Parse an RSA public key from a PEM document or a bare base64 body.
pub fn parse_rsa_public_key(content: &str) -> Result<RsaPublicKey> {
    let der = pem_body_to_der(content)?;
    RsaPublicKey::from_public_key_der(&der)
        .or_else(|_| RsaPublicKey::from_pkcs1_der(&der))
        .map_err(|e| Error::config_invalid("cannot parse RSA public key").with_source(e))
}

/// SHA256withRSA signature, PKCS#1 v1.5 padded.
pub fn sha256_sign(key: &RsaPrivateKey, message: &[u8]) -> Result<Vec<u8>> {
    let signing_key = SigningKey::<Sha256>::new(key.clone());
    Ok(signing_key.sign(message).to_vec())
}

/// Verify a SHA256withRSA signature.
pub fn sha256_verify(key: &RsaPublicKey, message: &[u8], signature: &[u8]) -> Result<()> {
    let verifying_key = VerifyingKey::<Sha256>::new(key.clone());
    let signature = Signature::try_from(signature)
        .map_err(|e| Error::verify_failed("malformed signature").with_source(e))?;
    verifying_key
        .verify(message, &signature)
        .map_err(|e| Error::verify_failed("signature mismatch").with_source(e))
}

/// SHA1withRSA signature for the legacy `RSA` sign type.
pub fn sha1_sign(key: &RsaPrivateKey, message: &[u8]) -> Result<Vec<u8>> {
    let signing_key = SigningKey::<Sha1>::new(key.clone());
    Ok(signing_key.sign(message).to_vec())
}

/// Verify a SHA1withRSA signature.
pub fn sha1_verify(key: &RsaPublicKey, message: &[u8], signature: &[u8]) -> Result<()> {
    let verifying_key = VerifyingKey::<Sha1>::new(key.clone());
    let signature = Signature::try_from(signature)
        .map_err(|e| Error::verify_failed("malformed signature").with_source(e))?;
    verifying_key
        .verify(message, &signature)
        .map_err(|e| Error::verify_failed("signature mismatch").with_source(e))
}
