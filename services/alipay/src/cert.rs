//! Certificate-mode helpers.
//!
//! In certificate mode Alipay identifies keys by a "certificate SN":
//! the MD5 of the issuer DN (field order reversed) concatenated with
//! the decimal serial number. Root chains contribute one SN per
//! RSA-signed certificate, joined by `_`.

use bridge_core::hash::hex_md5;
use bridge_core::{Error, Result};
use der::asn1::ObjectIdentifier;
use der::Encode;
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use x509_cert::Certificate;

const OID_SHA256_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
const OID_SHA1_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5");

/// SNs and the verification key extracted from the three certificate
/// files of a certificate-mode merchant.
#[derive(Clone, Debug)]
pub struct CertProfile {
    /// SN of the application public certificate, sent with each request.
    pub app_cert_sn: String,
    /// SN of the Alipay public certificate, echoed back in responses.
    pub alipay_cert_sn: String,
    /// Joined SNs of the root chain, sent with form requests.
    pub root_cert_sn: String,
    /// Alipay's public key, extracted from its certificate.
    pub alipay_public_key: RsaPublicKey,
}

impl CertProfile {
    /// Build a profile from the three PEM documents.
    pub fn new(app_cert: &str, alipay_cert: &str, root_chain: &str) -> Result<Self> {
        Ok(Self {
            app_cert_sn: cert_sn(app_cert)?,
            alipay_cert_sn: cert_sn(alipay_cert)?,
            root_cert_sn: root_cert_sn(root_chain)?,
            alipay_public_key: public_key_from_cert(alipay_cert)?,
        })
    }
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

/// Certificate SN of a single PEM certificate.
pub fn cert_sn(pem: &str) -> Result<String> {
    Ok(sn_of(&parse_one(pem)?))
}

/// Joined SN of a root chain.
///
/// Only certificates signed with SHA1withRSA or SHA256withRSA
/// contribute; others (ECC roots) are skipped.
pub fn root_cert_sn(pem_chain: &str) -> Result<String> {
    let certs = Certificate::load_pem_chain(pem_chain.as_bytes())
        .map_err(|e| Error::config_invalid("cannot parse root certificate chain").with_source(e))?;

    let sns: Vec<String> = certs
        .iter()
        .filter(|cert| {
            let oid = cert.signature_algorithm.oid;
            oid == OID_SHA256_WITH_RSA || oid == OID_SHA1_WITH_RSA
        })
        .map(sn_of)
        .collect();

    if sns.is_empty() {
        return Err(Error::config_invalid(
            "root certificate chain contains no RSA-signed certificate",
        ));
    }
    Ok(sns.join("_"))
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

fn sn_of(cert: &Certificate) -> String {
    let issuer = issuer_reversed(cert);
    let serial = bytes_to_decimal(cert.tbs_certificate.serial_number.as_bytes());
    hex_md5(format!("{issuer}{serial}").as_bytes())
}

/// Issuer DN with field order reversed, joined as `key=value,...`.
fn issuer_reversed(cert: &Certificate) -> String {
    let mut parts = Vec::new();
    for rdn in cert.tbs_certificate.issuer.0.iter().rev() {
        for attr in rdn.0.iter() {
            let key = dn_key(&attr.oid);
            let value = String::from_utf8_lossy(attr.value.value());
            parts.push(format!("{key}={value}"));
        }
    }
    parts.join(",")
}

fn dn_key(oid: &ObjectIdentifier) -> &'static str {
    match oid.to_string().as_str() {
        "2.5.4.3" => "CN",
        "2.5.4.6" => "C",
        "2.5.4.7" => "L",
        "2.5.4.8" => "ST",
        "2.5.4.10" => "O",
        "2.5.4.11" => "OU",
        _ => "UNKNOWN",
    }
}

/// Big-endian bytes to a decimal string.
///
/// Serial numbers routinely exceed 64 bits, so this runs the schoolbook
/// base conversion over a digit vector instead of a machine integer.
fn bytes_to_decimal(bytes: &[u8]) -> String {
    let mut digits: Vec<u8> = vec![0];
    for &byte in bytes {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            let value = (*digit as u32) * 256 + carry;
            *digit = (value % 10) as u8;
            carry = value / 10;
        }
        while carry > 0 {
            digits.push((carry % 10) as u8);
            carry /= 10;
        }
    }
    digits
        .iter()
        .rev()
        .map(|d| char::from(b'0' + d))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CERT_1: &str = include_str!("../testdata/cert1.pem");
    const CERT_2: &str = include_str!("../testdata/cert2.pem");

    #[test]
    fn test_bytes_to_decimal() {
        assert_eq!(bytes_to_decimal(&[0x00]), "0");
        assert_eq!(bytes_to_decimal(&[0x0f, 0x86, 0xe0, 0x64, 0xfa, 0xb7]), "17071964748471");
        assert_eq!(bytes_to_decimal(&[0x00, 0xbc, 0x61, 0x4e]), "12345678");
    }

    #[test]
    fn test_cert_sn() {
        // issuer CN=Test Root CA 1,O=Alipay,C=CN with serial 0x0F86E064FAB7
        assert_eq!(cert_sn(CERT_1).unwrap(), "7bf63fdd77b110f699faf69f7f39e6f0");
    }

    #[test]
    fn test_root_chain_sn_joins_with_underscore() {
        let chain = format!("{CERT_1}{CERT_2}");
        let sn = root_cert_sn(&chain).unwrap();
        assert_eq!(
            sn,
            "7bf63fdd77b110f699faf69f7f39e6f0_9362f5a2f8ab916e56d3374448334c7c"
        );
        assert_eq!(sn.matches('_').count(), 1);
    }

    #[test]
    fn test_public_key_extraction() {
        public_key_from_cert(CERT_1).unwrap();
    }

    #[test]
    fn test_garbage_is_config_invalid() {
        let err = cert_sn("not a certificate").unwrap_err();
        assert_eq!(err.kind(), bridge_core::ErrorKind::ConfigInvalid);
    }
}
