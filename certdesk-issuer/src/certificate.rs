//! CSR construction and issued-chain parsing.

use crate::error::{IssuerError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use certdesk_crypto::PrivateKey;
use chrono::{DateTime, Utc};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use ring::digest::{SHA256, digest};

/// Build a DER CSR for `domains` signed with `key`.
///
/// The first domain becomes the subject CN; every domain is listed as a SAN.
pub fn build_csr(key: &PrivateKey, domains: &[String]) -> Result<Vec<u8>> {
    let first = domains
        .first()
        .ok_or_else(|| IssuerError::Validation("a CSR needs at least one domain".to_string()))?;

    let key_pair = KeyPair::from_pem(&key.to_pkcs8_pem()?)?;

    let mut params = CertificateParams::new(domains.to_vec())?;
    let mut name = DistinguishedName::new();
    name.push(DnType::CommonName, first.clone());
    params.distinguished_name = name;

    let csr = params.serialize_request(&key_pair)?;
    Ok(csr.der().to_vec())
}

/// Certificate material extracted from a PEM chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCertificate {
    /// Leaf certificate
    pub cert_pem: String,
    /// Leaf followed by intermediates
    pub chain_pem: String,
    /// Intermediates only; `None` when the CA sent the leaf alone
    pub issuer_pem: Option<String>,
    /// Uppercase hex serial number
    pub serial: String,
    /// Lowercase hex SHA-256 of the leaf DER
    pub fingerprint: String,
    pub not_after: DateTime<Utc>,
}

impl IssuedCertificate {
    /// Split a chain, leaf first, and read the leaf's metadata.
    pub fn from_pem_chain(pem: &str) -> Result<Self> {
        let certs = certificates_der(pem)?;
        let (leaf, issuers) = certs
            .split_first()
            .ok_or_else(|| IssuerError::Certificate("no certificate in chain".to_string()))?;

        let (_, parsed) = x509_parser::parse_x509_certificate(leaf)
            .map_err(|e| IssuerError::Certificate(format!("invalid leaf certificate: {}", e)))?;

        let not_after = DateTime::from_timestamp(parsed.validity().not_after.timestamp(), 0)
            .ok_or_else(|| IssuerError::Certificate("certificate expiry out of range".to_string()))?;

        let issuer_pem = if issuers.is_empty() {
            None
        } else {
            Some(issuers.iter().map(|der| to_pem(der)).collect())
        };

        Ok(Self {
            cert_pem: to_pem(leaf),
            chain_pem: certs.iter().map(|der| to_pem(der)).collect(),
            issuer_pem,
            serial: serial_hex(parsed.raw_serial()),
            fingerprint: hex::encode(digest(&SHA256, leaf)),
            not_after,
        })
    }
}

/// DER bodies of every CERTIFICATE block in `pem`.
pub fn certificates_der(pem: &str) -> Result<Vec<Vec<u8>>> {
    rustls_pemfile::certs(&mut pem.as_bytes())
        .map(|cert| {
            cert.map(|der| der.as_ref().to_vec())
                .map_err(|e| IssuerError::Certificate(format!("invalid PEM chain: {}", e)))
        })
        .collect()
}

fn to_pem(der: &[u8]) -> String {
    let body = STANDARD.encode(der);
    let mut pem = String::from("-----BEGIN CERTIFICATE-----\n");
    for line in body.as_bytes().chunks(64) {
        // base64 output is ASCII
        pem.push_str(&String::from_utf8_lossy(line));
        pem.push('\n');
    }
    pem.push_str("-----END CERTIFICATE-----\n");
    pem
}

// DER integers carry a leading zero when the high bit is set
fn serial_hex(raw: &[u8]) -> String {
    let start = raw.iter().position(|b| *b != 0).unwrap_or(raw.len().saturating_sub(1));
    hex::encode_upper(&raw[start..])
}
