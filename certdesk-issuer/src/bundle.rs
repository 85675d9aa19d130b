//! Export of issued certificates.

use crate::certificate::certificates_der;
use crate::error::{IssuerError, Result};
use crate::model::CertificateOrder;
use certdesk_crypto::{Encryptor, PrivateKey};
use std::fmt;
use std::io::{Cursor, Write};
use std::str::FromStr;
use std::sync::Arc;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Password used for PKCS#12 bundles when none is given.
pub const DEFAULT_PFX_PASSWORD: &str = "changeit";

/// Export format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// Leaf certificate only
    Pem,
    /// Leaf followed by the issuer chain
    Fullchain,
    /// PKCS#12 with the leaf and private key
    Pfx,
    /// certificate.pem, fullchain.pem, private.key and a README
    Zip,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Pem => "pem",
            ExportFormat::Fullchain => "fullchain",
            ExportFormat::Pfx => "pfx",
            ExportFormat::Zip => "zip",
        }
    }

    pub fn filename(&self) -> &'static str {
        match self {
            ExportFormat::Pem => "certificate.pem",
            ExportFormat::Fullchain => "fullchain.pem",
            ExportFormat::Pfx => "certificate.pfx",
            ExportFormat::Zip => "certificate.zip",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Pem | ExportFormat::Fullchain => "application/x-pem-file",
            ExportFormat::Pfx => "application/x-pkcs12",
            ExportFormat::Zip => "application/zip",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = IssuerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pem" => Ok(ExportFormat::Pem),
            "fullchain" => Ok(ExportFormat::Fullchain),
            "pfx" | "p12" | "pkcs12" => Ok(ExportFormat::Pfx),
            "zip" => Ok(ExportFormat::Zip),
            other => Err(IssuerError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Exported bytes with a suggested file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub data: Vec<u8>,
    pub filename: &'static str,
    pub content_type: &'static str,
}

impl Bundle {
    fn new(format: ExportFormat, data: Vec<u8>) -> Self {
        Self {
            data,
            filename: format.filename(),
            content_type: format.content_type(),
        }
    }
}

/// Renders ready orders into downloadable bundles.
#[derive(Debug, Clone)]
pub struct BundleExporter {
    encryptor: Arc<Encryptor>,
}

impl BundleExporter {
    pub fn new(encryptor: Arc<Encryptor>) -> Self {
        Self { encryptor }
    }

    /// Export `order` in `format`.
    ///
    /// `password` only applies to PKCS#12; an empty or missing password
    /// falls back to [`DEFAULT_PFX_PASSWORD`].
    pub fn export(
        &self,
        order: &CertificateOrder,
        format: ExportFormat,
        password: Option<&str>,
    ) -> Result<Bundle> {
        if !order.is_ready() {
            return Err(IssuerError::InvalidState(format!(
                "order {} is {}, only ready certificates can be exported",
                order.id, order.status
            )));
        }

        let cert_pem = required(&order.cert_pem, "certificate", order)?;

        let data = match format {
            ExportFormat::Pem => cert_pem.as_bytes().to_vec(),
            ExportFormat::Fullchain => self.fullchain(order)?.into_bytes(),
            ExportFormat::Pfx => self.pfx(order, cert_pem, password)?,
            ExportFormat::Zip => self.zip(order)?,
        };

        tracing::debug!(order_id = %order.id, format = %format, bytes = data.len(), "Exported certificate");
        Ok(Bundle::new(format, data))
    }

    fn fullchain(&self, order: &CertificateOrder) -> Result<String> {
        match &order.chain_pem {
            Some(chain) => Ok(chain.clone()),
            None => Ok(required(&order.cert_pem, "certificate", order)?.to_string()),
        }
    }

    fn private_key(&self, order: &CertificateOrder) -> Result<PrivateKey> {
        let encrypted = required(&order.encrypted_private_key, "private key", order)?;
        let pem = self.encryptor.decrypt_string(encrypted)?;
        Ok(PrivateKey::from_pem(&pem)?)
    }

    fn pfx(&self, order: &CertificateOrder, cert_pem: &str, password: Option<&str>) -> Result<Vec<u8>> {
        let password = password
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_PFX_PASSWORD);

        let cert_der = certificates_der(cert_pem)?
            .into_iter()
            .next()
            .ok_or_else(|| IssuerError::Certificate("no certificate in PEM".to_string()))?;
        let key_der = self.private_key(order)?.to_pkcs8_der()?;
        let name = order.domains.first().map(String::as_str).unwrap_or_default();

        let pfx = p12::PFX::new(&cert_der, &key_der, None, password, name)
            .ok_or_else(|| IssuerError::Bundle("failed to build PKCS#12 bundle".to_string()))?;
        Ok(pfx.to_der())
    }

    fn zip(&self, order: &CertificateOrder) -> Result<Vec<u8>> {
        let cert_pem = required(&order.cert_pem, "certificate", order)?;
        let fullchain = self.fullchain(order)?;
        let key_pem = self.private_key(order)?.to_pem()?;
        let readme = readme(order);

        let entries: [(&str, &[u8]); 4] = [
            ("certificate.pem", cert_pem.as_bytes()),
            ("fullchain.pem", fullchain.as_bytes()),
            ("private.key", key_pem.as_bytes()),
            ("README.txt", readme.as_bytes()),
        ];

        let mut buffer = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(&mut buffer);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, data) in entries {
            let options = if name == "private.key" {
                options.unix_permissions(0o600)
            } else {
                options
            };
            zip.start_file(name, options)?;
            zip.write_all(data)
                .map_err(|e| IssuerError::Bundle(format!("failed to write {}: {}", name, e)))?;
        }

        zip.finish()?;
        Ok(buffer.into_inner())
    }
}

fn required<'a>(field: &'a Option<String>, what: &str, order: &CertificateOrder) -> Result<&'a str> {
    field.as_deref().ok_or_else(|| {
        IssuerError::InvalidState(format!("order {} has no {}", order.id, what))
    })
}

fn readme(order: &CertificateOrder) -> String {
    let format_date = |date: Option<chrono::DateTime<chrono::Utc>>| {
        date.map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    };

    format!(
        "SSL Certificate Bundle
======================

Files included:
- certificate.pem: Your SSL certificate
- fullchain.pem: Certificate + intermediate CA certificates
- private.key: Your private key (keep this secure!)

Domains: {}
Issued: {}
Expires: {}

For Nginx:
  ssl_certificate /path/to/fullchain.pem;
  ssl_certificate_key /path/to/private.key;

For Apache:
  SSLCertificateFile /path/to/certificate.pem
  SSLCertificateKeyFile /path/to/private.key
  SSLCertificateChainFile /path/to/fullchain.pem
",
        order.domains.join(", "),
        format_date(order.issued_at),
        format_date(order.expires_at),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("pem".parse::<ExportFormat>().unwrap(), ExportFormat::Pem);
        assert_eq!("FullChain".parse::<ExportFormat>().unwrap(), ExportFormat::Fullchain);
        assert_eq!("p12".parse::<ExportFormat>().unwrap(), ExportFormat::Pfx);
        assert_eq!(" zip ".parse::<ExportFormat>().unwrap(), ExportFormat::Zip);
        assert!(matches!(
            "der".parse::<ExportFormat>(),
            Err(IssuerError::UnsupportedFormat(ref f)) if f == "der"
        ));
    }

    #[test]
    fn test_format_metadata() {
        assert_eq!(ExportFormat::Pem.filename(), "certificate.pem");
        assert_eq!(ExportFormat::Fullchain.filename(), "fullchain.pem");
        assert_eq!(ExportFormat::Pfx.filename(), "certificate.pfx");
        assert_eq!(ExportFormat::Zip.filename(), "certificate.zip");
        assert_eq!(ExportFormat::Zip.content_type(), "application/zip");
        assert_eq!(ExportFormat::Pfx.to_string(), "pfx");
    }

    #[test]
    fn test_readme_lists_domains() {
        let mut order = CertificateOrder::new(
            uuid::Uuid::new_v4(),
            "admin@example.com",
            vec!["example.com".to_string(), "*.example.com".to_string()],
            certdesk_crypto::KeyType::Ecc,
            256,
        );
        order.expires_at = chrono::DateTime::from_timestamp(1_900_000_000, 0);

        let text = readme(&order);
        assert!(text.contains("Domains: example.com, *.example.com"));
        assert!(text.contains("Issued: unknown"));
        assert!(text.contains("Expires: 2030-03-17"));
        assert!(text.contains("ssl_certificate_key /path/to/private.key;"));
    }
}
