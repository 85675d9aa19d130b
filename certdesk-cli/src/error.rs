//! Error types for the certdesk CLI.

use certdesk_acme::AcmeError;
use certdesk_config::ConfigError;
use certdesk_crypto::CryptoError;
use certdesk_dns::DnsError;
use certdesk_issuer::{IssuerError, StoreError};
use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Issuer(#[from] IssuerError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Acme(#[from] AcmeError),

    #[error("DNS configuration error: {0}")]
    Dns(#[from] DnsError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    /// DNS records are not visible yet.
    #[error("{0}")]
    NotReady(String),

    #[error("Aborted")]
    Aborted,
}

impl CliError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Issuer(IssuerError::Validation(_)) => 2,
            CliError::Issuer(IssuerError::NotFound(_)) => 3,
            CliError::NotReady(_) => 4,
            CliError::Aborted => 130,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            CliError::from(ConfigError::KeyNotFound("encryption.master_key".into())).exit_code(),
            2
        );
        assert_eq!(
            CliError::from(IssuerError::NotFound("order".into())).exit_code(),
            3
        );
        assert_eq!(CliError::NotReady("pending".into()).exit_code(), 4);
        assert_eq!(
            CliError::from(IssuerError::InvalidState("failed".into())).exit_code(),
            1
        );
    }
}
