/// Error types for certificate issuance
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by a [`CertificateStore`](crate::CertificateStore).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    Missing(String),
}

#[derive(Error, Debug)]
pub enum IssuerError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timed out during {0}")]
    Timeout(&'static str),

    #[error("Order {order_id} incomplete: {source}")]
    OrderIncomplete {
        order_id: Uuid,
        #[source]
        source: Box<IssuerError>,
    },

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Certificate error: {0}")]
    Certificate(String),

    #[error("Bundle error: {0}")]
    Bundle(String),

    #[error(transparent)]
    Crypto(#[from] certdesk_crypto::CryptoError),

    #[error(transparent)]
    Acme(#[from] certdesk_acme::AcmeError),

    #[error(transparent)]
    Dns(#[from] certdesk_dns::DnsError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IssuerError {
    /// Order id carried by a partial failure.
    pub fn order_id(&self) -> Option<Uuid> {
        match self {
            IssuerError::OrderIncomplete { order_id, .. } => Some(*order_id),
            _ => None,
        }
    }
}

impl From<rcgen::Error> for IssuerError {
    fn from(err: rcgen::Error) -> Self {
        IssuerError::Certificate(err.to_string())
    }
}

impl From<zip::result::ZipError> for IssuerError {
    fn from(err: zip::result::ZipError) -> Self {
        IssuerError::Bundle(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IssuerError>;
