/// Error types for DNS verification
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    #[error("Invalid resolver address: {0}")]
    InvalidResolver(String),
}

pub type Result<T> = std::result::Result<T, DnsError>;
