/// Error types for ACME operations
use crate::problem::Problem;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AcmeError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("ACME server error: {0}")]
    Server(Problem),

    #[error("Account already exists at {account_url}")]
    AccountAlreadyExists { account_url: String },

    #[error("Invalid account: {0}")]
    InvalidAccount(String),

    #[error("Order failed: {0}")]
    OrderFailed(String),

    #[error("Challenge failed: {0}")]
    ChallengeFailed(String),

    #[error("Challenge for {domain} changed: expected {expected}, CA presented {found}")]
    ChallengeMismatch {
        domain: String,
        expected: String,
        found: String,
    },

    #[error("Invalid directory URL: {0}")]
    InvalidDirectory(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Missing {0} header in ACME response")]
    MissingHeader(&'static str),

    #[error("Certificate not ready yet")]
    NotReady,

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Key error: {0}")]
    Crypto(#[from] certdesk_crypto::CryptoError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AcmeError {
    /// Map a problem document to the most specific error variant.
    pub fn from_problem(problem: Problem) -> Self {
        if problem.is_rate_limited() {
            AcmeError::RateLimitExceeded(problem.detail.clone().unwrap_or_default())
        } else {
            AcmeError::Server(problem)
        }
    }
}

pub type Result<T> = std::result::Result<T, AcmeError>;
