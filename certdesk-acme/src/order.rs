/// ACME order resources
use crate::problem::Problem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ACME order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Order status
    pub status: OrderStatus,

    /// Expiration timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,

    /// List of identifier objects
    pub identifiers: Vec<Identifier>,

    /// Authorization URLs
    pub authorizations: Vec<String>,

    /// Finalize URL
    pub finalize: String,

    /// Certificate URL (available when status is valid)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,

    /// Error that caused the order to become invalid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Problem>,
}

/// Order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    /// Order is pending authorization
    Pending,
    /// Order is ready for finalization
    Ready,
    /// Order is processing
    Processing,
    /// Order is valid and certificate is available
    Valid,
    /// Order is invalid
    Invalid,
}

impl OrderStatus {
    /// Whether the CA will no longer move the order on its own.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            OrderStatus::Ready | OrderStatus::Valid | OrderStatus::Invalid
        )
    }
}

/// Domain identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    /// Identifier type (usually "dns")
    #[serde(rename = "type")]
    pub id_type: String,

    /// Identifier value (domain name)
    pub value: String,
}

impl Identifier {
    /// Create a DNS identifier
    pub fn dns(domain: impl Into<String>) -> Self {
        Self {
            id_type: "dns".to_string(),
            value: domain.into(),
        }
    }
}

/// newOrder request payload
#[derive(Debug, Clone, Serialize)]
pub struct OrderCreate {
    pub identifiers: Vec<Identifier>,
}

impl OrderCreate {
    /// Create a new order for domains
    pub fn new(domains: &[String]) -> Self {
        Self {
            identifiers: domains.iter().cloned().map(Identifier::dns).collect(),
        }
    }
}

/// finalize request payload
#[derive(Debug, Clone, Serialize)]
pub struct Finalize {
    /// base64url-encoded DER CSR
    pub csr: String,
}
