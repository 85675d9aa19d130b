//! Persisted records: accounts, certificate orders and their DNS challenges.

use certdesk_acme::{Dns01Record, Registration};
use certdesk_crypto::KeyType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A CA account, one per (email, directory URL) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub directory_url: String,
    /// Account key PEM, encrypted with the master key
    pub encrypted_private_key: String,
    /// Set once the CA has accepted the account
    #[serde(default)]
    pub registration: Option<Registration>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        email: impl Into<String>,
        directory_url: impl Into<String>,
        encrypted_private_key: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            directory_url: directory_url.into(),
            encrypted_private_key,
            registration: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.registration.is_some()
    }
}

/// Lifecycle of a certificate order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    #[default]
    Pending,
    Ready,
    Failed,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateStatus::Pending => "pending",
            CertificateStatus::Ready => "ready",
            CertificateStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A certificate requested for a set of domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateOrder {
    pub id: Uuid,
    pub account_id: Uuid,
    pub email: String,
    /// Normalized domain set; the first entry becomes the subject CN
    pub domains: Vec<String>,
    pub key_type: KeyType,
    pub key_size: u32,
    pub status: CertificateStatus,
    #[serde(default)]
    pub order_url: Option<String>,
    /// Certificate key PEM, encrypted with the master key
    #[serde(default)]
    pub encrypted_private_key: Option<String>,
    #[serde(default)]
    pub cert_pem: Option<String>,
    #[serde(default)]
    pub chain_pem: Option<String>,
    #[serde(default)]
    pub issuer_pem: Option<String>,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CertificateOrder {
    pub fn new(
        account_id: Uuid,
        email: impl Into<String>,
        domains: Vec<String>,
        key_type: KeyType,
        key_size: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            account_id,
            email: email.into(),
            domains,
            key_type,
            key_size,
            status: CertificateStatus::Pending,
            order_url: None,
            encrypted_private_key: None,
            cert_pem: None,
            chain_pem: None,
            issuer_pem: None,
            serial: None,
            fingerprint: None,
            issued_at: None,
            expires_at: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == CertificateStatus::Ready
    }

    /// Record a failure. A ready order keeps its status.
    pub fn mark_failed(&mut self, message: impl Into<String>) {
        if self.is_ready() {
            return;
        }
        self.status = CertificateStatus::Failed;
        self.error_message = Some(message.into());
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Progress of a single DNS-01 challenge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeState {
    #[default]
    Pending,
    Verified,
    Failed,
}

impl fmt::Display for ChallengeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChallengeState::Pending => "pending",
            ChallengeState::Verified => "verified",
            ChallengeState::Failed => "failed",
        })
    }
}

/// The TXT record one domain of an order needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsChallenge {
    pub id: Uuid,
    pub order_id: Uuid,
    pub domain: String,
    pub txt_host: String,
    pub txt_value: String,
    pub token: String,
    pub key_authorization: String,
    pub authorization_url: String,
    #[serde(default)]
    pub challenge_url: Option<String>,
    pub status: ChallengeState,
    #[serde(default)]
    pub validated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub dns_checked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub dns_check_ok: bool,
}

impl DnsChallenge {
    pub fn from_record(
        order_id: Uuid,
        record: Dns01Record,
        authorization_url: impl Into<String>,
        challenge_url: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            domain: record.domain,
            txt_host: record.txt_host,
            txt_value: record.txt_value,
            token: record.token,
            key_authorization: record.key_authorization,
            authorization_url: authorization_url.into(),
            challenge_url,
            status: ChallengeState::Pending,
            validated_at: None,
            dns_checked_at: None,
            dns_check_ok: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> CertificateOrder {
        CertificateOrder::new(
            Uuid::new_v4(),
            "admin@example.com",
            vec!["example.com".to_string()],
            KeyType::Rsa,
            2048,
        )
    }

    #[test]
    fn test_new_order_is_pending() {
        let order = order();
        assert_eq!(order.status, CertificateStatus::Pending);
        assert!(order.order_url.is_none());
        assert!(order.cert_pem.is_none());
    }

    #[test]
    fn test_mark_failed() {
        let mut order = order();
        order.mark_failed("CA rejected the order");

        assert_eq!(order.status, CertificateStatus::Failed);
        assert_eq!(order.error_message.as_deref(), Some("CA rejected the order"));
    }

    #[test]
    fn test_ready_never_regresses() {
        let mut order = order();
        order.status = CertificateStatus::Ready;
        order.mark_failed("late failure");

        assert!(order.is_ready());
        assert!(order.error_message.is_none());
    }

    #[test]
    fn test_challenge_from_record() {
        let order_id = Uuid::new_v4();
        let record = Dns01Record::new("*.example.com", "tok", "thumb");
        let challenge = DnsChallenge::from_record(
            order_id,
            record,
            "https://ca.test/authz/1",
            Some("https://ca.test/chall/1".to_string()),
        );

        assert_eq!(challenge.order_id, order_id);
        assert_eq!(challenge.domain, "*.example.com");
        assert_eq!(challenge.txt_host, "_acme-challenge.example.com");
        assert_eq!(challenge.key_authorization, "tok.thumb");
        assert_eq!(challenge.status, ChallengeState::Pending);
        assert!(!challenge.dns_check_ok);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&CertificateStatus::Ready).unwrap(),
            "\"ready\""
        );
        assert_eq!(
            serde_json::to_string(&ChallengeState::Verified).unwrap(),
            "\"verified\""
        );
    }
}
