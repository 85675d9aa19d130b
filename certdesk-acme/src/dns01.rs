//! DNS-01 key authorization and TXT record computation.
//!
//! The [`ChallengeRecorder`] is handed each challenge the CA presents. In
//! issue mode it records the TXT record the operator must publish and tells
//! the caller to stop and wait for DNS. In verify mode it checks that the CA
//! still presents the record that was issued earlier.

use crate::error::{AcmeError, Result};
use crate::jws::b64;
use ring::digest::{SHA256, digest};
use std::collections::HashMap;

/// Label prepended to the domain to form the TXT host.
pub const CHALLENGE_LABEL: &str = "_acme-challenge";

/// `token.thumbprint`
pub fn key_authorization(token: &str, thumbprint: &str) -> String {
    format!("{}.{}", token, thumbprint)
}

/// base64url SHA-256 of the key authorization.
pub fn dns01_txt_value(key_authorization: &str) -> String {
    b64(digest(&SHA256, key_authorization.as_bytes()).as_ref())
}

/// TXT host for a domain. Wildcards share the record of their base domain.
pub fn txt_record_name(domain: &str) -> String {
    let base = domain.strip_prefix("*.").unwrap_or(domain);
    format!("{}.{}", CHALLENGE_LABEL, base.trim_end_matches('.'))
}

/// A DNS-01 record derived from a CA challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dns01Record {
    pub domain: String,
    pub txt_host: String,
    pub txt_value: String,
    pub token: String,
    pub key_authorization: String,
}

impl Dns01Record {
    pub fn new(domain: &str, token: &str, thumbprint: &str) -> Self {
        let key_authorization = key_authorization(token, thumbprint);
        Self {
            domain: domain.to_string(),
            txt_host: txt_record_name(domain),
            txt_value: dns01_txt_value(&key_authorization),
            token: token.to_string(),
            key_authorization,
        }
    }
}

/// What the caller should do after presenting a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// The record was issued; wait for the operator to publish it.
    AwaitingDns,
    /// The CA still presents the previously issued record.
    Verified,
}

#[derive(Debug, Clone)]
enum Mode {
    Issue,
    Verify(HashMap<String, String>),
}

/// Records presented challenges in issue mode, checks them in verify mode.
#[derive(Debug, Clone)]
pub struct ChallengeRecorder {
    mode: Mode,
    records: Vec<Dns01Record>,
}

impl ChallengeRecorder {
    pub fn issue() -> Self {
        Self {
            mode: Mode::Issue,
            records: Vec::new(),
        }
    }

    /// Verify against previously issued `(domain, txt_value)` pairs.
    pub fn verify<I>(expected: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            mode: Mode::Verify(expected.into_iter().collect()),
            records: Vec::new(),
        }
    }

    pub fn is_verifying(&self) -> bool {
        matches!(self.mode, Mode::Verify(_))
    }

    /// Present a challenge for `domain`.
    pub fn present(
        &mut self,
        domain: &str,
        token: &str,
        thumbprint: &str,
    ) -> Result<PresentOutcome> {
        let record = Dns01Record::new(domain, token, thumbprint);

        let outcome = match &self.mode {
            Mode::Issue => PresentOutcome::AwaitingDns,
            Mode::Verify(expected) => match expected.get(domain) {
                Some(value) if *value == record.txt_value => PresentOutcome::Verified,
                Some(value) => {
                    return Err(AcmeError::ChallengeMismatch {
                        domain: domain.to_string(),
                        expected: value.clone(),
                        found: record.txt_value,
                    });
                }
                None => {
                    return Err(AcmeError::ChallengeMismatch {
                        domain: domain.to_string(),
                        expected: "<no issued record>".to_string(),
                        found: record.txt_value,
                    });
                }
            },
        };

        tracing::debug!(
            domain = %record.domain,
            txt_host = %record.txt_host,
            outcome = ?outcome,
            "Presented DNS-01 challenge"
        );
        self.records.retain(|r| r.domain != record.domain);
        self.records.push(record);
        Ok(outcome)
    }

    /// Forget the record for `domain`. Nothing is removed from DNS.
    pub fn cleanup(&mut self, domain: &str) {
        self.records.retain(|r| r.domain != domain);
    }

    pub fn records(&self) -> &[Dns01Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Dns01Record> {
        self.records
    }
}
