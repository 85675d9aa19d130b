//! TXT record verification across an ordered list of resolvers.
//!
//! Resolvers are tried in order and the first one that answers decides the
//! outcome, even when its answer does not contain the expected value. A
//! resolver that cannot be reached is skipped and its error is kept; the
//! error is only reported when no resolver answered at all.

use crate::config::DnsConfig;
use crate::lookup::{HickoryLookup, LookupError, TxtLookup};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// One record to check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxtCheck {
    /// Label carried through to the result, usually the order domain
    pub domain: String,
    pub txt_host: String,
    pub expected_value: String,
}

/// Outcome of checking one TXT record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsCheckResult {
    pub domain: String,
    pub txt_host: String,
    pub expected_value: String,
    pub found_values: Vec<String>,
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// True when there is at least one result and every result matched.
pub fn all_matched(results: &[DnsCheckResult]) -> bool {
    !results.is_empty() && results.iter().all(|r| r.matched)
}

/// Checks published TXT records against expected challenge values.
#[derive(Clone)]
pub struct DnsVerifier {
    config: DnsConfig,
    lookup: Arc<dyn TxtLookup>,
}

impl std::fmt::Debug for DnsVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsVerifier")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DnsVerifier {
    /// Verifier using hickory-resolver over UDP.
    pub fn new(config: DnsConfig) -> Self {
        let lookup = Arc::new(HickoryLookup::new(config.timeout));
        Self { config, lookup }
    }

    pub fn with_lookup(config: DnsConfig, lookup: Arc<dyn TxtLookup>) -> Self {
        Self { config, lookup }
    }

    pub fn config(&self) -> &DnsConfig {
        &self.config
    }

    /// Check a single host. The returned result has an empty domain label.
    pub async fn check_txt(&self, txt_host: &str, expected_value: &str) -> DnsCheckResult {
        let mut result = DnsCheckResult {
            domain: String::new(),
            txt_host: txt_host.to_string(),
            expected_value: expected_value.to_string(),
            found_values: Vec::new(),
            matched: false,
            error: None,
        };
        let mut last_error = None;

        for resolver in &self.config.resolvers {
            match self.lookup.lookup_txt(*resolver, txt_host).await {
                Ok(values) => {
                    result.matched = values.iter().any(|v| v == expected_value);
                    result.found_values = values;
                    debug!(
                        txt_host = %txt_host,
                        resolver = %resolver,
                        matched = result.matched,
                        "TXT record answered"
                    );
                    return result;
                }
                Err(LookupError::NotFound) => {
                    debug!(txt_host = %txt_host, resolver = %resolver, "TXT record not found");
                    return result;
                }
                Err(LookupError::Transport(e)) => {
                    warn!(txt_host = %txt_host, resolver = %resolver, error = %e, "DNS resolver failed");
                    last_error = Some(e);
                }
            }
        }

        result.error = last_error;
        result
    }

    /// Check several records concurrently, keeping input order and labels.
    pub async fn check_all(&self, checks: &[TxtCheck]) -> Vec<DnsCheckResult> {
        join_all(checks.iter().map(|check| async move {
            let mut result = self.check_txt(&check.txt_host, &check.expected_value).await;
            result.domain = check.domain.clone();
            result
        }))
        .await
    }
}
