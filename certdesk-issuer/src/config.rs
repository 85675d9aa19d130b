/// Issuance settings
use certdesk_acme::directories;
use std::time::Duration;

/// Time budget for order creation, including account registration.
pub const DEFAULT_ORDER_TIMEOUT: Duration = Duration::from_secs(180);
/// Time budget for challenge acceptance, finalization and download.
pub const DEFAULT_FINALIZE_TIMEOUT: Duration = Duration::from_secs(120);
/// Time budget for one round of DNS checks across an order.
pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(30);

/// Issuance configuration
#[derive(Debug, Clone)]
pub struct IssuerConfig {
    /// CA directory URL; accounts are scoped to it
    pub directory_url: String,
    pub order_timeout: Duration,
    pub finalize_timeout: Duration,
    pub dns_timeout: Duration,
}

impl IssuerConfig {
    pub fn new(directory_url: impl Into<String>) -> Self {
        Self {
            directory_url: directory_url.into(),
            order_timeout: DEFAULT_ORDER_TIMEOUT,
            finalize_timeout: DEFAULT_FINALIZE_TIMEOUT,
            dns_timeout: DEFAULT_DNS_TIMEOUT,
        }
    }

    pub fn with_order_timeout(mut self, timeout: Duration) -> Self {
        self.order_timeout = timeout;
        self
    }

    pub fn with_finalize_timeout(mut self, timeout: Duration) -> Self {
        self.finalize_timeout = timeout;
        self
    }

    pub fn with_dns_timeout(mut self, timeout: Duration) -> Self {
        self.dns_timeout = timeout;
        self
    }
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self::new(directories::LETS_ENCRYPT_PRODUCTION)
    }
}
