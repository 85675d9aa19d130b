/// ACME client configuration
use std::time::Duration;

/// ACME directory URLs for common providers
pub mod directories {
    /// Let's Encrypt production directory
    pub const LETS_ENCRYPT_PRODUCTION: &str = "https://acme-v02.api.letsencrypt.org/directory";

    /// Let's Encrypt staging directory (for testing)
    pub const LETS_ENCRYPT_STAGING: &str = "https://acme-staging-v02.api.letsencrypt.org/directory";

    /// ZeroSSL production directory
    pub const ZEROSSL: &str = "https://acme.zerossl.com/v2/DV90";

    /// BuyPass production directory
    pub const BUYPASS: &str = "https://api.buypass.com/acme/directory";

    /// Google Trust Services
    pub const GOOGLE: &str = "https://dv.acme-v02.api.pki.goog/directory";
}

/// HTTP ACME client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// ACME directory URL
    pub directory_url: String,

    /// Delay between order polls when the CA sends no Retry-After
    pub poll_interval: Duration,

    /// Polls before giving up on an order that never settles
    pub max_poll_attempts: u32,

    /// Per-request HTTP timeout
    pub request_timeout: Duration,

    pub user_agent: String,
}

impl ClientConfig {
    /// Create a configuration for an arbitrary directory
    pub fn new(directory_url: impl Into<String>) -> Self {
        Self {
            directory_url: directory_url.into(),
            poll_interval: Duration::from_secs(2),
            max_poll_attempts: 30,
            request_timeout: Duration::from_secs(30),
            user_agent: format!("certdesk/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn lets_encrypt_production() -> Self {
        Self::new(directories::LETS_ENCRYPT_PRODUCTION)
    }

    pub fn lets_encrypt_staging() -> Self {
        Self::new(directories::LETS_ENCRYPT_STAGING)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = attempts;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::lets_encrypt_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lets_encrypt_staging() {
        let config = ClientConfig::lets_encrypt_staging();
        assert!(config.directory_url.contains("acme-staging-v02"));
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::new("https://ca.test/directory")
            .with_poll_interval(Duration::from_millis(10))
            .with_max_poll_attempts(3)
            .with_user_agent("test-agent");

        assert_eq!(config.poll_interval, Duration::from_millis(10));
        assert_eq!(config.max_poll_attempts, 3);
        assert_eq!(config.user_agent, "test-agent");
    }

    #[test]
    fn test_default_is_production() {
        assert_eq!(
            ClientConfig::default().directory_url,
            directories::LETS_ENCRYPT_PRODUCTION
        );
    }
}
