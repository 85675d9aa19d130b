/// Transport seam between certificate orchestration and the ACME wire protocol
use crate::account::Registration;
use crate::challenge::{Authorization, Challenge};
use crate::error::Result;
use crate::jws::AccountKey;
use crate::order::Order;
use async_trait::async_trait;

/// The account a request is made on behalf of.
#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    pub key: &'a AccountKey,
    /// Account URL, sent as the JWS `kid`
    pub account_url: &'a str,
}

impl<'a> Credentials<'a> {
    pub fn new(key: &'a AccountKey, account_url: &'a str) -> Self {
        Self { key, account_url }
    }
}

/// An order together with the URL it lives at.
#[derive(Debug, Clone)]
pub struct OrderHandle {
    pub url: String,
    pub order: Order,
}

/// Operations a certificate authority must support.
///
/// [`HttpAcmeClient`](crate::HttpAcmeClient) speaks ACME v2 over HTTPS; tests
/// substitute an in-process CA.
#[async_trait]
pub trait AcmeTransport: Send + Sync {
    /// Create an account for `key`.
    ///
    /// Returns [`AcmeError::AccountAlreadyExists`](crate::AcmeError::AccountAlreadyExists)
    /// when the CA already knows the key.
    async fn register(&self, key: &AccountKey, contact: &[String]) -> Result<Registration>;

    /// Fetch the existing account bound to `key`.
    async fn lookup_account(&self, key: &AccountKey) -> Result<Registration>;

    /// Submit a new order for `domains`.
    async fn create_order(&self, creds: Credentials<'_>, domains: &[String]) -> Result<OrderHandle>;

    async fn get_authorization(&self, creds: Credentials<'_>, url: &str) -> Result<Authorization>;

    /// Tell the CA the challenge response is in place.
    async fn accept_challenge(&self, creds: Credentials<'_>, url: &str) -> Result<Challenge>;

    /// Poll the order until the CA settles it as ready, valid or invalid.
    async fn wait_order(&self, creds: Credentials<'_>, url: &str) -> Result<Order>;

    /// Submit the CSR and poll until the order is valid or invalid.
    async fn finalize(
        &self,
        creds: Credentials<'_>,
        order: &OrderHandle,
        csr_der: &[u8],
    ) -> Result<OrderHandle>;

    /// Download the issued chain as PEM, leaf first.
    async fn download_certificate(&self, creds: Credentials<'_>, url: &str) -> Result<String>;
}
