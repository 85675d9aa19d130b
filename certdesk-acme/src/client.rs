/// ACME v2 client over HTTPS
use crate::account::{Account, AccountCreate, Registration};
use crate::challenge::{Authorization, Challenge};
use crate::config::ClientConfig;
use crate::directory::Directory;
use crate::error::{AcmeError, Result};
use crate::jws::{AccountKey, b64};
use crate::order::{Finalize, Order, OrderCreate, OrderStatus};
use crate::problem::Problem;
use crate::transport::{AcmeTransport, Credentials, OrderHandle};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{ACCEPT, CONTENT_TYPE, LOCATION, RETRY_AFTER};
use reqwest::{Response, StatusCode};
use std::time::Duration;
use tokio::sync::OnceCell;

const REPLAY_NONCE: &str = "Replay-Nonce";
const JOSE_JSON: &str = "application/jose+json";
const PEM_CHAIN: &str = "application/pem-certificate-chain";

/// ACME client speaking RFC 8555 over HTTPS.
///
/// The directory is fetched lazily on first use. Nonces returned in
/// `Replay-Nonce` headers are reused for the next request; a `badNonce`
/// rejection is re-signed with a fresh nonce once.
///
/// # Example
///
/// ```no_run
/// use certdesk_acme::{ClientConfig, HttpAcmeClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpAcmeClient::new(ClientConfig::lets_encrypt_staging())?;
/// let directory = client.directory().await?;
/// println!("newOrder at {}", directory.new_order);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HttpAcmeClient {
    config: ClientConfig,
    http: reqwest::Client,
    directory: OnceCell<Directory>,
    nonce: Mutex<Option<String>>,
}

impl HttpAcmeClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AcmeError::Internal(e.to_string()))?;

        Ok(Self {
            config,
            http,
            directory: OnceCell::new(),
            nonce: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The CA directory, fetched on first call.
    pub async fn directory(&self) -> Result<&Directory> {
        self.directory
            .get_or_try_init(|| Self::fetch_directory(&self.http, &self.config.directory_url))
            .await
    }

    async fn fetch_directory(client: &reqwest::Client, url: &str) -> Result<Directory> {
        tracing::debug!(url = %url, "Fetching ACME directory");
        let response = client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(AcmeError::InvalidDirectory(format!(
                "Failed to fetch directory: {}",
                response.status()
            )));
        }

        let directory = response.json().await?;
        Ok(directory)
    }

    async fn next_nonce(&self) -> Result<String> {
        let cached = self.nonce.lock().take();
        if let Some(nonce) = cached {
            return Ok(nonce);
        }

        let new_nonce = self.directory().await?.new_nonce.clone();
        let response = self.http.head(&new_nonce).send().await?;
        replay_nonce(&response).ok_or(AcmeError::MissingHeader(REPLAY_NONCE))
    }

    fn remember_nonce(&self, response: &Response) {
        if let Some(nonce) = replay_nonce(response) {
            *self.nonce.lock() = Some(nonce);
        }
    }

    /// Sign and POST. `payload: None` is a POST-as-GET.
    async fn post(
        &self,
        key: &AccountKey,
        kid: Option<&str>,
        url: &str,
        payload: Option<&[u8]>,
        accept: Option<&str>,
    ) -> Result<Response> {
        let mut nonce_refreshed = false;

        loop {
            let nonce = self.next_nonce().await?;
            let body = serde_json::to_vec(&key.sign(url, &nonce, kid, payload)?)?;

            let mut request = self
                .http
                .post(url)
                .header(CONTENT_TYPE, JOSE_JSON)
                .body(body);
            if let Some(accept) = accept {
                request = request.header(ACCEPT, accept);
            }

            let response = request.send().await?;
            self.remember_nonce(&response);

            if response.status().is_success() {
                return Ok(response);
            }

            let problem = read_problem(response).await;
            if problem.is_bad_nonce() && !nonce_refreshed {
                tracing::debug!(url = %url, "Nonce rejected, re-signing with a fresh one");
                nonce_refreshed = true;
                continue;
            }

            tracing::warn!(url = %url, problem = %problem, "ACME request rejected");
            return Err(AcmeError::from_problem(problem));
        }
    }

    async fn post_as_get(&self, creds: Credentials<'_>, url: &str) -> Result<Response> {
        self.post(creds.key, Some(creds.account_url), url, None, None)
            .await
    }

    async fn poll_order(
        &self,
        creds: Credentials<'_>,
        url: &str,
        done: fn(OrderStatus) -> bool,
    ) -> Result<Order> {
        for attempt in 1..=self.config.max_poll_attempts {
            let response = self.post_as_get(creds, url).await?;
            let delay = retry_after(&response).unwrap_or(self.config.poll_interval);
            let order: Order = response.json().await?;

            if done(order.status) {
                return Ok(order);
            }

            tracing::debug!(
                url = %url,
                status = ?order.status,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Order not settled yet"
            );
            tokio::time::sleep(delay).await;
        }

        Err(AcmeError::NotReady)
    }
}

#[async_trait]
impl AcmeTransport for HttpAcmeClient {
    async fn register(&self, key: &AccountKey, contact: &[String]) -> Result<Registration> {
        let directory = self.directory().await?;
        if directory.requires_external_account() {
            return Err(AcmeError::InvalidAccount(
                "CA requires external account binding, which is not supported".to_string(),
            ));
        }
        if let Some(tos) = directory.terms_of_service() {
            tracing::debug!(terms_of_service = %tos, "Agreeing to CA terms of service");
        }
        let new_account = directory.new_account.clone();
        let payload = serde_json::to_vec(&AccountCreate::new(contact))?;

        let response = self
            .post(key, None, &new_account, Some(&payload), None)
            .await?;
        let status = response.status();
        let account_url = location(&response)?;

        if status == StatusCode::OK {
            return Err(AcmeError::AccountAlreadyExists { account_url });
        }

        let account: Account = response.json().await?;
        tracing::info!(account_url = %account_url, "Registered ACME account");
        Ok(Registration::from_account(account_url, account))
    }

    async fn lookup_account(&self, key: &AccountKey) -> Result<Registration> {
        let new_account = self.directory().await?.new_account.clone();
        let payload = serde_json::to_vec(&AccountCreate::lookup())?;

        let response = self
            .post(key, None, &new_account, Some(&payload), None)
            .await?;
        let account_url = location(&response)?;
        let account: Account = response.json().await?;

        tracing::info!(account_url = %account_url, "Found existing ACME account");
        Ok(Registration::from_account(account_url, account))
    }

    async fn create_order(&self, creds: Credentials<'_>, domains: &[String]) -> Result<OrderHandle> {
        let new_order = self.directory().await?.new_order.clone();
        let payload = serde_json::to_vec(&OrderCreate::new(domains))?;

        let response = self
            .post(
                creds.key,
                Some(creds.account_url),
                &new_order,
                Some(&payload),
                None,
            )
            .await?;
        let url = location(&response)?;
        let order: Order = response.json().await?;

        tracing::info!(order_url = %url, domains = ?domains, "Created ACME order");
        Ok(OrderHandle { url, order })
    }

    async fn get_authorization(&self, creds: Credentials<'_>, url: &str) -> Result<Authorization> {
        let response = self.post_as_get(creds, url).await?;
        Ok(response.json().await?)
    }

    async fn accept_challenge(&self, creds: Credentials<'_>, url: &str) -> Result<Challenge> {
        let response = self
            .post(creds.key, Some(creds.account_url), url, Some(b"{}"), None)
            .await?;
        tracing::info!(challenge_url = %url, "Challenge accepted for validation");
        Ok(response.json().await?)
    }

    async fn wait_order(&self, creds: Credentials<'_>, url: &str) -> Result<Order> {
        self.poll_order(creds, url, |status| status.is_settled())
            .await
    }

    async fn finalize(
        &self,
        creds: Credentials<'_>,
        handle: &OrderHandle,
        csr_der: &[u8],
    ) -> Result<OrderHandle> {
        let payload = serde_json::to_vec(&Finalize { csr: b64(csr_der) })?;
        let response = self
            .post(
                creds.key,
                Some(creds.account_url),
                &handle.order.finalize,
                Some(&payload),
                None,
            )
            .await?;
        let order: Order = response.json().await?;

        let order = if is_final(order.status) {
            order
        } else {
            self.poll_order(creds, &handle.url, is_final).await?
        };

        tracing::info!(order_url = %handle.url, status = ?order.status, "Order finalized");
        Ok(OrderHandle {
            url: handle.url.clone(),
            order,
        })
    }

    async fn download_certificate(&self, creds: Credentials<'_>, url: &str) -> Result<String> {
        let response = self
            .post(creds.key, Some(creds.account_url), url, None, Some(PEM_CHAIN))
            .await?;
        Ok(response.text().await?)
    }
}

fn is_final(status: OrderStatus) -> bool {
    matches!(status, OrderStatus::Valid | OrderStatus::Invalid)
}

fn replay_nonce(response: &Response) -> Option<String> {
    response
        .headers()
        .get(REPLAY_NONCE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn location(response: &Response) -> Result<String> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or(AcmeError::MissingHeader("Location"))
}

// Only the delay-seconds form is honoured.
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

async fn read_problem(response: Response) -> Problem {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();

    let mut problem = serde_json::from_str::<Problem>(&text).unwrap_or_else(|_| Problem {
        problem_type: String::new(),
        detail: Some(format!("HTTP {}: {}", status, text.trim())),
        status: None,
        subproblems: Vec::new(),
    });
    problem.status.get_or_insert(status);
    problem
}
