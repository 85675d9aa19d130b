//! Certificate order state machine.
//!
//! An order moves through two explicit phases driven by the operator:
//!
//! 1. [`OrderOrchestrator::create_order`] registers the account if needed,
//!    submits the order to the CA and records the TXT record each domain
//!    needs. Nothing is accepted at the CA yet.
//! 2. Once the records are published, [`OrderOrchestrator::pre_verify_dns`]
//!    checks them locally and [`OrderOrchestrator::finalize`] asks the CA to
//!    validate, submits the CSR and stores the issued chain.
//!
//! Work on a single order is serialized; separate orders never block each
//! other.

use crate::account::{AccountManager, ResolvedAccount};
use crate::certificate::{IssuedCertificate, build_csr};
use crate::config::IssuerConfig;
use crate::domains::{normalize_domains, validate_domain};
use crate::error::{IssuerError, Result};
use crate::model::{CertificateOrder, CertificateStatus, ChallengeState, DnsChallenge};
use crate::store::CertificateStore;
use certdesk_acme::{
    AcmeError, AcmeTransport, AuthorizationStatus, ChallengeRecorder, Order, OrderHandle,
    OrderStatus,
};
use certdesk_crypto::{CryptoError, Encryptor, KeyType, PrivateKey, generate_key, validate_key_size};
use certdesk_dns::{DnsCheckResult, DnsVerifier, TxtCheck, all_matched};
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::{Instant, timeout, timeout_at};
use uuid::Uuid;

/// TTL written into generated TXT record templates.
pub const TEMPLATE_TTL: u32 = 300;

/// Parameters for a new certificate order.
#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    pub email: String,
    pub domains: Vec<String>,
    pub key_type: KeyType,
    /// Key size in bits, or 0 for the key type's default
    pub key_size: u32,
}

impl CreateOrderRequest {
    pub fn new<I, S>(email: impl Into<String>, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            email: email.into(),
            domains: domains.into_iter().map(Into::into).collect(),
            key_type: KeyType::Rsa,
            key_size: 0,
        }
    }

    pub fn with_key(mut self, key_type: KeyType, key_size: u32) -> Self {
        self.key_type = key_type;
        self.key_size = key_size;
        self
    }
}

/// A freshly created order and the records the operator must publish.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedOrder {
    pub order: CertificateOrder,
    pub challenges: Vec<DnsChallenge>,
}

/// Outcome of a local DNS check for every challenge of an order.
#[derive(Debug, Clone, Serialize)]
pub struct DnsReadiness {
    pub order_id: Uuid,
    /// True only when the order has challenges and every one matched
    pub ready: bool,
    pub results: Vec<DnsCheckResult>,
}

/// Drives certificate orders from creation to issuance.
pub struct OrderOrchestrator {
    config: IssuerConfig,
    store: Arc<dyn CertificateStore>,
    transport: Arc<dyn AcmeTransport>,
    verifier: DnsVerifier,
    encryptor: Arc<Encryptor>,
    accounts: AccountManager,
    locks: LockMap,
}

impl OrderOrchestrator {
    pub fn new(
        config: IssuerConfig,
        store: Arc<dyn CertificateStore>,
        transport: Arc<dyn AcmeTransport>,
        verifier: DnsVerifier,
        encryptor: Arc<Encryptor>,
    ) -> Self {
        let accounts = AccountManager::new(
            store.clone(),
            transport.clone(),
            encryptor.clone(),
            config.directory_url.clone(),
        );

        Self {
            config,
            store,
            transport,
            verifier,
            encryptor,
            accounts,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &IssuerConfig {
        &self.config
    }

    pub fn accounts(&self) -> &AccountManager {
        &self.accounts
    }

    pub fn store(&self) -> &Arc<dyn CertificateStore> {
        &self.store
    }

    async fn lock_order(&self, order_id: Uuid) -> OrderLock<'_> {
        let mutex = self.locks.lock().entry(order_id).or_default().clone();
        OrderLock {
            locks: &self.locks,
            order_id,
            guard: Some(mutex.lock_owned().await),
        }
    }

    /// Create an order and record its DNS-01 challenges.
    ///
    /// Input is validated before any CA traffic. If the CA order was created
    /// but not every authorization could be read, the challenges obtained so
    /// far are still stored and [`IssuerError::OrderIncomplete`] carries the
    /// order id.
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<CreatedOrder> {
        let email = request.email.trim().to_string();
        if email.is_empty() {
            return Err(IssuerError::Validation("email is required".to_string()));
        }

        let domains = normalize_domains(&request.domains);
        if domains.is_empty() {
            return Err(IssuerError::Validation(
                "at least one domain is required".to_string(),
            ));
        }
        for domain in &domains {
            validate_domain(domain)?;
        }

        let key_type = request.key_type;
        let key_size = match request.key_size {
            0 => key_type.default_size(),
            size => size,
        };
        validate_key_size(key_type, key_size)?;

        tracing::info!(
            email = %email,
            domains = ?domains,
            key_type = %key_type,
            key_size,
            "Creating certificate order"
        );

        let deadline = Instant::now() + self.config.order_timeout;
        let account = timeout_at(deadline, self.accounts.resolve(&email))
            .await
            .unwrap_or_else(|_| Err(IssuerError::Timeout("account registration")))?;

        let mut order = CertificateOrder::new(account.account.id, email, domains, key_type, key_size);
        let _lock = self.lock_order(order.id).await;

        let key_pem = tokio::task::spawn_blocking(move || generate_key(key_type, key_size)?.to_pem())
            .await
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))??;
        order.encrypted_private_key = Some(self.encryptor.encrypt_string(&key_pem)?);
        self.store.save_order(&order).await?;

        let mut challenges = Vec::new();
        let outcome = timeout_at(
            deadline,
            self.issue_challenges(&account, &mut order, &mut challenges),
        )
        .await
        .unwrap_or_else(|_| Err(IssuerError::Timeout("order creation")));

        if !challenges.is_empty() {
            self.store.save_challenges(order.id, &challenges).await?;
        }

        match outcome {
            Ok(()) => {
                tracing::info!(
                    order_id = %order.id,
                    challenges = challenges.len(),
                    "Order created, waiting for DNS records"
                );
                Ok(CreatedOrder { order, challenges })
            }
            Err(err) => {
                if order.order_url.is_some() {
                    order.error_message = Some(err.to_string());
                    order.touch();
                } else {
                    order.mark_failed(err.to_string());
                }
                self.store.save_order(&order).await?;

                tracing::warn!(
                    order_id = %order.id,
                    challenges = challenges.len(),
                    error = %err,
                    "Order creation incomplete"
                );
                Err(IssuerError::OrderIncomplete {
                    order_id: order.id,
                    source: Box::new(err),
                })
            }
        }
    }

    async fn issue_challenges(
        &self,
        account: &ResolvedAccount,
        order: &mut CertificateOrder,
        challenges: &mut Vec<DnsChallenge>,
    ) -> Result<()> {
        let creds = account.credentials()?;

        let handle = self.transport.create_order(creds, &order.domains).await?;
        order.order_url = Some(handle.url.clone());
        order.touch();
        self.store.save_order(order).await?;

        let mut recorder = ChallengeRecorder::issue();
        for authorization_url in &handle.order.authorizations {
            let authz = self
                .transport
                .get_authorization(creds, authorization_url)
                .await?;
            let domain = authz.domain();
            let offered = authz.dns01().ok_or_else(|| {
                AcmeError::ChallengeFailed(format!("no dns-01 challenge offered for {}", domain))
            })?;

            recorder.present(&domain, &offered.token, account.key.thumbprint())?;
            if let Some(record) = recorder.records().last() {
                challenges.push(DnsChallenge::from_record(
                    order.id,
                    record.clone(),
                    authorization_url.clone(),
                    Some(offered.url.clone()),
                ));
            }
        }

        Ok(())
    }

    /// Check the published TXT records of an order.
    ///
    /// Every challenge's DNS check fields are updated, whatever the outcome.
    pub async fn pre_verify_dns(&self, order_id: Uuid) -> Result<DnsReadiness> {
        let _lock = self.lock_order(order_id).await;

        self.require_order(order_id).await?;
        let mut challenges = self.store.list_challenges(order_id).await?;

        if challenges.is_empty() {
            tracing::warn!(order_id = %order_id, "Order has no challenges to verify");
            return Ok(DnsReadiness {
                order_id,
                ready: false,
                results: Vec::new(),
            });
        }

        let checks: Vec<TxtCheck> = challenges
            .iter()
            .map(|c| TxtCheck {
                domain: c.domain.clone(),
                txt_host: c.txt_host.clone(),
                expected_value: c.txt_value.clone(),
            })
            .collect();

        let results = timeout(self.config.dns_timeout, self.verifier.check_all(&checks)).await;
        let checked_at = Utc::now();

        let results = match results {
            Ok(results) => results,
            Err(_) => {
                for challenge in &mut challenges {
                    challenge.dns_checked_at = Some(checked_at);
                    challenge.dns_check_ok = false;
                    self.store.save_challenge(challenge).await?;
                }
                return Err(IssuerError::Timeout("DNS verification"));
            }
        };

        for (challenge, result) in challenges.iter_mut().zip(&results) {
            challenge.dns_checked_at = Some(checked_at);
            challenge.dns_check_ok = result.matched;
            self.store.save_challenge(challenge).await?;
        }

        let ready = all_matched(&results);
        tracing::info!(
            order_id = %order_id,
            matched = results.iter().filter(|r| r.matched).count(),
            total = results.len(),
            ready,
            "DNS pre-verification finished"
        );

        Ok(DnsReadiness {
            order_id,
            ready,
            results,
        })
    }

    /// Have the CA validate the challenges and issue the certificate.
    ///
    /// A ready order is returned unchanged. Failures once challenge
    /// acceptance has begun mark the order failed. A failed order can be
    /// finalized again: the CA's view of the order decides whether it is
    /// issued, downloaded or still invalid.
    pub async fn finalize(&self, order_id: Uuid) -> Result<CertificateOrder> {
        let _lock = self.lock_order(order_id).await;

        let mut order = self.require_order(order_id).await?;
        if order.is_ready() {
            tracing::debug!(order_id = %order_id, "Order already finalized");
            return Ok(order);
        }
        let order_url = order.order_url.clone().ok_or_else(|| {
            IssuerError::InvalidState(format!("order {} was never submitted to the CA", order_id))
        })?;
        let account = match self.accounts.load(order.account_id).await {
            Ok(account) => account,
            Err(IssuerError::NotFound(_)) => {
                return Err(IssuerError::InvalidState(format!(
                    "order {} has no account",
                    order_id
                )));
            }
            Err(e) => return Err(e),
        };
        let mut challenges = self.store.list_challenges(order_id).await?;

        let deadline = Instant::now() + self.config.finalize_timeout;
        let to_accept = timeout_at(deadline, self.confirm_challenges(&account, &challenges))
            .await
            .unwrap_or_else(|_| Err(IssuerError::Timeout("challenge verification")))?;

        let issued = timeout_at(
            deadline,
            self.issue_certificate(&account, &order, &order_url, &to_accept),
        )
        .await
        .unwrap_or_else(|_| Err(IssuerError::Timeout("finalization")));

        let issued = match issued {
            Ok(issued) => issued,
            Err(err) => {
                order.mark_failed(err.to_string());
                self.store.save_order(&order).await?;
                tracing::warn!(order_id = %order_id, error = %err, "Finalization failed");
                return Err(err);
            }
        };

        let now = Utc::now();
        order.status = CertificateStatus::Ready;
        order.cert_pem = Some(issued.cert_pem);
        order.chain_pem = Some(issued.chain_pem);
        order.issuer_pem = issued.issuer_pem;
        order.serial = Some(issued.serial);
        order.fingerprint = Some(issued.fingerprint);
        order.issued_at = Some(now);
        order.expires_at = Some(issued.not_after);
        order.error_message = None;
        order.touch();
        self.store.save_order(&order).await?;

        for challenge in &mut challenges {
            challenge.status = ChallengeState::Verified;
            challenge.validated_at = Some(now);
            self.store.save_challenge(challenge).await?;
        }

        tracing::info!(
            order_id = %order_id,
            serial = order.serial.as_deref().unwrap_or_default(),
            expires_at = ?order.expires_at,
            "Certificate issued"
        );
        Ok(order)
    }

    /// Re-read each authorization and make sure the CA still presents the
    /// challenge that was issued. Returns the challenge URLs to accept;
    /// authorizations the CA has already settled are left alone.
    async fn confirm_challenges(
        &self,
        account: &ResolvedAccount,
        challenges: &[DnsChallenge],
    ) -> Result<Vec<String>> {
        let creds = account.credentials()?;
        let mut recorder = ChallengeRecorder::verify(
            challenges
                .iter()
                .map(|c| (c.domain.clone(), c.txt_value.clone())),
        );

        let mut to_accept = Vec::new();
        for challenge in challenges {
            let authz = self
                .transport
                .get_authorization(creds, &challenge.authorization_url)
                .await?;
            if authz.status != AuthorizationStatus::Pending {
                continue;
            }

            let offered = authz.dns01().ok_or_else(|| {
                AcmeError::ChallengeFailed(format!(
                    "no dns-01 challenge offered for {}",
                    challenge.domain
                ))
            })?;
            recorder.present(&authz.domain(), &offered.token, account.key.thumbprint())?;

            if let Some(url) = &challenge.challenge_url {
                to_accept.push(url.clone());
            }
        }

        Ok(to_accept)
    }

    async fn issue_certificate(
        &self,
        account: &ResolvedAccount,
        order: &CertificateOrder,
        order_url: &str,
        to_accept: &[String],
    ) -> Result<IssuedCertificate> {
        let creds = account.credentials()?;

        for url in to_accept {
            self.transport.accept_challenge(creds, url).await?;
        }

        let current = self.transport.wait_order(creds, order_url).await?;
        let handle = OrderHandle {
            url: order_url.to_string(),
            order: current,
        };

        let finalized = match handle.order.status {
            OrderStatus::Ready => {
                let key = self.order_key(order)?;
                let csr = build_csr(&key, &order.domains)?;
                self.transport.finalize(creds, &handle, &csr).await?
            }
            OrderStatus::Valid => {
                tracing::info!(order_url = %order_url, "CA already issued this order, downloading");
                handle
            }
            _ => return Err(order_failure(&handle.order).into()),
        };

        if finalized.order.status != OrderStatus::Valid {
            return Err(order_failure(&finalized.order).into());
        }
        let certificate_url = finalized.order.certificate.as_deref().ok_or_else(|| {
            AcmeError::OrderFailed("valid order has no certificate URL".to_string())
        })?;

        let pem = self
            .transport
            .download_certificate(creds, certificate_url)
            .await?;
        IssuedCertificate::from_pem_chain(&pem)
    }

    fn order_key(&self, order: &CertificateOrder) -> Result<PrivateKey> {
        let encrypted = order.encrypted_private_key.as_deref().ok_or_else(|| {
            IssuerError::InvalidState(format!("order {} has no private key", order.id))
        })?;
        Ok(PrivateKey::from_pem(&self.encryptor.decrypt_string(encrypted)?)?)
    }

    async fn require_order(&self, order_id: Uuid) -> Result<CertificateOrder> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| IssuerError::NotFound(format!("order {}", order_id)))
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<CertificateOrder> {
        self.require_order(order_id).await
    }

    /// All orders, newest first.
    pub async fn list_orders(&self) -> Result<Vec<CertificateOrder>> {
        Ok(self.store.list_orders().await?)
    }

    pub async fn challenges(&self, order_id: Uuid) -> Result<Vec<DnsChallenge>> {
        self.require_order(order_id).await?;
        Ok(self.store.list_challenges(order_id).await?)
    }

    /// Zone-file style TXT records for the operator to publish.
    pub async fn txt_template(&self, order_id: Uuid) -> Result<String> {
        let challenges = self.challenges(order_id).await?;
        Ok(render_txt_template(&challenges))
    }

    /// Delete an order together with its challenges.
    pub async fn delete_order(&self, order_id: Uuid) -> Result<()> {
        let lock = self.lock_order(order_id).await;
        let deleted = self.store.delete_order(order_id).await?;
        drop(lock);

        if !deleted {
            return Err(IssuerError::NotFound(format!("order {}", order_id)));
        }
        tracing::info!(order_id = %order_id, "Order deleted");
        Ok(())
    }
}

impl std::fmt::Debug for OrderOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderOrchestrator")
            .field("config", &self.config)
            .field("verifier", &self.verifier)
            .finish_non_exhaustive()
    }
}

type LockMap = Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>;

/// Exclusive access to one order. The map entry is dropped with the last
/// holder so the map only tracks orders in use.
struct OrderLock<'a> {
    locks: &'a LockMap,
    order_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for OrderLock<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock();
        drop(self.guard.take());
        if locks
            .get(&self.order_id)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            locks.remove(&self.order_id);
        }
    }
}

fn order_failure(order: &Order) -> AcmeError {
    let detail = match &order.error {
        Some(problem) => problem.to_string(),
        None => format!("order is {:?}", order.status).to_lowercase(),
    };
    AcmeError::OrderFailed(detail)
}

/// Render TXT records as a zone-file snippet.
pub fn render_txt_template(challenges: &[DnsChallenge]) -> String {
    let mut out = String::new();
    out.push_str("# DNS TXT Records for ACME Challenge\n");
    out.push_str("# Add these records to your DNS configuration\n");
    out.push_str("#\n");
    out.push_str("# Format: HOST TTL IN TXT \"VALUE\"\n");
    out.push_str("#\n\n");

    for challenge in challenges {
        let _ = writeln!(out, "# Domain: {}", challenge.domain);
        let _ = writeln!(
            out,
            "{}. {} IN TXT \"{}\"\n",
            challenge.txt_host, TEMPLATE_TTL, challenge.txt_value
        );
    }

    out.push_str("# After adding these records, wait for DNS propagation (usually 5-10 minutes)\n");
    out.push_str("# Then run `certdesk check` and `certdesk finalize`\n");
    out
}
