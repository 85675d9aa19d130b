//! In-process CA and DNS used by the issuer integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use certdesk_acme::{
    AccountKey, AccountStatus, AcmeError, AcmeTransport, Authorization, AuthorizationStatus,
    Challenge, ChallengeStatus, Credentials, Identifier, Order, OrderHandle, OrderStatus,
    Registration, Result,
};
use certdesk_crypto::{Encryptor, generate_master_key};
use certdesk_dns::{DnsConfig, DnsVerifier, LookupError, TxtLookup};
use certdesk_issuer::{IssuerConfig, MemoryStore, OrderOrchestrator};
use parking_lot::Mutex;
use rcgen::{BasicConstraints, CertificateParams, CertifiedIssuer, IsCa, KeyPair};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const BASE: &str = "https://ca.test";
pub const EXISTING_ACCOUNT_URL: &str = "https://ca.test/acct/existing";

struct MockOrder {
    order: Order,
    domains: Vec<String>,
}

#[derive(Default)]
struct CaState {
    accounts: HashMap<String, String>,
    orders: HashMap<String, MockOrder>,
    authorizations: HashMap<String, Authorization>,
    certificates: HashMap<String, String>,
    next_id: usize,
    failing_domains: HashSet<String>,
    wait_status: Option<OrderStatus>,
    failing_downloads: usize,
    register_calls: usize,
    lookup_calls: usize,
    finalize_calls: usize,
    accepted: Vec<String>,
    csrs: Vec<Vec<u8>>,
}

/// A CA that validates nothing and signs everything.
pub struct MockCa {
    issuer: CertifiedIssuer<'static, KeyPair>,
    account_exists: bool,
    state: Mutex<CaState>,
}

impl MockCa {
    pub fn new() -> Self {
        let mut params = CertificateParams::default();
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let issuer = CertifiedIssuer::self_signed(params, KeyPair::generate().unwrap()).unwrap();

        Self {
            issuer,
            account_exists: false,
            state: Mutex::new(CaState::default()),
        }
    }

    /// Every key is reported as already registered.
    pub fn with_existing_account() -> Self {
        Self {
            account_exists: true,
            ..Self::new()
        }
    }

    pub fn fail_authorization_for(&self, domain: &str) {
        self.state.lock().failing_domains.insert(domain.to_string());
    }

    /// Force the status reported when an order is polled.
    pub fn set_wait_status(&self, status: OrderStatus) {
        self.state.lock().wait_status = Some(status);
    }

    /// Drop the connection on the next certificate download.
    pub fn fail_next_download(&self) {
        self.state.lock().failing_downloads += 1;
    }

    /// Replace the dns-01 token the CA presents for `domain`.
    pub fn rotate_token(&self, domain: &str) {
        let mut state = self.state.lock();
        for authz in state.authorizations.values_mut() {
            if authz.domain() == domain {
                for challenge in &mut authz.challenges {
                    challenge.token = token();
                }
            }
        }
    }

    /// Validate and issue an order without the client's involvement.
    pub fn complete_out_of_band(&self, order_url: &str) {
        let mut state = self.state.lock();
        let authz_urls = state.orders[order_url].order.authorizations.clone();
        for url in authz_urls {
            if let Some(authz) = state.authorizations.get_mut(&url) {
                authz.status = AuthorizationStatus::Valid;
            }
        }
        self.issue(&mut state, order_url);
    }

    pub fn register_calls(&self) -> usize {
        self.state.lock().register_calls
    }

    pub fn lookup_calls(&self) -> usize {
        self.state.lock().lookup_calls
    }

    pub fn finalize_calls(&self) -> usize {
        self.state.lock().finalize_calls
    }

    pub fn accepted(&self) -> Vec<String> {
        self.state.lock().accepted.clone()
    }

    pub fn csrs(&self) -> Vec<Vec<u8>> {
        self.state.lock().csrs.clone()
    }

    pub fn order_count(&self) -> usize {
        self.state.lock().orders.len()
    }

    fn issue(&self, state: &mut CaState, order_url: &str) {
        let id = state.next_id;
        state.next_id += 1;

        let domains = state.orders[order_url].domains.clone();
        let params = CertificateParams::new(domains).unwrap();
        let leaf = params
            .signed_by(&KeyPair::generate().unwrap(), &self.issuer)
            .unwrap();
        let chain = format!("{}{}", leaf.pem(), self.issuer.as_ref().pem());

        let certificate_url = format!("{}/cert/{}", BASE, id);
        state.certificates.insert(certificate_url.clone(), chain);

        let order = &mut state.orders.get_mut(order_url).unwrap().order;
        order.status = OrderStatus::Valid;
        order.certificate = Some(certificate_url);
    }
}

fn token() -> String {
    Uuid::new_v4().simple().to_string()
}

fn registration(account_url: &str) -> Registration {
    Registration {
        account_url: account_url.to_string(),
        status: AccountStatus::Valid,
        contact: Vec::new(),
    }
}

#[async_trait]
impl AcmeTransport for MockCa {
    async fn register(&self, key: &AccountKey, _contact: &[String]) -> Result<Registration> {
        let mut state = self.state.lock();
        state.register_calls += 1;

        if self.account_exists {
            return Err(AcmeError::AccountAlreadyExists {
                account_url: EXISTING_ACCOUNT_URL.to_string(),
            });
        }

        let url = format!("{}/acct/{}", BASE, state.accounts.len() + 1);
        state
            .accounts
            .insert(key.thumbprint().to_string(), url.clone());
        Ok(registration(&url))
    }

    async fn lookup_account(&self, key: &AccountKey) -> Result<Registration> {
        let mut state = self.state.lock();
        state.lookup_calls += 1;

        if self.account_exists {
            return Ok(registration(EXISTING_ACCOUNT_URL));
        }
        state
            .accounts
            .get(key.thumbprint())
            .map(|url| registration(url))
            .ok_or_else(|| AcmeError::InvalidAccount("account does not exist".to_string()))
    }

    async fn create_order(&self, _creds: Credentials<'_>, domains: &[String]) -> Result<OrderHandle> {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;

        let mut authorizations = Vec::new();
        for (i, domain) in domains.iter().enumerate() {
            let url = format!("{}/authz/{}/{}", BASE, id, i);
            let wildcard = domain.starts_with("*.");
            let authz = Authorization {
                identifier: Identifier::dns(domain.trim_start_matches("*.")),
                status: AuthorizationStatus::Pending,
                expires: None,
                challenges: vec![
                    Challenge {
                        challenge_type: "http-01".to_string(),
                        url: format!("{}/chall/{}/{}/http", BASE, id, i),
                        status: ChallengeStatus::Pending,
                        token: token(),
                        validated: None,
                        error: None,
                    },
                    Challenge {
                        challenge_type: "dns-01".to_string(),
                        url: format!("{}/chall/{}/{}/dns", BASE, id, i),
                        status: ChallengeStatus::Pending,
                        token: token(),
                        validated: None,
                        error: None,
                    },
                ],
                wildcard: wildcard.then_some(true),
            };
            state.authorizations.insert(url.clone(), authz);
            authorizations.push(url);
        }

        let url = format!("{}/order/{}", BASE, id);
        let order = Order {
            status: OrderStatus::Pending,
            expires: None,
            identifiers: domains.iter().cloned().map(Identifier::dns).collect(),
            authorizations,
            finalize: format!("{}/finalize", url),
            certificate: None,
            error: None,
        };
        state.orders.insert(
            url.clone(),
            MockOrder {
                order: order.clone(),
                domains: domains.to_vec(),
            },
        );

        Ok(OrderHandle { url, order })
    }

    async fn get_authorization(&self, _creds: Credentials<'_>, url: &str) -> Result<Authorization> {
        let state = self.state.lock();
        let authz = state
            .authorizations
            .get(url)
            .cloned()
            .ok_or_else(|| AcmeError::Internal(format!("unknown authorization {}", url)))?;

        if state.failing_domains.contains(&authz.domain()) {
            return Err(AcmeError::ChallengeFailed(format!(
                "authorization for {} unavailable",
                authz.domain()
            )));
        }
        Ok(authz)
    }

    async fn accept_challenge(&self, _creds: Credentials<'_>, url: &str) -> Result<Challenge> {
        let mut state = self.state.lock();
        state.accepted.push(url.to_string());

        for authz in state.authorizations.values_mut() {
            if let Some(challenge) = authz.challenges.iter_mut().find(|c| c.url == url) {
                challenge.status = ChallengeStatus::Valid;
                let accepted = challenge.clone();
                authz.status = AuthorizationStatus::Valid;
                return Ok(accepted);
            }
        }
        Err(AcmeError::Internal(format!("unknown challenge {}", url)))
    }

    async fn wait_order(&self, _creds: Credentials<'_>, url: &str) -> Result<Order> {
        let mut state = self.state.lock();
        let wait_status = state.wait_status;

        let authorizations = state
            .orders
            .get(url)
            .map(|o| o.order.authorizations.clone())
            .ok_or_else(|| AcmeError::Internal(format!("unknown order {}", url)))?;
        let all_valid = authorizations
            .iter()
            .all(|a| state.authorizations[a].status == AuthorizationStatus::Valid);

        let order = &mut state.orders.get_mut(url).unwrap().order;
        if let Some(status) = wait_status {
            order.status = status;
        } else if order.status == OrderStatus::Pending && all_valid {
            order.status = OrderStatus::Ready;
        }

        if order.status.is_settled() {
            Ok(order.clone())
        } else {
            Err(AcmeError::NotReady)
        }
    }

    async fn finalize(
        &self,
        _creds: Credentials<'_>,
        handle: &OrderHandle,
        csr_der: &[u8],
    ) -> Result<OrderHandle> {
        let mut state = self.state.lock();
        state.finalize_calls += 1;
        state.csrs.push(csr_der.to_vec());

        if state.orders[&handle.url].order.status != OrderStatus::Ready {
            return Err(AcmeError::OrderFailed("order is not ready".to_string()));
        }
        self.issue(&mut state, &handle.url);

        Ok(OrderHandle {
            url: handle.url.clone(),
            order: state.orders[&handle.url].order.clone(),
        })
    }

    async fn download_certificate(&self, _creds: Credentials<'_>, url: &str) -> Result<String> {
        let mut state = self.state.lock();
        if state.failing_downloads > 0 {
            state.failing_downloads -= 1;
            return Err(AcmeError::Internal("connection reset".to_string()));
        }
        state
            .certificates
            .get(url)
            .cloned()
            .ok_or_else(|| AcmeError::Internal(format!("unknown certificate {}", url)))
    }
}

/// TXT records the tests have "published".
#[derive(Default)]
pub struct FakeDns {
    records: Mutex<HashMap<String, Vec<String>>>,
}

impl FakeDns {
    pub fn publish(&self, host: &str, value: &str) {
        self.records
            .lock()
            .entry(host.to_string())
            .or_default()
            .push(value.to_string());
    }
}

#[async_trait]
impl TxtLookup for FakeDns {
    async fn lookup_txt(
        &self,
        _resolver: SocketAddr,
        host: &str,
    ) -> std::result::Result<Vec<String>, LookupError> {
        self.records
            .lock()
            .get(host)
            .cloned()
            .ok_or(LookupError::NotFound)
    }
}

pub struct Harness {
    pub ca: Arc<MockCa>,
    pub dns: Arc<FakeDns>,
    pub store: Arc<MemoryStore>,
    pub encryptor: Arc<Encryptor>,
    pub orchestrator: OrderOrchestrator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_ca(MockCa::new())
    }

    pub fn with_ca(ca: MockCa) -> Self {
        let ca = Arc::new(ca);
        let dns = Arc::new(FakeDns::default());
        let store = Arc::new(MemoryStore::new());
        let encryptor = Arc::new(Encryptor::from_hex(&generate_master_key().unwrap()).unwrap());

        let orchestrator = OrderOrchestrator::new(
            config(),
            store.clone(),
            ca.clone(),
            verifier(dns.clone()),
            encryptor.clone(),
        );

        Self {
            ca,
            dns,
            store,
            encryptor,
            orchestrator,
        }
    }

    /// Publish every TXT record of an order.
    pub async fn publish_all(&self, order_id: Uuid) {
        for challenge in self.orchestrator.challenges(order_id).await.unwrap() {
            self.dns.publish(&challenge.txt_host, &challenge.txt_value);
        }
    }
}

pub fn config() -> IssuerConfig {
    IssuerConfig::new(format!("{}/directory", BASE))
        .with_order_timeout(Duration::from_secs(30))
        .with_finalize_timeout(Duration::from_secs(30))
        .with_dns_timeout(Duration::from_secs(5))
}

pub fn verifier(dns: Arc<FakeDns>) -> DnsVerifier {
    let resolver: SocketAddr = "127.0.0.1:53".parse().unwrap();
    DnsVerifier::with_lookup(DnsConfig::new(vec![resolver], Duration::from_secs(1)), dns)
}
