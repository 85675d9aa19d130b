//! Integration tests for certdesk-acme against a mocked ACME server

use certdesk_acme::*;
use certdesk_crypto::{KeyType, generate_key};
use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ACCOUNT_URL: &str = "https://ca.test/acct/1";

async fn mock_ca() -> MockServer {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/directory"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "newNonce": format!("{}/new-nonce", base),
            "newAccount": format!("{}/new-acct", base),
            "newOrder": format!("{}/new-order", base),
            "revokeCert": format!("{}/revoke-cert", base)
        })))
        .mount(&server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/new-nonce"))
        .respond_with(ResponseTemplate::new(200).insert_header("Replay-Nonce", "nonce-head"))
        .mount(&server)
        .await;

    server
}

fn client(server: &MockServer) -> HttpAcmeClient {
    let config = ClientConfig::new(format!("{}/directory", server.uri()))
        .with_poll_interval(Duration::from_millis(10))
        .with_max_poll_attempts(5);
    HttpAcmeClient::new(config).unwrap()
}

fn account_key() -> AccountKey {
    AccountKey::from_private_key(&generate_key(KeyType::Ecc, 256).unwrap()).unwrap()
}

fn order_json(base: &str, status: &str, certificate: Option<String>) -> Value {
    let mut order = json!({
        "status": status,
        "identifiers": [{"type": "dns", "value": "example.com"}],
        "authorizations": [format!("{}/authz/1", base)],
        "finalize": format!("{}/order/1/finalize", base)
    });
    if let Some(url) = certificate {
        order["certificate"] = json!(url);
    }
    order
}

fn problem(code: &str) -> Value {
    json!({
        "type": format!("urn:ietf:params:acme:error:{}", code),
        "detail": "rejected by test CA",
        "status": 400
    })
}

#[tokio::test]
async fn test_directory_is_fetched_once() {
    let server = mock_ca().await;
    let client = client(&server);

    let first = client.directory().await.unwrap().new_order.clone();
    let second = client.directory().await.unwrap().new_order.clone();
    assert_eq!(first, second);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(
        requests.iter().filter(|r| r.url.path() == "/directory").count(),
        1
    );
}

#[tokio::test]
async fn test_register_new_account() {
    let server = mock_ca().await;
    Mock::given(method("POST"))
        .and(path("/new-acct"))
        .and(header("content-type", "application/jose+json"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Location", ACCOUNT_URL)
                .insert_header("Replay-Nonce", "nonce-1")
                .set_body_json(json!({
                    "status": "valid",
                    "contact": ["mailto:admin@example.com"]
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let registration = client(&server)
        .register(&account_key(), &["admin@example.com".to_string()])
        .await
        .unwrap();

    assert_eq!(registration.account_url, ACCOUNT_URL);
    assert_eq!(registration.status, AccountStatus::Valid);
    assert_eq!(registration.contact, vec!["mailto:admin@example.com"]);
}

#[tokio::test]
async fn test_register_existing_account_reports_conflict() {
    let server = mock_ca().await;
    Mock::given(method("POST"))
        .and(path("/new-acct"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Location", ACCOUNT_URL)
                .set_body_json(json!({"status": "valid"})),
        )
        .mount(&server)
        .await;

    let client = client(&server);
    let key = account_key();
    let err = client
        .register(&key, &["admin@example.com".to_string()])
        .await
        .unwrap_err();
    assert!(
        matches!(err, AcmeError::AccountAlreadyExists { ref account_url } if account_url == ACCOUNT_URL)
    );

    let registration = client.lookup_account(&key).await.unwrap();
    assert_eq!(registration.account_url, ACCOUNT_URL);
}

#[tokio::test]
async fn test_bad_nonce_is_retried_once() {
    let server = mock_ca().await;
    Mock::given(method("POST"))
        .and(path("/new-acct"))
        .respond_with(
            ResponseTemplate::new(400)
                .insert_header("Replay-Nonce", "nonce-fresh")
                .set_body_json(problem("badNonce")),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/new-acct"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Location", ACCOUNT_URL)
                .set_body_json(json!({"status": "valid"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let registration = client(&server)
        .register(&account_key(), &[])
        .await
        .unwrap();
    assert_eq!(registration.account_url, ACCOUNT_URL);
}

#[tokio::test]
async fn test_repeated_bad_nonce_is_an_error() {
    let server = mock_ca().await;
    Mock::given(method("POST"))
        .and(path("/new-acct"))
        .respond_with(ResponseTemplate::new(400).set_body_json(problem("badNonce")))
        .expect(2)
        .mount(&server)
        .await;

    let err = client(&server)
        .register(&account_key(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, AcmeError::Server(ref p) if p.is_bad_nonce()));
}

#[tokio::test]
async fn test_rate_limit_problem() {
    let server = mock_ca().await;
    Mock::given(method("POST"))
        .and(path("/new-order"))
        .respond_with(ResponseTemplate::new(429).set_body_json(problem("rateLimited")))
        .mount(&server)
        .await;

    let key = account_key();
    let err = client(&server)
        .create_order(Credentials::new(&key, ACCOUNT_URL), &["example.com".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, AcmeError::RateLimitExceeded(_)));
}

#[tokio::test]
async fn test_create_order_and_wait_until_ready() {
    let server = mock_ca().await;
    let base = server.uri();

    Mock::given(method("POST"))
        .and(path("/new-order"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Location", format!("{}/order/1", base).as_str())
                .set_body_json(order_json(&base, "pending", None)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/order/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Retry-After", "0")
                .set_body_json(order_json(&base, "pending", None)),
        )
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/order/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(order_json(&base, "ready", None)))
        .mount(&server)
        .await;

    let client = client(&server);
    let key = account_key();
    let creds = Credentials::new(&key, ACCOUNT_URL);

    let handle = client
        .create_order(creds, &["example.com".to_string()])
        .await
        .unwrap();
    assert_eq!(handle.url, format!("{}/order/1", base));
    assert_eq!(handle.order.status, OrderStatus::Pending);

    let order = client.wait_order(creds, &handle.url).await.unwrap();
    assert_eq!(order.status, OrderStatus::Ready);
}

#[tokio::test]
async fn test_wait_order_gives_up() {
    let server = mock_ca().await;
    let base = server.uri();
    Mock::given(method("POST"))
        .and(path("/order/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(order_json(&base, "pending", None)))
        .expect(5)
        .mount(&server)
        .await;

    let key = account_key();
    let err = client(&server)
        .wait_order(Credentials::new(&key, ACCOUNT_URL), &format!("{}/order/1", base))
        .await
        .unwrap_err();
    assert!(matches!(err, AcmeError::NotReady));
}

#[tokio::test]
async fn test_authorization_and_challenge_accept() {
    let server = mock_ca().await;
    let base = server.uri();

    Mock::given(method("POST"))
        .and(path("/authz/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "identifier": {"type": "dns", "value": "example.com"},
            "status": "pending",
            "wildcard": true,
            "challenges": [{
                "type": "dns-01",
                "url": format!("{}/chall/1", base),
                "status": "pending",
                "token": "token-1"
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chall/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "dns-01",
            "url": format!("{}/chall/1", base),
            "status": "processing",
            "token": "token-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let key = account_key();
    let creds = Credentials::new(&key, ACCOUNT_URL);

    let authz = client
        .get_authorization(creds, &format!("{}/authz/1", base))
        .await
        .unwrap();
    assert_eq!(authz.domain(), "*.example.com");

    let challenge = authz.dns01().unwrap();
    let accepted = client.accept_challenge(creds, &challenge.url).await.unwrap();
    assert_eq!(accepted.status, ChallengeStatus::Processing);
}

#[tokio::test]
async fn test_finalize_and_download() {
    let server = mock_ca().await;
    let base = server.uri();
    let cert_url = format!("{}/cert/1", base);
    let chain = "-----BEGIN CERTIFICATE-----\nMAA=\n-----END CERTIFICATE-----\n";

    Mock::given(method("POST"))
        .and(path("/order/1/finalize"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(order_json(&base, "processing", None)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/order/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(order_json(&base, "valid", Some(cert_url.clone()))),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cert/1"))
        .and(header("accept", "application/pem-certificate-chain"))
        .respond_with(ResponseTemplate::new(200).set_body_string(chain))
        .mount(&server)
        .await;

    let client = client(&server);
    let key = account_key();
    let creds = Credentials::new(&key, ACCOUNT_URL);
    let handle = OrderHandle {
        url: format!("{}/order/1", base),
        order: serde_json::from_value(order_json(&base, "ready", None)).unwrap(),
    };

    let finalized = client.finalize(creds, &handle, b"csr-der").await.unwrap();
    assert_eq!(finalized.order.status, OrderStatus::Valid);
    assert_eq!(finalized.order.certificate.as_deref(), Some(cert_url.as_str()));

    let pem = client.download_certificate(creds, &cert_url).await.unwrap();
    assert_eq!(pem, chain);
}

#[tokio::test]
async fn test_external_account_binding_is_refused() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/directory"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "newNonce": format!("{}/new-nonce", base),
            "newAccount": format!("{}/new-acct", base),
            "newOrder": format!("{}/new-order", base),
            "meta": {"externalAccountRequired": true}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/new-acct"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server)
        .register(&account_key(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, AcmeError::InvalidAccount(_)));
}
