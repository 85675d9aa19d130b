//! # certdesk ACME
//!
//! ACME v2 (RFC 8555) client pieces used by certdesk to obtain certificates
//! through manually published DNS-01 records.
//!
//! ## Features
//!
//! - **Wire types** for directories, accounts, orders, authorizations and
//!   problem documents
//! - **JWS signing** with ES256, ES384 and RS256 account keys
//! - **[`AcmeTransport`]**: the CA operations certificate orchestration needs,
//!   implemented over HTTPS by [`HttpAcmeClient`]
//! - **DNS-01 helpers**: key authorizations, TXT values and TXT host names,
//!   plus a [`ChallengeRecorder`] that detects challenges rotated by the CA
//!
//! ## Quick Start
//!
//! ```no_run
//! use certdesk_acme::{AccountKey, AcmeTransport, ClientConfig, Credentials, HttpAcmeClient};
//! use certdesk_acme::dns01::Dns01Record;
//! use certdesk_crypto::{KeyType, generate_key};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpAcmeClient::new(ClientConfig::lets_encrypt_staging())?;
//! let key = AccountKey::from_private_key(&generate_key(KeyType::Ecc, 256)?)?;
//!
//! let registration = client.register(&key, &["admin@example.com".to_string()]).await?;
//! let creds = Credentials::new(&key, &registration.account_url);
//!
//! let handle = client
//!     .create_order(creds, &["example.com".to_string(), "*.example.com".to_string()])
//!     .await?;
//!
//! for url in &handle.order.authorizations {
//!     let authz = client.get_authorization(creds, url).await?;
//!     if let Some(challenge) = authz.dns01() {
//!         let record = Dns01Record::new(&authz.domain(), &challenge.token, key.thumbprint());
//!         println!("{}. 300 IN TXT \"{}\"", record.txt_host, record.txt_value);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Certificate Providers
//!
//! Directory URLs for common CAs live in [`directories`]:
//!
//! ```
//! use certdesk_acme::{ClientConfig, directories};
//!
//! let config = ClientConfig::new(directories::ZEROSSL);
//! assert!(config.directory_url.contains("zerossl"));
//! ```

pub mod account;
pub mod challenge;
pub mod client;
pub mod config;
pub mod directory;
pub mod dns01;
pub mod error;
pub mod jws;
pub mod order;
pub mod problem;
pub mod transport;

pub use account::*;
pub use challenge::*;
pub use client::*;
pub use config::*;
pub use directory::*;
pub use dns01::{ChallengeRecorder, Dns01Record, PresentOutcome};
pub use error::*;
pub use jws::{AccountKey, Jwk, Jws};
pub use order::*;
pub use problem::*;
pub use transport::*;
