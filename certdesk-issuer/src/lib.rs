//! # certdesk issuer
//!
//! Manual DNS-01 certificate issuance: the operator publishes TXT records by
//! hand and certdesk takes care of everything else.
//!
//! ## Features
//!
//! - **[`OrderOrchestrator`]**: create orders, check published records,
//!   finalize and store the issued chain
//! - **[`AccountManager`]**: one CA account per email and directory, with
//!   encrypted keys
//! - **[`CertificateStore`]**: pluggable persistence, with in-memory and JSON
//!   file implementations
//! - **[`BundleExporter`]**: PEM, full chain, PKCS#12 and ZIP exports
//!
//! ## Quick Start
//!
//! ```no_run
//! use certdesk_acme::{ClientConfig, HttpAcmeClient};
//! use certdesk_crypto::{Encryptor, KeyType, generate_master_key};
//! use certdesk_dns::{DnsConfig, DnsVerifier};
//! use certdesk_issuer::*;
//! use std::sync::Arc;
//! # use std::result::Result;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = IssuerConfig::default();
//! let transport = Arc::new(HttpAcmeClient::new(ClientConfig::new(&config.directory_url))?);
//! let encryptor = Arc::new(Encryptor::from_hex(&generate_master_key()?)?);
//!
//! let orchestrator = OrderOrchestrator::new(
//!     config,
//!     Arc::new(FileStore::open_dir("./data").await?),
//!     transport,
//!     DnsVerifier::new(DnsConfig::default()),
//!     encryptor.clone(),
//! );
//!
//! let created = orchestrator
//!     .create_order(
//!         CreateOrderRequest::new("admin@example.com", ["example.com", "*.example.com"])
//!             .with_key(KeyType::Ecc, 256),
//!     )
//!     .await?;
//! println!("{}", orchestrator.txt_template(created.order.id).await?);
//!
//! // ... publish the records, then:
//! if orchestrator.pre_verify_dns(created.order.id).await?.ready {
//!     let order = orchestrator.finalize(created.order.id).await?;
//!     let bundle = BundleExporter::new(encryptor).export(&order, ExportFormat::Zip, None)?;
//!     std::fs::write(bundle.filename, bundle.data)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod account;
pub mod bundle;
pub mod certificate;
pub mod config;
pub mod domains;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod store;

pub use account::{AccountManager, ResolvedAccount};
pub use bundle::{Bundle, BundleExporter, DEFAULT_PFX_PASSWORD, ExportFormat};
pub use certificate::{IssuedCertificate, build_csr};
pub use config::IssuerConfig;
pub use domains::{normalize_domains, validate_domain};
pub use error::{IssuerError, Result, StoreError};
pub use model::*;
pub use orchestrator::{
    CreateOrderRequest, CreatedOrder, DnsReadiness, OrderOrchestrator, render_txt_template,
};
pub use store::{CertificateStore, FileStore, MemoryStore, StoreResult};
