//! Wiring from [`Settings`] to a ready orchestrator.

use crate::error::CliResult;
use certdesk_acme::{ClientConfig, HttpAcmeClient};
use certdesk_config::Settings;
use certdesk_crypto::Encryptor;
use certdesk_dns::{DnsConfig, DnsVerifier};
use certdesk_issuer::{BundleExporter, FileStore, IssuerConfig, OrderOrchestrator};
use std::sync::Arc;

pub struct AppContext {
    pub orchestrator: OrderOrchestrator,
    pub exporter: BundleExporter,
}

impl AppContext {
    pub async fn open(settings: &Settings) -> CliResult<Self> {
        let encryptor = Arc::new(Encryptor::from_hex(settings.master_key()?)?);

        let store = FileStore::open_dir(&settings.storage.data_dir).await?;
        tracing::debug!(path = %store.path().display(), "Opened certificate store");

        let transport = HttpAcmeClient::new(ClientConfig::new(&settings.acme.directory_url))?;
        let verifier = DnsVerifier::new(DnsConfig::from_list(
            &settings.dns.resolvers,
            settings.dns_query_timeout(),
        )?);

        let config = IssuerConfig::new(&settings.acme.directory_url)
            .with_order_timeout(settings.order_timeout())
            .with_finalize_timeout(settings.finalize_timeout())
            .with_dns_timeout(settings.dns_check_timeout());

        let orchestrator = OrderOrchestrator::new(
            config,
            Arc::new(store),
            Arc::new(transport),
            verifier,
            encryptor.clone(),
        );

        Ok(Self {
            orchestrator,
            exporter: BundleExporter::new(encryptor),
        })
    }
}
