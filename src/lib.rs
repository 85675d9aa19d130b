// certdesk - manual DNS-01 certificate issuance
//
// The operator publishes the TXT records; certdesk handles the CA account,
// the order, validation, finalization and export.

// Re-export the issuance pipeline
pub use certdesk_issuer::*;

pub use certdesk_acme as acme;
pub use certdesk_crypto as crypto;
pub use certdesk_dns as dns;

// Re-export optional crates
#[cfg(feature = "config")]
pub use certdesk_config as config_loader;

#[cfg(feature = "log")]
pub use certdesk_log as log;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Bundle,
        BundleExporter,
        CertificateOrder,
        CertificateStatus,
        CertificateStore,
        CreateOrderRequest,
        CreatedOrder,
        DnsChallenge,
        DnsReadiness,
        ExportFormat,
        FileStore,
        IssuerConfig,
        IssuerError,
        MemoryStore,
        OrderOrchestrator,
    };
    pub use certdesk_acme::{AcmeTransport, ClientConfig, HttpAcmeClient, directories};
    pub use certdesk_crypto::{Encryptor, KeyType, generate_master_key};
    pub use certdesk_dns::{DnsConfig, DnsVerifier};
}
