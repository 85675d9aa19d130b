//! TXT lookups against a single resolver.

use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfig, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::ProtoErrorKind;
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::xfer::Protocol;
use hickory_resolver::{ResolveError, Resolver, TokioResolver};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

/// Why a lookup produced no answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The resolver answered: there is no such record.
    #[error("no TXT records found")]
    NotFound,

    /// The resolver could not be reached or returned a server failure.
    #[error("DNS lookup failed: {0}")]
    Transport(String),
}

/// Queries TXT records for a host through one specific resolver.
#[async_trait]
pub trait TxtLookup: Send + Sync {
    /// Return every TXT record at `host`, multi-string records joined.
    async fn lookup_txt(
        &self,
        resolver: SocketAddr,
        host: &str,
    ) -> std::result::Result<Vec<String>, LookupError>;
}

/// UDP lookups through hickory-resolver with caching disabled.
#[derive(Debug)]
pub struct HickoryLookup {
    timeout: Duration,
    resolvers: Mutex<HashMap<SocketAddr, Arc<TokioResolver>>>,
}

impl HickoryLookup {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            resolvers: Mutex::new(HashMap::new()),
        }
    }

    fn resolver(&self, addr: SocketAddr) -> Arc<TokioResolver> {
        let mut resolvers = self.resolvers.lock();
        resolvers
            .entry(addr)
            .or_insert_with(|| Arc::new(build_resolver(addr, self.timeout)))
            .clone()
    }
}

fn build_resolver(addr: SocketAddr, timeout: Duration) -> TokioResolver {
    let mut config = ResolverConfig::new();
    config.add_name_server(NameServerConfig::new(addr, Protocol::Udp));

    let mut opts = ResolverOpts::default();
    opts.timeout = timeout;
    opts.attempts = 1;
    opts.cache_size = 0;

    Resolver::builder_with_config(config, TokioConnectionProvider::default())
        .with_options(opts)
        .build()
}

#[async_trait]
impl TxtLookup for HickoryLookup {
    async fn lookup_txt(
        &self,
        resolver: SocketAddr,
        host: &str,
    ) -> std::result::Result<Vec<String>, LookupError> {
        let fqdn = if host.ends_with('.') {
            host.to_string()
        } else {
            format!("{}.", host)
        };

        let lookup = tokio::time::timeout(self.timeout, self.resolver(resolver).txt_lookup(fqdn))
            .await
            .map_err(|_| LookupError::Transport(format!("timed out after {:?}", self.timeout)))?;

        match lookup {
            Ok(records) => {
                let values: Vec<String> = records
                    .iter()
                    .map(|record| {
                        record
                            .txt_data()
                            .iter()
                            .map(|data| String::from_utf8_lossy(data))
                            .collect()
                    })
                    .collect();
                trace!(host = %host, resolver = %resolver, values = ?values, "TXT lookup answered");
                Ok(values)
            }
            Err(e) => Err(classify(&e)),
        }
    }
}

/// Only NXDOMAIN and an empty NOERROR answer mean the record is absent.
/// Every other response code hickory folds into `NoRecordsFound` is a
/// resolver failure.
fn classify(error: &ResolveError) -> LookupError {
    if let Some(proto) = error.proto() {
        if let ProtoErrorKind::NoRecordsFound { response_code, .. } = proto.kind() {
            if matches!(response_code, ResponseCode::NXDomain | ResponseCode::NoError) {
                return LookupError::NotFound;
            }
            return LookupError::Transport(format!("resolver answered {}", response_code));
        }
    }
    LookupError::Transport(error.to_string())
}
