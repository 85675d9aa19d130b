//! Typed certdesk settings.

use crate::validation::{ConfigValidator, Validate};
use crate::{ConfigError, ConfigManager, EnvLoader, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "CERTDESK";

const DEFAULT_DIRECTORY_URL: &str = "https://acme-v02.api.letsencrypt.org/directory";
const DEFAULT_RESOLVERS: &str = "8.8.8.8:53,1.1.1.1:53";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcmeSettings {
    pub directory_url: String,
}

impl Default for AcmeSettings {
    fn default() -> Self {
        Self {
            directory_url: DEFAULT_DIRECTORY_URL.to_string(),
        }
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionSettings {
    /// 32-byte AES key, hex encoded.
    pub master_key: Option<String>,
}

impl fmt::Debug for EncryptionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionSettings")
            .field("master_key", &self.master_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsSettings {
    /// Comma separated `ip[:port]` list, tried in order.
    pub resolvers: String,
    /// Per-query timeout.
    pub timeout_secs: u64,
}

impl Default for DnsSettings {
    fn default() -> Self {
        Self {
            resolvers: DEFAULT_RESOLVERS.to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutSettings {
    pub order_secs: u64,
    pub finalize_secs: u64,
    pub dns_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            order_secs: 180,
            finalize_secs: 120,
            dns_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

/// Everything certdesk reads from its environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub acme: AcmeSettings,
    pub encryption: EncryptionSettings,
    pub dns: DnsSettings,
    pub timeouts: TimeoutSettings,
    pub storage: StorageSettings,
}

impl Settings {
    /// Every recognised key.
    pub const KEYS: &'static [&'static str] = &[
        "acme.directory_url",
        "encryption.master_key",
        "dns.resolvers",
        "dns.timeout_secs",
        "timeouts.order_secs",
        "timeouts.finalize_secs",
        "timeouts.dns_secs",
        "storage.data_dir",
    ];

    /// Load from defaults, an optional file, `.env` and the process
    /// environment, then validate.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut manager = ConfigManager::with_prefix(ENV_PREFIX);
        if let Some(path) = config_file {
            manager.load_file(path)?;
        }
        manager.load_dotenv(None, Self::KEYS)?;
        Self::from_manager(&manager)
    }

    /// Like [`Settings::load`] with an explicit variable source instead of
    /// the process environment.
    pub fn from_sources(config_file: Option<&Path>, env: &EnvLoader) -> Result<Self> {
        let mut manager = ConfigManager::with_prefix(ENV_PREFIX);
        if let Some(path) = config_file {
            manager.load_file(path)?;
        }
        manager.apply_env(env, Self::KEYS);
        Self::from_manager(&manager)
    }

    /// Build from whatever `manager` holds, falling back to defaults.
    pub fn from_manager(manager: &ConfigManager) -> Result<Self> {
        let defaults = Settings::default();

        let settings = Settings {
            acme: AcmeSettings {
                directory_url: manager.get_or_else("acme.directory_url", defaults.acme.directory_url)?,
            },
            encryption: EncryptionSettings {
                master_key: if manager.has("encryption.master_key") {
                    Some(manager.get::<String>("encryption.master_key")?)
                } else {
                    None
                },
            },
            dns: DnsSettings {
                resolvers: manager.get_or_else("dns.resolvers", defaults.dns.resolvers)?,
                timeout_secs: manager.get_or_else("dns.timeout_secs", defaults.dns.timeout_secs)?,
            },
            timeouts: TimeoutSettings {
                order_secs: manager.get_or_else("timeouts.order_secs", defaults.timeouts.order_secs)?,
                finalize_secs: manager
                    .get_or_else("timeouts.finalize_secs", defaults.timeouts.finalize_secs)?,
                dns_secs: manager.get_or_else("timeouts.dns_secs", defaults.timeouts.dns_secs)?,
            },
            storage: StorageSettings {
                data_dir: manager.get_or_else("storage.data_dir", defaults.storage.data_dir)?,
            },
        };

        settings.validate()?;
        Ok(settings)
    }

    /// The master key, required by anything that touches private keys.
    pub fn master_key(&self) -> Result<&str> {
        self.encryption.master_key.as_deref().ok_or_else(|| {
            ConfigError::KeyNotFound(format!(
                "encryption.master_key (set {}_ENCRYPTION_MASTER_KEY; `certdesk keygen` prints one)",
                ENV_PREFIX
            ))
        })
    }

    pub fn dns_query_timeout(&self) -> Duration {
        Duration::from_secs(self.dns.timeout_secs)
    }

    pub fn order_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.order_secs)
    }

    pub fn finalize_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.finalize_secs)
    }

    pub fn dns_check_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.dns_secs)
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::is_url(&self.acme.directory_url, "acme.directory_url")?;
        if let Some(key) = &self.encryption.master_key {
            ConfigValidator::is_hex_key(key, 32, "encryption.master_key")?;
        }
        ConfigValidator::not_empty(&self.dns.resolvers, "dns.resolvers")?;
        ConfigValidator::in_range(self.dns.timeout_secs, 1, 300, "dns.timeout_secs")?;
        ConfigValidator::in_range(self.timeouts.order_secs, 1, 3600, "timeouts.order_secs")?;
        ConfigValidator::in_range(self.timeouts.finalize_secs, 1, 3600, "timeouts.finalize_secs")?;
        ConfigValidator::in_range(self.timeouts.dns_secs, 1, 3600, "timeouts.dns_secs")?;
        ConfigValidator::not_empty(&self.storage.data_dir.to_string_lossy(), "storage.data_dir")?;
        Ok(())
    }
}

impl ConfigManager {
    fn get_or_else<T: serde::de::DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        if self.has(key) { self.get(key) } else { Ok(default) }
    }
}
