//! Configuration management for certdesk
//!
//! Values are layered: built-in defaults, then an optional JSON, TOML or
//! `.env` file, then `CERTDESK_*` environment variables. [`Settings`] is the
//! typed result.
//!
//! ```
//! use certdesk_config::{ConfigManager, EnvLoader, Settings};
//!
//! let env = EnvLoader::from_vars(
//!     Some("CERTDESK".to_string()),
//!     [("CERTDESK_DNS_TIMEOUT_SECS", "5")],
//! );
//! let mut manager = ConfigManager::with_prefix("CERTDESK");
//! manager.apply_env(&env, Settings::KEYS);
//!
//! let settings = Settings::from_manager(&manager).unwrap();
//! assert_eq!(settings.dns.timeout_secs, 5);
//! ```

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat, flatten};
pub use settings::{
    AcmeSettings, DnsSettings, ENV_PREFIX, EncryptionSettings, Settings, StorageSettings,
    TimeoutSettings,
};
pub use validation::{ConfigValidator, Validate};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Layered key/value store behind [`Settings`]
///
/// Keys are dotted (`dns.resolvers`). Later loads override earlier ones.
#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    values: HashMap<String, Value>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with environment variable prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            values: HashMap::new(),
            env_prefix: Some(prefix.into()),
        }
    }

    /// Load a configuration file, detecting its format from the name
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let loader = ConfigLoader::auto(path)?;
        let data = loader.load_file(path)?;

        match (loader.format(), data) {
            (FileFormat::Env, Value::Object(map)) => {
                for (name, value) in map {
                    if let Some(key) = self.dotted_env_key(&name) {
                        self.values.insert(key, value);
                    }
                }
            }
            (_, data @ Value::Object(_)) => self.values.extend(flatten(&data)),
            _ => {
                return Err(ConfigError::ParseError(format!(
                    "{} must contain a table at the top level",
                    path.display()
                )));
            }
        }

        Ok(())
    }

    /// Load `.env` into the process environment, then read `keys` from it.
    /// A missing default `.env` is ignored; an explicit path must exist.
    pub fn load_dotenv(&mut self, path: Option<&Path>, keys: &[&str]) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        self.load_env(keys);
        Ok(())
    }

    /// Read `keys` from the process environment
    pub fn load_env(&mut self, keys: &[&str]) {
        let loader = EnvLoader::new(self.env_prefix.clone());
        self.apply_env(&loader, keys);
    }

    /// Read `keys` through an explicit loader
    pub fn apply_env(&mut self, loader: &EnvLoader, keys: &[&str]) {
        for (key, value) in loader.overrides(keys.iter().copied()) {
            self.values.insert(key, Value::String(value));
        }
    }

    /// Set a configuration value
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    /// Get a configuration value.
    ///
    /// Strings coming from the environment are also tried as JSON literals,
    /// so `"30"` reads as a number and `"true"` as a boolean.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        match serde_json::from_value(value.clone()) {
            Ok(v) => Ok(v),
            Err(err) => match value {
                Value::String(s) => serde_json::from_str(s.trim()).map_err(|_| {
                    ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: err.to_string(),
                    }
                }),
                _ => Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: err.to_string(),
                }),
            },
        }
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Check if a key exists
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Get all configuration keys
    pub fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    // CERTDESK_DNS_TIMEOUT_SECS -> dns.timeout_secs; section names are single words.
    fn dotted_env_key(&self, name: &str) -> Option<String> {
        let rest = match &self.env_prefix {
            Some(prefix) => name.strip_prefix(prefix.as_str())?.strip_prefix('_')?,
            None => name,
        };
        let (section, field) = rest.split_once('_')?;
        Some(format!("{}.{}", section.to_lowercase(), field.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut manager = ConfigManager::new();
        manager.set("acme.directory_url", "https://ca.test/dir").unwrap();

        let value: String = manager.get("acme.directory_url").unwrap();
        assert_eq!(value, "https://ca.test/dir");
    }

    #[test]
    fn test_get_or_default() {
        let manager = ConfigManager::new();

        let value: u64 = manager.get_or("dns.timeout_secs", 10);
        assert_eq!(value, 10);
    }

    #[test]
    fn test_string_values_are_coerced() {
        let mut manager = ConfigManager::new();
        manager.set("timeouts.order_secs", "45").unwrap();
        manager.set("flag", "true").unwrap();
        manager.set("bad", "soon").unwrap();

        assert_eq!(manager.get::<u64>("timeouts.order_secs").unwrap(), 45);
        assert!(manager.get::<bool>("flag").unwrap());
        assert!(matches!(
            manager.get::<u64>("bad"),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "bad"
        ));
        assert!(matches!(
            manager.get::<u64>("missing"),
            Err(ConfigError::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_has_and_keys() {
        let mut manager = ConfigManager::new();
        manager.set("storage.data_dir", "/tmp").unwrap();

        assert!(manager.has("storage.data_dir"));
        assert!(!manager.has("missing_key"));
        assert_eq!(manager.keys(), vec!["storage.data_dir".to_string()]);
    }

    #[test]
    fn test_dotted_env_key() {
        let manager = ConfigManager::with_prefix("CERTDESK");
        assert_eq!(
            manager.dotted_env_key("CERTDESK_DNS_TIMEOUT_SECS").as_deref(),
            Some("dns.timeout_secs")
        );
        assert_eq!(manager.dotted_env_key("OTHER_DNS_TIMEOUT"), None);
        assert_eq!(manager.dotted_env_key("CERTDESK_DEBUG"), None);
    }
}
