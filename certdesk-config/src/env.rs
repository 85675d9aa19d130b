// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Environment variable loader
///
/// Dotted configuration keys map onto upper-case variable names, so with the
/// prefix `CERTDESK` the key `dns.timeout_secs` is read from
/// `CERTDESK_DNS_TIMEOUT_SECS`.
#[derive(Debug, Clone, Default)]
pub struct EnvLoader {
    prefix: Option<String>,
    vars: Option<HashMap<String, String>>,
}

impl EnvLoader {
    /// Create a loader reading the process environment
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix, vars: None }
    }

    /// Create a loader over a fixed set of variables instead of the process
    /// environment
    pub fn from_vars<I, K, V>(prefix: Option<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix,
            vars: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Variable name for a dotted configuration key
    pub fn env_name(&self, key: &str) -> String {
        let name = key.replace(['.', '-'], "_").to_uppercase();
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, name),
            None => name,
        }
    }

    /// Load a specific variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        let name = self.env_name(key);
        let value = match &self.vars {
            Some(vars) => vars.get(&name).cloned(),
            None => env::var(&name).ok(),
        };
        value.ok_or(ConfigError::KeyNotFound(name))
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Collect the set variables for `keys`, keyed by their dotted name.
    /// Empty values count as unset.
    pub fn overrides<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> HashMap<String, String> {
        keys.into_iter()
            .filter_map(|key| {
                self.load_var(key)
                    .ok()
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| (key.to_string(), v))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_name() {
        let loader = EnvLoader::new(Some("CERTDESK".to_string()));
        assert_eq!(
            loader.env_name("acme.directory_url"),
            "CERTDESK_ACME_DIRECTORY_URL"
        );
        assert_eq!(EnvLoader::default().env_name("dns.resolvers"), "DNS_RESOLVERS");
    }

    #[test]
    fn test_env_loader_with_default() {
        let loader = EnvLoader::new(None);
        let value = loader.load_var_or("NONEXISTENT_VAR_12345", "default");

        assert_eq!(value, "default");
    }

    #[test]
    fn test_missing_var() {
        let loader = EnvLoader::new(Some("CERTDESK_TEST".to_string()));
        assert!(matches!(
            loader.load_var("missing.var_67890"),
            Err(ConfigError::KeyNotFound(ref name)) if name == "CERTDESK_TEST_MISSING_VAR_67890"
        ));
    }

    #[test]
    fn test_fixed_vars() {
        let loader = EnvLoader::from_vars(
            Some("CERTDESK".to_string()),
            [
                ("CERTDESK_DNS_RESOLVERS", "9.9.9.9"),
                ("CERTDESK_STORAGE_DATA_DIR", "  "),
                ("OTHER_DNS_RESOLVERS", "1.1.1.1"),
            ],
        );

        assert_eq!(loader.load_var("dns.resolvers").unwrap(), "9.9.9.9");

        let overrides = loader.overrides(["dns.resolvers", "storage.data_dir", "dns.timeout_secs"]);
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides["dns.resolvers"], "9.9.9.9");
    }

    #[test]
    fn test_process_env_path() {
        let loader = EnvLoader::new(None);
        if std::env::var("PATH").is_ok() {
            assert!(loader.load_var("path").is_ok());
        }
    }
}
