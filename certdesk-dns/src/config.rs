/// Resolver configuration for TXT checks
use crate::error::{DnsError, Result};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 53;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Google and Cloudflare public resolvers
pub fn default_resolvers() -> Vec<SocketAddr> {
    vec![
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), DEFAULT_PORT),
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)), DEFAULT_PORT),
    ]
}

/// Resolvers to query, in order, and the per-query timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsConfig {
    pub resolvers: Vec<SocketAddr>,
    pub timeout: Duration,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            resolvers: default_resolvers(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl DnsConfig {
    /// An empty resolver list or zero timeout falls back to the defaults.
    pub fn new(resolvers: Vec<SocketAddr>, timeout: Duration) -> Self {
        Self {
            resolvers: if resolvers.is_empty() {
                default_resolvers()
            } else {
                resolvers
            },
            timeout: if timeout.is_zero() {
                DEFAULT_TIMEOUT
            } else {
                timeout
            },
        }
    }

    /// Build from a comma-separated resolver list such as `"8.8.8.8, 1.1.1.1:53"`.
    pub fn from_list(resolvers: &str, timeout: Duration) -> Result<Self> {
        Ok(Self::new(parse_resolvers(resolvers)?, timeout))
    }
}

/// Parse a comma-separated resolver list.
///
/// Each entry is an IP address with an optional port; the port defaults to
/// 53. IPv6 addresses with a port use the bracketed form `[::1]:53`. Blank
/// entries are skipped.
pub fn parse_resolvers(list: &str) -> Result<Vec<SocketAddr>> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_resolver)
        .collect()
}

fn parse_resolver(entry: &str) -> Result<SocketAddr> {
    if let Ok(addr) = entry.parse::<SocketAddr>() {
        return Ok(addr);
    }
    entry
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, DEFAULT_PORT))
        .map_err(|_| DnsError::InvalidResolver(entry.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolvers_adds_default_port() {
        let resolvers = parse_resolvers("8.8.8.8, 1.1.1.1:5353").unwrap();
        assert_eq!(
            resolvers,
            vec![
                "8.8.8.8:53".parse::<SocketAddr>().unwrap(),
                "1.1.1.1:5353".parse::<SocketAddr>().unwrap(),
            ]
        );
    }

    #[test]
    fn test_parse_ipv6() {
        let resolvers = parse_resolvers("2001:4860:4860::8888,[2606:4700::1111]:53").unwrap();
        assert_eq!(resolvers.len(), 2);
        assert!(resolvers.iter().all(|r| r.port() == 53 && r.is_ipv6()));
    }

    #[test]
    fn test_parse_skips_blanks() {
        assert!(parse_resolvers("").unwrap().is_empty());
        assert_eq!(parse_resolvers(" , 9.9.9.9 ,").unwrap().len(), 1);
    }

    #[test]
    fn test_hostnames_rejected() {
        assert_eq!(
            parse_resolvers("dns.google"),
            Err(DnsError::InvalidResolver("dns.google".to_string()))
        );
    }

    #[test]
    fn test_defaults_applied() {
        let config = DnsConfig::from_list("", Duration::ZERO).unwrap();
        assert_eq!(config, DnsConfig::default());
        assert_eq!(config.resolvers.len(), 2);
        assert_eq!(config.timeout, Duration::from_secs(10));
    }
}
