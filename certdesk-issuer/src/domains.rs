//! Domain list normalization and validation.

use crate::error::{IssuerError, Result};
use std::collections::HashSet;

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Normalize a requested domain list.
///
/// Entries are trimmed, lowercased and deduplicated in order. A wildcard
/// `*.d` pulls in `d` immediately before it unless `d` was already listed.
///
/// ```
/// use certdesk_issuer::normalize_domains;
///
/// assert_eq!(
///     normalize_domains(["*.example.com", "example.com", "www.example.com"]),
///     vec!["example.com", "*.example.com", "www.example.com"],
/// );
/// ```
pub fn normalize_domains<I, S>(domains: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut normalized = Vec::new();

    for raw in domains {
        let domain = raw.as_ref().trim().trim_end_matches('.').to_ascii_lowercase();
        if domain.is_empty() || seen.contains(&domain) {
            continue;
        }

        if let Some(base) = domain.strip_prefix("*.") {
            if !base.is_empty() && seen.insert(base.to_string()) {
                normalized.push(base.to_string());
            }
        }

        seen.insert(domain.clone());
        normalized.push(domain);
    }

    normalized
}

/// Reject names a CA would refuse.
///
/// A single leading `*` label is allowed; every other label must be 1-63
/// characters of ASCII letters, digits or inner hyphens.
pub fn validate_domain(domain: &str) -> Result<()> {
    let invalid = |reason: &str| IssuerError::Validation(format!("invalid domain {:?}: {}", domain, reason));

    if domain.is_empty() {
        return Err(invalid("empty"));
    }
    if domain.len() > MAX_DOMAIN_LEN {
        return Err(invalid("too long"));
    }

    let base = domain.strip_prefix("*.").unwrap_or(domain);
    if !base.contains('.') {
        return Err(invalid("not a fully qualified name"));
    }

    for label in base.split('.') {
        if label.is_empty() || label.len() > MAX_LABEL_LEN {
            return Err(invalid("bad label length"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(invalid("label starts or ends with a hyphen"));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(invalid("unexpected character"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_inserts_base_first() {
        assert_eq!(
            normalize_domains(["*.example.com"]),
            vec!["example.com", "*.example.com"]
        );
    }

    #[test]
    fn test_existing_base_not_duplicated() {
        assert_eq!(
            normalize_domains(["example.com", "*.example.com"]),
            vec!["example.com", "*.example.com"]
        );
        assert_eq!(
            normalize_domains(["*.example.com", "example.com"]),
            vec!["example.com", "*.example.com"]
        );
    }

    #[test]
    fn test_duplicates_and_case() {
        assert_eq!(
            normalize_domains([" Example.COM ", "example.com.", "", "www.example.com"]),
            vec!["example.com", "www.example.com"]
        );
    }

    #[test]
    fn test_base_present_exactly_once_before_wildcard() {
        let cases: Vec<Vec<&str>> = vec![
            vec!["*.a.test"],
            vec!["a.test", "*.a.test"],
            vec!["*.a.test", "a.test"],
            vec!["b.test", "*.a.test", "*.b.test", "a.test", "*.a.test"],
            vec!["*.b.test", "*.a.test", "b.test"],
        ];

        for input in cases {
            let normalized = normalize_domains(&input);
            for wildcard in normalized.iter().filter(|d| d.starts_with("*.")) {
                let base = &wildcard[2..];
                let positions: Vec<_> = normalized
                    .iter()
                    .enumerate()
                    .filter(|(_, d)| d.as_str() == base)
                    .map(|(i, _)| i)
                    .collect();
                let wildcard_pos = normalized.iter().position(|d| d == wildcard).unwrap();

                assert_eq!(positions.len(), 1, "{:?} -> {:?}", input, normalized);
                assert!(positions[0] < wildcard_pos, "{:?} -> {:?}", input, normalized);
            }
        }
    }

    #[test]
    fn test_validate_domain() {
        assert!(validate_domain("example.com").is_ok());
        assert!(validate_domain("*.example.com").is_ok());
        assert!(validate_domain("xn--bcher-kva.example").is_ok());

        assert!(validate_domain("").is_err());
        assert!(validate_domain("localhost").is_err());
        assert!(validate_domain("*.").is_err());
        assert!(validate_domain("a.*.example.com").is_err());
        assert!(validate_domain("-bad.example.com").is_err());
        assert!(validate_domain("bad_label.example.com").is_err());
        assert!(validate_domain(&format!("{}.com", "a".repeat(64))).is_err());
    }
}
