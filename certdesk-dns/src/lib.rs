//! DNS TXT verification for manually published DNS-01 challenges.
//!
//! ```no_run
//! use certdesk_dns::{DnsConfig, DnsVerifier, TxtCheck, all_matched};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), certdesk_dns::DnsError> {
//! let verifier = DnsVerifier::new(DnsConfig::from_list("8.8.8.8,1.1.1.1", Duration::from_secs(5))?);
//! let results = verifier
//!     .check_all(&[TxtCheck {
//!         domain: "example.com".to_string(),
//!         txt_host: "_acme-challenge.example.com".to_string(),
//!         expected_value: "ZTRx1Ckl1-tM05o5zaizTTA0yUy5AGereMgSNWC6Ll8".to_string(),
//!     }])
//!     .await;
//! println!("ready: {}", all_matched(&results));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod lookup;
pub mod verifier;

pub use config::{DnsConfig, default_resolvers, parse_resolvers};
pub use error::{DnsError, Result};
pub use lookup::{HickoryLookup, LookupError, TxtLookup};
pub use verifier::{DnsCheckResult, DnsVerifier, TxtCheck, all_matched};
