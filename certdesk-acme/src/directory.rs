//! The CA's directory document (RFC 8555 §7.1.1).
use serde::Deserialize;

/// Endpoints certdesk uses, plus the metadata that affects registration.
///
/// Revocation and key rollover endpoints are not read.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directory {
    pub new_account: String,
    pub new_order: String,
    pub new_nonce: String,
    #[serde(default)]
    pub meta: Option<DirectoryMeta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryMeta {
    #[serde(default)]
    pub terms_of_service: Option<String>,
    #[serde(default)]
    pub external_account_required: Option<bool>,
}

impl Directory {
    /// The CA only accepts accounts bound to an external account (EAB).
    pub fn requires_external_account(&self) -> bool {
        self.meta
            .as_ref()
            .and_then(|m| m.external_account_required)
            .unwrap_or(false)
    }

    pub fn terms_of_service(&self) -> Option<&str> {
        self.meta.as_ref()?.terms_of_service.as_deref()
    }
}
