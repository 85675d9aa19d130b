/// ACME account resources
use serde::{Deserialize, Serialize};

/// ACME account object as returned by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Account status
    pub status: AccountStatus,

    /// Contact URIs
    #[serde(default)]
    pub contact: Vec<String>,

    /// URL of the account's order list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orders: Option<String>,

    #[serde(rename = "termsOfServiceAgreed", skip_serializing_if = "Option::is_none")]
    pub terms_of_service_agreed: Option<bool>,
}

/// Account status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AccountStatus {
    Valid,
    Deactivated,
    Revoked,
}

/// newAccount request payload
#[derive(Debug, Clone, Serialize)]
pub struct AccountCreate {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contact: Vec<String>,

    #[serde(rename = "termsOfServiceAgreed")]
    pub terms_of_service_agreed: bool,

    /// Ask the server to return an existing account instead of creating one
    #[serde(rename = "onlyReturnExisting", skip_serializing_if = "std::ops::Not::not")]
    pub only_return_existing: bool,
}

impl AccountCreate {
    /// Create a registration request for the given email addresses.
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            contact: emails
                .into_iter()
                .map(|email| contact_uri(email.as_ref()))
                .collect(),
            terms_of_service_agreed: true,
            only_return_existing: false,
        }
    }

    /// Create a lookup request for the account bound to the signing key.
    pub fn lookup() -> Self {
        Self {
            contact: Vec::new(),
            terms_of_service_agreed: true,
            only_return_existing: true,
        }
    }
}

/// The CA-assigned identity of a registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Account URL, used as the JWS `kid`
    pub account_url: String,
    pub status: AccountStatus,
    #[serde(default)]
    pub contact: Vec<String>,
}

impl Registration {
    pub fn from_account(account_url: impl Into<String>, account: Account) -> Self {
        Self {
            account_url: account_url.into(),
            status: account.status,
            contact: account.contact,
        }
    }
}

fn contact_uri(email: &str) -> String {
    if email.starts_with("mailto:") {
        email.to_string()
    } else {
        format!("mailto:{}", email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_create() {
        let request = AccountCreate::new(["admin@example.com"]);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["contact"][0], "mailto:admin@example.com");
        assert_eq!(json["termsOfServiceAgreed"], true);
        assert!(json.get("onlyReturnExisting").is_none());
    }

    #[test]
    fn test_account_lookup() {
        let json = serde_json::to_value(AccountCreate::lookup()).unwrap();
        assert_eq!(json["onlyReturnExisting"], true);
        assert!(json.get("contact").is_none());
    }

    #[test]
    fn test_contact_not_double_prefixed() {
        let request = AccountCreate::new(["mailto:ops@example.com"]);
        assert_eq!(request.contact, vec!["mailto:ops@example.com"]);
    }

    #[test]
    fn test_account_status_serialization() {
        let json = serde_json::to_string(&AccountStatus::Valid).unwrap();
        assert_eq!(json, "\"valid\"");
    }
}
