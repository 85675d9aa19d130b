/// RFC 7807 problem documents returned by ACME servers
use serde::{Deserialize, Serialize};
use std::fmt;

const ACME_ERROR_PREFIX: &str = "urn:ietf:params:acme:error:";

/// ACME problem document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    /// Problem type URN
    #[serde(rename = "type", default)]
    pub problem_type: String,

    /// Human readable explanation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// HTTP status code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Per-identifier failures
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subproblems: Vec<Problem>,
}

impl Problem {
    /// Short ACME error code, e.g. `badNonce`.
    pub fn code(&self) -> &str {
        self.problem_type
            .strip_prefix(ACME_ERROR_PREFIX)
            .unwrap_or(&self.problem_type)
    }

    pub fn is_bad_nonce(&self) -> bool {
        self.code() == "badNonce"
    }

    pub fn is_rate_limited(&self) -> bool {
        self.code() == "rateLimited"
    }

    pub fn is_account_does_not_exist(&self) -> bool {
        self.code() == "accountDoesNotExist"
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.code(), detail),
            None => f.write_str(self.code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_code() {
        let json = r#"{
            "type": "urn:ietf:params:acme:error:badNonce",
            "detail": "JWS has an invalid anti-replay nonce",
            "status": 400
        }"#;

        let problem: Problem = serde_json::from_str(json).unwrap();
        assert!(problem.is_bad_nonce());
        assert_eq!(problem.status, Some(400));
        assert_eq!(
            problem.to_string(),
            "badNonce: JWS has an invalid anti-replay nonce"
        );
    }

    #[test]
    fn test_problem_with_subproblems() {
        let json = r#"{
            "type": "urn:ietf:params:acme:error:rejectedIdentifier",
            "subproblems": [
                {"type": "urn:ietf:params:acme:error:caa", "detail": "CAA forbids issuance"}
            ]
        }"#;

        let problem: Problem = serde_json::from_str(json).unwrap();
        assert_eq!(problem.code(), "rejectedIdentifier");
        assert_eq!(problem.subproblems.len(), 1);
        assert_eq!(problem.subproblems[0].code(), "caa");
    }
}
