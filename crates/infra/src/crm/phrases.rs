//! Response body classification
//!
//! The provider signals "this token is invalid" and "this token is fine
//! but lacks scope" through free-text bodies, not machine-readable
//! codes. Matching is case-insensitive substring search over a phrase
//! set. The sets are data, not control flow: they track one provider's
//! current wording and will need updating when that wording drifts, so
//! they are swappable (and injectable from tests).

use reqwest::StatusCode;

/// Phrase sets used to classify provider error bodies.
#[derive(Debug, Clone)]
pub struct ResponseClassifier {
    invalid_token: Vec<String>,
    insufficient_scope: Vec<String>,
}

impl Default for ResponseClassifier {
    /// The provider's wording as currently observed in the wild.
    fn default() -> Self {
        Self {
            invalid_token: vec![
                "invalid api key".to_string(),
                "invalid token".to_string(),
                "invalid jwt".to_string(),
                "jwt malformed".to_string(),
                "token expired".to_string(),
                "authentication invalid".to_string(),
            ],
            insufficient_scope: vec![
                "does not have access".to_string(),
                "insufficient scope".to_string(),
                "missing scope".to_string(),
                "not authorized for this".to_string(),
            ],
        }
    }
}

impl ResponseClassifier {
    /// Build a classifier from explicit phrase sets (test fixtures,
    /// configuration overrides).
    pub fn new(invalid_token: Vec<String>, insufficient_scope: Vec<String>) -> Self {
        Self { invalid_token, insufficient_scope }
    }

    /// A 401 whose body names the token itself as the problem. This is
    /// the only signal that triggers auth rotation.
    #[must_use]
    pub fn is_invalid_token(&self, status: StatusCode, body: &str) -> bool {
        status == StatusCode::UNAUTHORIZED && matches_any(&self.invalid_token, body)
    }

    /// A 401/403 whose body says the token works but lacks scope for
    /// the endpoint. During probing this marks a usable partial context.
    #[must_use]
    pub fn is_scope_limited(&self, status: StatusCode, body: &str) -> bool {
        (status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN)
            && matches_any(&self.insufficient_scope, body)
    }
}

fn matches_any(phrases: &[String], body: &str) -> bool {
    let lowered = body.to_lowercase();
    phrases.iter().any(|phrase| lowered.contains(phrase.as_str()))
}
