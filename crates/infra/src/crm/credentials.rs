//! Credential classification
//!
//! The configured credential is an opaque secret in one of two known
//! shapes: a newer private integration token (`pit-` prefixed) or a
//! legacy JWT. Classification is purely syntactic; tokens are never
//! validated here, and a JWT's payload is decoded only as a best-effort
//! source for the tenant id claim.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

pub use leadbridge_domain::config::mask_secret;

/// Prefix carried by private integration tokens.
const PIT_PREFIX: &str = "pit-";

/// Claim keys that may carry the tenant id inside a JWT payload.
const TENANT_CLAIM_KEYS: &[&str] = &["location_id", "locationId", "location"];

/// Shape of a configured credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TokenKind {
    /// Private integration token; auth scheme and tenant must be
    /// discovered by probing.
    Pit,
    /// Legacy bearer token; a tenant claim can sometimes be decoded
    /// without any network call.
    Jwt,
}

/// Classification outcome: the token kind plus a best-effort tenant
/// hint (only ever present for JWTs) and a loggable preview.
#[derive(Debug, Clone)]
pub struct CredentialProfile {
    pub kind: TokenKind,
    pub tenant_hint: Option<String>,
    pub preview: String,
}

/// Classify a raw credential string.
///
/// Pure and infallible: malformed JWT payloads (wrong segment count,
/// invalid base64, non-JSON) simply yield no tenant hint.
#[must_use]
pub fn classify(credential: &str) -> CredentialProfile {
    let preview = mask_secret(credential);

    if credential.starts_with(PIT_PREFIX) {
        return CredentialProfile { kind: TokenKind::Pit, tenant_hint: None, preview };
    }

    CredentialProfile {
        kind: TokenKind::Jwt,
        tenant_hint: decode_tenant_claim(credential),
        preview,
    }
}

/// Decode the middle JWT segment and pull out a tenant-id-shaped claim.
fn decode_tenant_claim(credential: &str) -> Option<String> {
    let segments: Vec<&str> = credential.split('.').collect();
    if segments.len() != 3 {
        return None;
    }

    // Tolerate both padded and unpadded base64url payloads.
    let payload = segments[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;

    TENANT_CLAIM_KEYS
        .iter()
        .filter_map(|key| claims.get(key))
        .find_map(|value| value.as_str())
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
}
