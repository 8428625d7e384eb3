//! Authorization header candidates
//!
//! The provider accepts its credentials under more than one header
//! scheme depending on account age and token kind, and does not
//! document which. Each scheme is a template rendered against the
//! configured credential; the dispatcher tries them in declared order.

use super::credentials::TokenKind;

/// One way to attach the credential to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCandidate {
    /// Header name, e.g. `Authorization`.
    pub header: &'static str,
    /// Fully rendered header value (contains the secret; never log it).
    pub value: String,
    /// Human label for traces and logs.
    pub label: &'static str,
}

impl AuthCandidate {
    /// Candidates compare by wire representation; two schemes that
    /// render identically are the same attempt.
    #[must_use]
    pub fn wire_eq(&self, other: &AuthCandidate) -> bool {
        self.header.eq_ignore_ascii_case(other.header) && self.value == other.value
    }
}

/// Header scheme templates in probe order.
struct Scheme {
    header: &'static str,
    label: &'static str,
    render: fn(&str) -> String,
}

const SCHEMES: &[Scheme] = &[
    Scheme {
        header: "Authorization",
        label: "authorization-bearer",
        render: |token| format!("Bearer {token}"),
    },
    Scheme {
        header: "Authorization",
        label: "authorization-raw",
        render: |token| token.to_string(),
    },
    Scheme { header: "Token", label: "token-header", render: |token| token.to_string() },
];

/// Render every auth candidate for a credential, in declared order.
///
/// JWTs have only ever been observed behind `Authorization: Bearer`, so
/// that scheme leads for both kinds; the alternates matter for PITs,
/// whose accepted scheme varies by provider account entitlement.
#[must_use]
pub fn candidates_for(credential: &str, kind: TokenKind) -> Vec<AuthCandidate> {
    let all: Vec<AuthCandidate> = SCHEMES
        .iter()
        .map(|scheme| AuthCandidate {
            header: scheme.header,
            value: (scheme.render)(credential),
            label: scheme.label,
        })
        .collect();

    match kind {
        TokenKind::Pit => all,
        // Keep one alternate for JWTs; the bare-value scheme has been
        // seen accepted by legacy hosts.
        TokenKind::Jwt => all.into_iter().take(2).collect(),
    }
}

/// Drop candidates that render to the same header/value pair, keeping
/// first occurrences and their order.
#[must_use]
pub fn dedup(candidates: Vec<AuthCandidate>) -> Vec<AuthCandidate> {
    let mut unique: Vec<AuthCandidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !unique.iter().any(|existing| existing.wire_eq(&candidate)) {
            unique.push(candidate);
        }
    }
    unique
}
