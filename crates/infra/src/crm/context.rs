//! Resolved dispatch context
//!
//! The outcome of context resolution: which base URL to call, which
//! auth candidate is currently believed correct, which tenant the
//! calls are scoped to, and the diagnostic trail of how we got there.
//!
//! A context is shared between the cache, the resolver and the
//! dispatcher as `Arc<RwLock<ResolvedContext>>`. The dispatcher's
//! self-healing primary promotion happens through that lock so later
//! operations holding the same cache entry observe it.

use std::sync::{Arc, RwLock};

use super::auth::{dedup, AuthCandidate};
use super::credentials::TokenKind;

/// Where the tenant id came from, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TenantSource {
    /// Passed by the caller on the operation itself.
    Explicit,
    /// Configured via environment.
    Environment,
    /// Decoded from a JWT claim.
    TokenClaim,
    /// Discovered by probing a who-am-I endpoint.
    Discovered,
    /// Configured last-resort value; a workaround, always trace-logged.
    Fallback,
}

/// Outcome of successful or partial context resolution.
#[derive(Debug)]
pub struct ResolvedContext {
    /// Base URL the context was resolved against.
    pub base_url: String,
    /// Version-normalized base actually used to build request URLs.
    pub api_base: String,
    /// Auth candidate currently believed correct.
    primary: AuthCandidate,
    /// Remaining candidates, in rotation order.
    alternates: Vec<AuthCandidate>,
    /// Tenant id, when one was resolvable. Absent is a valid state the
    /// operations must handle.
    pub tenant_id: Option<String>,
    pub tenant_source: Option<TenantSource>,
    pub token_kind: TokenKind,
    /// Masked credential preview for logs.
    pub token_preview: String,
    /// Ordered diagnostic lines accumulated during resolution and
    /// dispatch; supportability, not control flow.
    pub trace: Vec<String>,
}

/// Handle shared between the cache and every in-flight operation.
pub type SharedContext = Arc<RwLock<ResolvedContext>>;

impl ResolvedContext {
    /// Assemble a context. The primary is removed from `alternates` if
    /// present, keeping the "exactly one primary" invariant.
    pub fn new(
        base_url: impl Into<String>,
        api_base: impl Into<String>,
        primary: AuthCandidate,
        alternates: Vec<AuthCandidate>,
        token_kind: TokenKind,
        token_preview: impl Into<String>,
    ) -> Self {
        let alternates =
            alternates.into_iter().filter(|c| !c.wire_eq(&primary)).collect::<Vec<_>>();
        Self {
            base_url: base_url.into(),
            api_base: api_base.into(),
            primary,
            alternates,
            tenant_id: None,
            tenant_source: None,
            token_kind,
            token_preview: token_preview.into(),
            trace: Vec::new(),
        }
    }

    /// Wrap into the shared handle used by the cache and dispatcher.
    #[must_use]
    pub fn into_shared(self) -> SharedContext {
        Arc::new(RwLock::new(self))
    }

    /// The auth candidate currently believed correct.
    #[must_use]
    pub fn primary(&self) -> &AuthCandidate {
        &self.primary
    }

    /// Full attempt order for a dispatch: primary first, then the
    /// alternates, wire-level duplicates removed.
    #[must_use]
    pub fn attempt_order(&self) -> Vec<AuthCandidate> {
        let mut order = Vec::with_capacity(1 + self.alternates.len());
        order.push(self.primary.clone());
        order.extend(self.alternates.iter().cloned());
        dedup(order)
    }

    /// Promote a candidate to primary after it produced a non-rejected
    /// response. The displaced primary joins the alternates, so the
    /// candidate set is stable and the invariant (primary plus
    /// alternates covers every scheme exactly once) holds.
    pub fn promote(&mut self, winner: &AuthCandidate) {
        if self.primary.wire_eq(winner) {
            return;
        }

        let old = std::mem::replace(&mut self.primary, winner.clone());
        self.alternates.retain(|c| !c.wire_eq(winner));
        self.alternates.insert(0, old);
        self.trace.push(format!(
            "auth self-heal: primary switched to {} (was {})",
            self.primary.label,
            self.alternates[0].label
        ));
    }

    /// Record the tenant id and where it came from.
    pub fn set_tenant(&mut self, tenant_id: impl Into<String>, source: TenantSource) {
        let tenant_id = tenant_id.into();
        self.trace.push(format!("tenant id {tenant_id} resolved via {source:?}"));
        self.tenant_id = Some(tenant_id);
        self.tenant_source = Some(source);
    }

    /// Append a diagnostic line.
    pub fn note(&mut self, line: impl Into<String>) {
        self.trace.push(line.into());
    }
}

/// Trim trailing slashes and give the legacy host its version path.
///
/// The provider exposes the same API under a modern host (unversioned
/// paths) and a legacy host (everything under `/v1`).
#[must_use]
pub fn normalize_api_base(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.contains("gohighlevel.com") && !trimmed.ends_with("/v1") {
        format!("{trimmed}/v1")
    } else {
        trimmed.to_string()
    }
}
