//! Credential → context cache
//!
//! Context resolution for a PIT credential can cost a full probe sweep
//! of network calls, so resolved contexts (full or partial) are held
//! for a fixed TTL keyed by the raw credential string. Values are the
//! shared `Arc<RwLock<_>>` handles: the dispatcher's primary promotion
//! mutates the cached entry itself, which is how the adapter learns
//! the right auth scheme across operations.

use std::time::Duration;

use leadbridge_common::testing::{Clock, SystemClock};
use leadbridge_common::TtlCache;

use super::context::SharedContext;

/// How long a resolved context stays usable before the next operation
/// pays for a fresh resolution.
pub const DEFAULT_CONTEXT_TTL: Duration = Duration::from_secs(600);

/// TTL cache of resolved contexts, keyed by raw credential.
pub struct ContextCache<C: Clock = SystemClock> {
    inner: TtlCache<String, SharedContext, C>,
}

impl ContextCache<SystemClock> {
    /// Cache with the default ten-minute TTL and system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_CONTEXT_TTL)
    }

    /// Cache with a custom TTL and the system clock.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { inner: TtlCache::new(ttl) }
    }
}

impl Default for ContextCache<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> ContextCache<C> {
    /// Cache with a custom clock (deterministic expiry in tests).
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self { inner: TtlCache::with_clock(ttl, clock) }
    }

    /// Fetch the live context for a credential, if one is cached and
    /// within its TTL window.
    #[must_use]
    pub fn get(&self, credential: &str) -> Option<SharedContext> {
        self.inner.get(&credential.to_string())
    }

    /// Store a context for a credential, restarting its TTL window.
    pub fn insert(&self, credential: &str, context: SharedContext) {
        self.inner.insert(credential.to_string(), context);
    }

    /// Drop a credential's entry (e.g. after a credential change).
    pub fn invalidate(&self, credential: &str) {
        self.inner.remove(&credential.to_string());
    }
}
