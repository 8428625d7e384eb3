//! Adapter configuration structures
//!
//! `CrmConfig` is read once at startup (see `leadbridge-infra`'s loader)
//! and treated as immutable afterwards. The credential is an opaque
//! secret; `Debug` renders a masked preview so the full value never
//! reaches a log line.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Static deployment configuration for the CRM provider adapter.
#[derive(Clone, Serialize, Deserialize)]
pub struct CrmConfig {
    /// Opaque credential. May be PIT- or JWT-shaped; the adapter only
    /// inspects its shape, never its validity.
    pub api_key: String,
    /// Optional override of the provider base URL.
    pub base_url: Option<String>,
    /// Selects sandbox/staging provider hosts instead of production.
    pub sandbox: bool,
    /// Explicit tenant (location) id override. Highest-priority source
    /// after a per-call parameter.
    pub location_id: Option<String>,
    /// Last-resort tenant id. The fallback branch is disabled entirely
    /// when this is `None`.
    pub fallback_location_id: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl CrmConfig {
    /// Build a config with just a credential and defaults elsewhere.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            sandbox: false,
            location_id: None,
            fallback_location_id: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Per-request timeout as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for CrmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrmConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("sandbox", &self.sandbox)
            .field("location_id", &self.location_id)
            .field("fallback_location_id", &self.fallback_location_id)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Mask a secret down to a short preview: first six and last four
/// characters. Values too short to mask safely collapse to `***`.
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 12 {
        return "***".to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}
