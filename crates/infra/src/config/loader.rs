//! Configuration loader
//!
//! Reads `CrmConfig` from the environment once at startup.
//!
//! ## Environment Variables
//! - `LEADBRIDGE_CRM_API_KEY`: provider credential (required)
//! - `LEADBRIDGE_CRM_BASE_URL`: optional base URL override
//! - `LEADBRIDGE_CRM_SANDBOX`: use staging hosts (true/false, default false)
//! - `LEADBRIDGE_CRM_LOCATION_ID`: explicit tenant id override
//! - `LEADBRIDGE_CRM_FALLBACK_LOCATION_ID`: last-resort tenant id;
//!   the fallback branch stays disabled when unset
//! - `LEADBRIDGE_CRM_TIMEOUT_SECS`: per-request timeout (default 30)

use leadbridge_domain::{CrmConfig, LeadBridgeError, Result, DEFAULT_TIMEOUT_SECS};

const ENV_API_KEY: &str = "LEADBRIDGE_CRM_API_KEY";
const ENV_BASE_URL: &str = "LEADBRIDGE_CRM_BASE_URL";
const ENV_SANDBOX: &str = "LEADBRIDGE_CRM_SANDBOX";
const ENV_LOCATION_ID: &str = "LEADBRIDGE_CRM_LOCATION_ID";
const ENV_FALLBACK_LOCATION_ID: &str = "LEADBRIDGE_CRM_FALLBACK_LOCATION_ID";
const ENV_TIMEOUT_SECS: &str = "LEADBRIDGE_CRM_TIMEOUT_SECS";

/// Load the adapter configuration from process environment variables.
///
/// # Errors
/// Returns `LeadBridgeError::Config` if the credential is missing or a
/// numeric variable fails to parse. This is the fail-fast path: no
/// network call happens before this check.
pub fn from_env() -> Result<CrmConfig> {
    from_env_with(|name| std::env::var(name).ok())
}

/// Load configuration through an arbitrary variable source.
///
/// Exists so tests can exercise the loader without mutating the real
/// process environment.
pub fn from_env_with<F>(var: F) -> Result<CrmConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let api_key = var(ENV_API_KEY)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            LeadBridgeError::Config(format!("{ENV_API_KEY} is not set; CRM adapter disabled"))
        })?;

    let timeout_secs = match var(ENV_TIMEOUT_SECS) {
        Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
            LeadBridgeError::Config(format!("invalid {ENV_TIMEOUT_SECS}: {e}"))
        })?,
        None => DEFAULT_TIMEOUT_SECS,
    };

    let config = CrmConfig {
        api_key,
        base_url: var(ENV_BASE_URL).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()),
        sandbox: parse_bool(var(ENV_SANDBOX).as_deref()),
        location_id: var(ENV_LOCATION_ID).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()),
        fallback_location_id: var(ENV_FALLBACK_LOCATION_ID)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()),
        timeout_secs,
    };

    tracing::info!(config = ?config, "CRM adapter configuration loaded");
    Ok(config)
}

fn parse_bool(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "1" | "yes" | "on")
    )
}
