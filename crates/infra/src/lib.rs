//! # LeadBridge Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - The CRM provider adapter (credential classification, context
//!   resolution, resilient request dispatch, operation fallback chains)
//! - HTTP client implementation
//! - Environment configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `leadbridge-core`
//! - Depends on `leadbridge-common` and `leadbridge-domain`
//! - Contains all "impure" code (network I/O, environment access)

pub mod config;
pub mod crm;
pub mod errors;
pub mod http;

// Re-export commonly used items
pub use crm::CrmClient;
pub use errors::InfraError;
pub use http::HttpClient;
