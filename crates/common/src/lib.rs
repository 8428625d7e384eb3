//! # LeadBridge Common
//!
//! Cross-cutting utilities shared by the LeadBridge crates.
//!
//! This crate contains:
//! - Time abstraction (`testing::Clock`) so TTL logic stays deterministic
//!   under test
//! - A generic TTL cache with lazy expiry (`cache::TtlCache`)
//!
//! ## Architecture
//! - No dependencies on other LeadBridge crates
//! - Side-effect free; all I/O lives in `leadbridge-infra`

pub mod cache;
pub mod testing;

pub use cache::TtlCache;
pub use testing::{Clock, MockClock, SystemClock};
