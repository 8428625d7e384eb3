//! # LeadBridge Core
//!
//! Port definitions for LeadBridge business operations.
//!
//! This crate contains:
//! - The `CrmGateway` port implemented by `leadbridge-infra`
//!
//! ## Architecture
//! - Depends only on `leadbridge-domain`
//! - No I/O; traits only

pub mod crm_ports;

pub use crm_ports::CrmGateway;
