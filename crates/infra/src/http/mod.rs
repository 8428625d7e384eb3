//! HTTP client implementation
//!
//! The raw seam between the CRM adapter and the network. Everything
//! above this module reasons in terms of statuses and body text, never
//! raw `reqwest` errors.

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};
