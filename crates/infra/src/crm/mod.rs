//! CRM provider adapter
//!
//! Sits between business operations ("send an email", "sync a customer")
//! and the provider's REST API. The provider's authentication scheme,
//! base URL, and tenant scope are not reliably knowable ahead of time,
//! so this module discovers them:
//!
//! - [`credentials`] classifies the configured token by shape
//! - [`resolver`] probes the provider for a working base URL / auth
//!   header / tenant id combination and caches the outcome
//! - [`dispatcher`] executes requests, rotating auth schemes when the
//!   current one is rejected and self-healing the cached context
//! - [`fallback`] drives ordered endpoint/payload candidates for each
//!   logical operation
//! - [`gateway`] exposes the whole thing as the `CrmGateway` port

pub mod auth;
pub mod cache;
pub mod contacts;
pub mod context;
pub mod credentials;
pub mod dispatcher;
pub mod fallback;
pub mod gateway;
pub mod messages;
pub mod opportunities;
pub mod phrases;
pub mod resolver;

pub use cache::{ContextCache, DEFAULT_CONTEXT_TTL};
pub use context::{ResolvedContext, SharedContext, TenantSource};
pub use credentials::TokenKind;
pub use dispatcher::{DispatchResult, RequestDispatcher};
pub use gateway::CrmClient;
pub use resolver::ContextResolver;
