//! BaaS API module
//!
//! Typed access to the hosted project's table and auth endpoints.

pub mod client;
pub mod query;
pub mod types;

pub use client::BaasClient;
pub use query::Query;
pub use types::*;
