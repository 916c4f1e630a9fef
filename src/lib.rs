//! Tenant-aware tool manifest gateway.
//!
//! Discovers tools from per-tenant tool-provider servers, merges them with a built-in
//! catalog, resolves credential readiness and toolkit membership, and serves the
//! result over HTTP from a shared cache.

pub mod config;
pub mod logging;
pub mod manifest;
pub mod routers;
pub mod server;
pub mod tenants;

pub use config::{ConfigError, GatewayConfig};
pub use server::{build_app, startup, AppContext, AppState, ServerError};
