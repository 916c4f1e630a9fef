//! Tool manifest engine.
//!
//! - [`registry`]: built-in tool catalog
//! - [`auth`]: credential readiness of each tool
//! - [`toolkit`]: toolkit membership
//! - [`builder`]: merge, dedupe and filter into a manifest
//! - [`definitions`]: which keys are runnable
//! - [`gateway`]: cached, tenant-aware manifest access
//! - [`enrich`]: per-response manifest stages

pub mod auth;
pub mod builder;
pub mod definitions;
pub mod enrich;
pub mod gateway;
pub mod registry;
pub mod toolkit;

pub use auth::{AuthFieldResolver, CredentialSource, EnvCredentials, MapCredentials};
pub use builder::{server_auth_overrides, BuildInputs, ManifestBuilder, ToolFilter};
pub use definitions::{ExecutorDefinitions, ToolDefinitionStore};
pub use enrich::{EnrichContext, ManifestEnricher, ProviderIconEnricher};
pub use gateway::{CachedManifest, ManifestCacheGateway, ManifestError, ManifestKind};
pub use registry::{parse_catalog, CatalogError, StaticToolRegistry};
pub use toolkit::{has_member, strip_delimiter};
