//! Tool-provider (MCP) discovery for the tool manifest gateway.
//!
//! ## Modules
//!
//! - [`core`]: provider configuration, the provider channel and the provider manager
//! - [`inventory`]: tool descriptor types and plugin-key namespacing
//!
//! ## Shared Types
//!
//! - [`TenantId`]: per-tenant isolation of provider configuration and caches

// Shared types (used across modules)
pub mod error;
pub mod tenant;

// Subsystems
pub mod core;
pub mod inventory;

// Re-export from core
pub use core::{
    CachedServerTools, CustomUserVar, McpTransport, ProviderConfig, ProviderConnector,
    ProviderManager, ProviderSession, ProviderTool, RmcpConnector, ServerHandshake,
    ServerToolsCallback,
};

pub use error::{McpError, McpResult};
// Re-export from inventory
pub use inventory::{
    AuthRequirement, PluginKey, ToolDescriptor, AUTH_FIELD_SEPARATOR, PLUGIN_KEY_DELIMITER,
    USER_PROVIDED,
};
pub use tenant::TenantId;
