//! Provider configuration, the provider channel and the provider manager.

pub mod client;
pub mod config;
pub mod manager;

pub use client::{ProviderConnector, ProviderSession, ProviderTool, RmcpConnector, ServerHandshake};
pub use config::{CustomUserVar, McpTransport, ProviderConfig};
pub use manager::{CachedServerTools, ProviderManager, ServerToolsCallback};
