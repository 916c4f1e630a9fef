//! Provider management.
//!
//! Fetches tool lists from every configured provider of a tenant concurrently and
//! normalizes them into namespaced [`ToolDescriptor`]s. Each provider runs under its
//! own timeout; a failing provider contributes nothing and never fails the batch.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use data_connector::{get_entry, put_entry, CacheStore};
use futures::future::join_all;
use tracing::{debug, error, info, warn};

use super::{
    client::{ProviderConnector, ProviderTool},
    config::ProviderConfig,
};
use crate::{
    error::{McpError, McpResult},
    inventory::{PluginKey, ToolDescriptor, PLUGIN_KEY_DELIMITER},
    tenant::TenantId,
};

/// Receives each provider's normalized tool list and serves it back per server.
#[async_trait]
pub trait ServerToolsCallback: Send + Sync + 'static {
    async fn store(&self, tenant: &TenantId, server: &str, tools: &[ToolDescriptor]);

    async fn load(&self, tenant: &TenantId, server: &str) -> Option<Vec<ToolDescriptor>>;
}

/// Per-server tool lists kept in the shared cache store under a short TTL.
pub struct CachedServerTools {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl CachedServerTools {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn cache_key(tenant: &TenantId, server: &str) -> String {
        format!("server_tools:{}:{}", tenant, server)
    }
}

#[async_trait]
impl ServerToolsCallback for CachedServerTools {
    async fn store(&self, tenant: &TenantId, server: &str, tools: &[ToolDescriptor]) {
        let key = Self::cache_key(tenant, server);
        if let Err(e) = put_entry(self.store.as_ref(), &key, &tools, Some(self.ttl)).await {
            warn!(
                tenant = %tenant,
                server,
                backend = self.store.backend(),
                error = %e,
                "Failed to cache server tools"
            );
        }
    }

    async fn load(&self, tenant: &TenantId, server: &str) -> Option<Vec<ToolDescriptor>> {
        let key = Self::cache_key(tenant, server);
        match get_entry::<Vec<ToolDescriptor>>(self.store.as_ref(), &key).await {
            Ok(entry) => entry.map(|e| e.value),
            Err(e) => {
                warn!(
                    tenant = %tenant,
                    server,
                    backend = self.store.backend(),
                    error = %e,
                    "Failed to read cached server tools"
                );
                None
            }
        }
    }
}

/// Owns the provider channel and the per-server tool cache.
pub struct ProviderManager {
    connector: Arc<dyn ProviderConnector>,
    server_tools: Arc<dyn ServerToolsCallback>,
}

impl ProviderManager {
    pub fn new(
        connector: Arc<dyn ProviderConnector>,
        server_tools: Arc<dyn ServerToolsCallback>,
    ) -> Self {
        Self {
            connector,
            server_tools,
        }
    }

    /// Fetch and normalize the tools of every provider in `configs`.
    ///
    /// Output is providers in configuration order, each provider's tools in the order the
    /// provider listed them. Failed or timed-out providers contribute an empty list.
    pub async fn load_manifest_tools(
        &self,
        tenant: &TenantId,
        configs: &[ProviderConfig],
    ) -> Vec<ToolDescriptor> {
        if configs.is_empty() {
            return Vec::new();
        }

        let fetches = configs
            .iter()
            .map(|config| self.load_provider(tenant, config));
        let results = join_all(fetches).await;

        let mut tools = Vec::new();
        let mut failed = 0usize;
        for (config, result) in configs.iter().zip(results) {
            match result {
                Ok(list) => {
                    self.server_tools.store(tenant, &config.name, &list).await;
                    tools.extend(list);
                }
                Err(e) => {
                    failed += 1;
                    error!(
                        tenant = %tenant,
                        server = %config.name,
                        timed_out = matches!(e, McpError::Timeout { .. }),
                        "Provider skipped: {}", e
                    );
                }
            }
        }

        info!(
            tenant = %tenant,
            providers = configs.len(),
            failed,
            tools = tools.len(),
            "Loaded provider tools"
        );
        tools
    }

    /// Previously cached tool list for one server, without re-fetching.
    pub async fn get_server_tools(
        &self,
        tenant: &TenantId,
        server: &str,
    ) -> Option<Vec<ToolDescriptor>> {
        self.server_tools.load(tenant, server).await
    }

    async fn load_provider(
        &self,
        tenant: &TenantId,
        config: &ProviderConfig,
    ) -> McpResult<Vec<ToolDescriptor>> {
        let timeout = config.timeout();
        match tokio::time::timeout(timeout, self.fetch_provider(config)).await {
            Ok(result) => {
                let raw = result?;
                debug!(
                    tenant = %tenant,
                    server = %config.name,
                    count = raw.len(),
                    "Provider listed tools"
                );
                Ok(normalize_tools(config, raw))
            }
            Err(_) => Err(McpError::Timeout {
                server: config.name.clone(),
                timeout_ms: config.timeout_ms,
            }),
        }
    }

    async fn fetch_provider(&self, config: &ProviderConfig) -> McpResult<Vec<ProviderTool>> {
        let session = self.connector.connect(config).await?;
        let handshake = session.handshake();
        debug!(
            server = %config.name,
            protocol_version = %handshake.protocol_version,
            server_name = %handshake.server_name,
            server_version = %handshake.server_version,
            "Provider handshake complete"
        );
        let listed = session.list_tools().await;
        session.close().await;
        listed
    }
}

/// Turn a provider's raw listing into namespaced descriptors.
pub(crate) fn normalize_tools(
    config: &ProviderConfig,
    raw: Vec<ProviderTool>,
) -> Vec<ToolDescriptor> {
    let auth_config = config.custom_auth_config().unwrap_or_default();

    raw.into_iter()
        .filter_map(|tool| {
            if tool.name.trim().is_empty() || tool.name.contains(PLUGIN_KEY_DELIMITER) {
                let err = McpError::MalformedTool(format!(
                    "provider '{}' listed tool with invalid name '{}'",
                    config.name, tool.name
                ));
                warn!(server = %config.name, "Dropping tool: {}", err);
                return None;
            }

            let mut descriptor = ToolDescriptor::new(
                tool.name.clone(),
                PluginKey::provider(tool.name, config.name.clone()),
            )
            .with_description(tool.description.unwrap_or_default())
            .with_auth_config(auth_config.clone());
            descriptor.chat_menu = config.chat_menu;
            Some(descriptor)
        })
        .collect()
}
