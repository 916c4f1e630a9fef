//! Which plugin keys have a runnable implementation.

use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use toolgate_mcp::{PluginKey, ProviderConfig, ProviderManager, TenantId};
use tracing::warn;

use super::registry::StaticToolRegistry;

#[async_trait]
pub trait ToolDefinitionStore: Send + Sync {
    async fn defined_keys(
        &self,
        tenant: &TenantId,
        providers: &[ProviderConfig],
    ) -> HashSet<PluginKey>;
}

/// Built-in executor keys plus whatever the tenant's per-server tool caches hold.
pub struct ExecutorDefinitions {
    /// `None` treats every concrete catalog entry as runnable.
    executor_keys: Option<HashSet<PluginKey>>,
    registry: Arc<StaticToolRegistry>,
    providers: Arc<ProviderManager>,
}

impl ExecutorDefinitions {
    pub fn new(
        executor_keys: Option<HashSet<PluginKey>>,
        registry: Arc<StaticToolRegistry>,
        providers: Arc<ProviderManager>,
    ) -> Self {
        Self {
            executor_keys,
            registry,
            providers,
        }
    }

    async fn builtin_keys(&self) -> HashSet<PluginKey> {
        if let Some(keys) = &self.executor_keys {
            return keys.clone();
        }
        match self.registry.concrete_keys().await {
            Ok(keys) => keys.into_iter().collect(),
            Err(e) => {
                warn!(error = %e, "Tool catalog unavailable, no built-in tools are defined");
                HashSet::new()
            }
        }
    }
}

#[async_trait]
impl ToolDefinitionStore for ExecutorDefinitions {
    async fn defined_keys(
        &self,
        tenant: &TenantId,
        providers: &[ProviderConfig],
    ) -> HashSet<PluginKey> {
        let mut keys = self.builtin_keys().await;
        for provider in providers {
            if let Some(tools) = self.providers.get_server_tools(tenant, &provider.name).await {
                keys.extend(tools.into_iter().map(|t| t.plugin_key));
            }
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use data_connector::MemoryCacheStore;
    use toolgate_mcp::{
        CachedServerTools, McpResult, McpTransport, ProviderConnector, ProviderSession,
        ServerToolsCallback, ToolDescriptor,
    };

    use super::*;

    struct NoConnector;

    #[async_trait]
    impl ProviderConnector for NoConnector {
        async fn connect(&self, _config: &ProviderConfig) -> McpResult<Box<dyn ProviderSession>> {
            Err(toolgate_mcp::McpError::ConnectionFailed("offline".into()))
        }
    }

    const CATALOG: &str = r#"[
        {"name": "Calculator", "pluginKey": "calculator"},
        {"name": "Image", "pluginKey": "image_gen", "toolkit": true}
    ]"#;

    async fn setup(
        executor_keys: Option<HashSet<PluginKey>>,
    ) -> (ExecutorDefinitions, Vec<ProviderConfig>) {
        let cache = Arc::new(CachedServerTools::new(
            Arc::new(MemoryCacheStore::new()),
            CachedServerTools::DEFAULT_TTL,
        ));
        cache
            .store(
                &TenantId::default(),
                "Foo",
                &[ToolDescriptor::new("search", PluginKey::provider("search", "Foo"))],
            )
            .await;
        let manager = Arc::new(ProviderManager::new(Arc::new(NoConnector), cache));
        let registry = Arc::new(StaticToolRegistry::from_json(CATALOG));
        let providers = vec![ProviderConfig::new(
            "Foo",
            McpTransport::Sse {
                url: "http://foo/sse".to_string(),
                token: None,
            },
        )];
        (
            ExecutorDefinitions::new(executor_keys, registry, manager),
            providers,
        )
    }

    #[tokio::test]
    async fn test_defaults_to_concrete_catalog_keys() {
        let (defs, providers) = setup(None).await;
        let keys = defs.defined_keys(&TenantId::default(), &providers).await;
        assert!(keys.contains(&PluginKey::builtin("calculator")));
        assert!(keys.contains(&PluginKey::provider("search", "Foo")));
        assert!(!keys.contains(&PluginKey::builtin("image_gen")));
    }

    #[tokio::test]
    async fn test_explicit_executor_keys() {
        let explicit: HashSet<PluginKey> = [PluginKey::builtin("dalle")].into_iter().collect();
        let (defs, providers) = setup(Some(explicit)).await;
        let keys = defs.defined_keys(&TenantId::default(), &providers).await;
        assert!(keys.contains(&PluginKey::builtin("dalle")));
        assert!(!keys.contains(&PluginKey::builtin("calculator")));
    }

    #[tokio::test]
    async fn test_server_caches_are_per_tenant() {
        let (defs, providers) = setup(None).await;
        let keys = defs
            .defined_keys(&TenantId::new("other"), &providers)
            .await;
        assert!(!keys.contains(&PluginKey::provider("search", "Foo")));
    }
}
