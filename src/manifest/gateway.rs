//! Cached, tenant-aware manifest access.
//!
//! Manifests are cached under a key carrying a fingerprint of the tenant's provider
//! configuration, so a changed provider set never reads a manifest built for the old
//! one, whichever process wrote it. A cached manifest built without any provider tools
//! while the tenant has providers is rebuilt anyway.

use std::{collections::HashSet, fmt, sync::Arc, time::Duration};

use data_connector::{get_entry, put_entry, CacheStore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use toolgate_mcp::{PluginKey, ProviderConfig, ProviderManager, TenantId, ToolDescriptor};
use tracing::{debug, info, warn};

use super::{
    builder::{server_auth_overrides, BuildInputs, ManifestBuilder, ToolFilter},
    definitions::ToolDefinitionStore,
    registry::{CatalogError, StaticToolRegistry},
};

/// Hex digits of the configuration fingerprint kept in cache keys.
const FINGERPRINT_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestKind {
    /// Every known tool, served by `/plugins`.
    Plugins,
    /// Runnable tools only, served by `/tools`.
    Tools,
}

impl ManifestKind {
    pub const ALL: [ManifestKind; 2] = [ManifestKind::Plugins, ManifestKind::Tools];

    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestKind::Plugins => "plugins",
            ManifestKind::Tools => "tools",
        }
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cached form of a built manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedManifest {
    /// Provider tools fetched for the build, counted before filtering.
    pub provider_tools: usize,
    pub tools: Vec<ToolDescriptor>,
}

pub struct ManifestCacheGateway {
    store: Arc<dyn CacheStore>,
    registry: Arc<StaticToolRegistry>,
    providers: Arc<ProviderManager>,
    definitions: Arc<dyn ToolDefinitionStore>,
    builder: ManifestBuilder,
    filter: ToolFilter,
    ttl: Option<Duration>,
}

impl ManifestCacheGateway {
    pub fn new(
        store: Arc<dyn CacheStore>,
        registry: Arc<StaticToolRegistry>,
        providers: Arc<ProviderManager>,
        definitions: Arc<dyn ToolDefinitionStore>,
        builder: ManifestBuilder,
    ) -> Self {
        Self {
            store,
            registry,
            providers,
            definitions,
            builder,
            filter: ToolFilter::default(),
            ttl: None,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: ToolFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn registry(&self) -> &Arc<StaticToolRegistry> {
        &self.registry
    }

    /// Cache key for `kind` under the fingerprint of the tenant's provider set.
    pub fn cache_key(
        tenant: &TenantId,
        kind: ManifestKind,
        providers: &[ProviderConfig],
    ) -> String {
        let fingerprint = fingerprint(providers).to_hex();
        format!(
            "manifest:{}:{}:{}",
            kind,
            tenant,
            &fingerprint[..FINGERPRINT_LEN]
        )
    }

    /// Serve the cached manifest, rebuilding on a miss or when the cached copy was built
    /// without any of the tenant's provider tools.
    pub async fn get_or_build(
        &self,
        tenant: &TenantId,
        kind: ManifestKind,
        providers: &[ProviderConfig],
    ) -> Result<Vec<ToolDescriptor>, ManifestError> {
        let key = Self::cache_key(tenant, kind, providers);

        match get_entry::<CachedManifest>(self.store.as_ref(), &key).await {
            Ok(Some(entry)) if !needs_repair(providers, &entry.value) => {
                debug!(%tenant, %kind, %key, "Manifest cache hit");
                return Ok(entry.value.tools);
            }
            Ok(Some(_)) => {
                info!(
                    %tenant,
                    %kind,
                    %key,
                    providers = providers.len(),
                    "Cached manifest was built without provider tools, rebuilding"
                );
            }
            Ok(None) => debug!(%tenant, %kind, %key, "Manifest cache miss"),
            Err(e) => warn!(
                %tenant,
                %kind,
                backend = self.store.backend(),
                error = %e,
                "Cache unavailable, building manifest uncached"
            ),
        }

        let manifest = self.build(tenant, kind, providers).await?;

        if let Err(e) = put_entry(self.store.as_ref(), &key, &manifest, self.ttl).await {
            warn!(
                %tenant,
                %kind,
                backend = self.store.backend(),
                error = %e,
                "Failed to cache manifest"
            );
        }
        Ok(manifest.tools)
    }

    /// Drop both cached manifests built for `providers`.
    pub async fn invalidate(&self, tenant: &TenantId, providers: &[ProviderConfig]) -> usize {
        let mut removed = 0;
        for kind in ManifestKind::ALL {
            let key = Self::cache_key(tenant, kind, providers);
            match self.store.delete(&key).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => warn!(%tenant, %key, error = %e, "Failed to invalidate manifest"),
            }
        }
        info!(%tenant, removed, "Invalidated cached manifests");
        removed
    }

    async fn build(
        &self,
        tenant: &TenantId,
        kind: ManifestKind,
        providers: &[ProviderConfig],
    ) -> Result<CachedManifest, ManifestError> {
        let static_tools = self.registry.list().await?;
        let provider_tools = self.providers.load_manifest_tools(tenant, providers).await;

        let tools = match kind {
            ManifestKind::Plugins => {
                self.builder
                    .combine(&static_tools, &provider_tools, &self.filter)
            }
            ManifestKind::Tools => {
                let mut defined_keys: HashSet<PluginKey> =
                    self.definitions.defined_keys(tenant, providers).await;
                // Freshly fetched tools count even when the per-server cache did not keep them.
                defined_keys.extend(provider_tools.iter().map(|t| t.plugin_key.clone()));
                let server_auth = server_auth_overrides(providers);
                self.builder.build(&BuildInputs {
                    static_tools: &static_tools,
                    provider_tools: &provider_tools,
                    defined_keys: &defined_keys,
                    filter: &self.filter,
                    server_auth: &server_auth,
                })
            }
        };

        info!(
            %tenant,
            %kind,
            static_tools = static_tools.len(),
            provider_tools = provider_tools.len(),
            tools = tools.len(),
            "Built manifest"
        );
        Ok(CachedManifest {
            provider_tools: provider_tools.len(),
            tools,
        })
    }
}

/// Stable digest of a tenant's provider set.
fn fingerprint(providers: &[ProviderConfig]) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    for provider in providers {
        match serde_json::to_vec(provider) {
            Ok(bytes) => {
                hasher.update(&(bytes.len() as u64).to_le_bytes());
                hasher.update(&bytes);
            }
            Err(e) => {
                warn!(provider = %provider.name, error = %e, "Provider config not hashable");
                hasher.update(provider.name.as_bytes());
            }
        }
    }
    hasher.finalize()
}

/// A tenant with providers must have had at least one provider tool when its cached
/// manifest was built. Filtering does not count: an allow-list may hide every provider tool.
fn needs_repair(providers: &[ProviderConfig], cached: &CachedManifest) -> bool {
    !providers.is_empty() && cached.provider_tools == 0
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use data_connector::{CacheError, CacheResult, MemoryCacheStore, NoOpCacheStore};
    use toolgate_mcp::{
        CachedServerTools, McpError, McpResult, McpTransport, ProviderConnector, ProviderSession,
        ProviderTool, ServerHandshake,
    };

    use super::*;
    use crate::manifest::{
        auth::{AuthFieldResolver, MapCredentials},
        definitions::ExecutorDefinitions,
    };

    struct StaticSession {
        handshake: ServerHandshake,
        tools: Vec<ProviderTool>,
    }

    #[async_trait]
    impl ProviderSession for StaticSession {
        fn handshake(&self) -> &ServerHandshake {
            &self.handshake
        }

        async fn list_tools(&self) -> McpResult<Vec<ProviderTool>> {
            Ok(self.tools.clone())
        }

        async fn close(self: Box<Self>) {}
    }

    /// Every server lists `search`; counts connections.
    #[derive(Default)]
    struct CountingConnector {
        connects: AtomicUsize,
        offline: bool,
    }

    #[async_trait]
    impl ProviderConnector for CountingConnector {
        async fn connect(&self, config: &ProviderConfig) -> McpResult<Box<dyn ProviderSession>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self.offline {
                return Err(McpError::ConnectionFailed("offline".into()));
            }
            Ok(Box::new(StaticSession {
                handshake: ServerHandshake {
                    server_name: config.name.clone(),
                    ..Default::default()
                },
                tools: vec![ProviderTool::new("search")],
            }))
        }
    }

    const CATALOG: &str = r#"[{"name": "Calculator", "pluginKey": "calculator"}]"#;

    fn provider(name: &str) -> ProviderConfig {
        ProviderConfig::new(
            name,
            McpTransport::Streamable {
                url: format!("http://{}/mcp", name),
                token: None,
            },
        )
    }

    fn gateway_with(
        store: Arc<dyn CacheStore>,
        connector: Arc<CountingConnector>,
        catalog: &str,
    ) -> ManifestCacheGateway {
        let server_tools = Arc::new(CachedServerTools::new(
            store.clone(),
            CachedServerTools::DEFAULT_TTL,
        ));
        let manager = Arc::new(ProviderManager::new(connector, server_tools));
        let registry = Arc::new(StaticToolRegistry::from_json(catalog));
        let definitions = Arc::new(ExecutorDefinitions::new(
            None,
            registry.clone(),
            manager.clone(),
        ));
        let builder = ManifestBuilder::new(AuthFieldResolver::new(Arc::new(MapCredentials::new())));
        ManifestCacheGateway::new(store, registry, manager, definitions, builder)
    }

    fn keys(tools: &[ToolDescriptor]) -> Vec<String> {
        tools.iter().map(|t| t.plugin_key.to_string()).collect()
    }

    #[tokio::test]
    async fn test_builds_provider_then_static() {
        let store = Arc::new(MemoryCacheStore::new());
        let gateway = gateway_with(store, Arc::default(), CATALOG);
        let tenant = TenantId::default();

        for kind in ManifestKind::ALL {
            let tools = gateway
                .get_or_build(&tenant, kind, &[provider("Foo")])
                .await
                .unwrap();
            assert_eq!(keys(&tools), vec!["search::Foo", "calculator"]);
        }
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_cache() {
        let connector = Arc::new(CountingConnector::default());
        let gateway = gateway_with(Arc::new(MemoryCacheStore::new()), connector.clone(), CATALOG);
        let tenant = TenantId::default();
        let providers = vec![provider("Foo")];

        let first = gateway
            .get_or_build(&tenant, ManifestKind::Plugins, &providers)
            .await
            .unwrap();
        let second = gateway
            .get_or_build(&tenant, ManifestKind::Plugins, &providers)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cached_manifest_without_provider_tools_is_repaired() {
        let store = Arc::new(MemoryCacheStore::new());
        let connector = Arc::new(CountingConnector::default());
        let gateway = gateway_with(store.clone(), connector.clone(), CATALOG);
        let tenant = TenantId::default();
        let providers = vec![provider("Foo")];

        let key = ManifestCacheGateway::cache_key(&tenant, ManifestKind::Plugins, &providers);
        let stale = CachedManifest {
            provider_tools: 0,
            tools: vec![ToolDescriptor::new("calculator", PluginKey::builtin("calculator"))],
        };
        put_entry(&*store, &key, &stale, None).await.unwrap();

        let tools = gateway
            .get_or_build(&tenant, ManifestKind::Plugins, &providers)
            .await
            .unwrap();
        assert!(tools.iter().any(ToolDescriptor::is_provider_tool));
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);

        // The repaired manifest was written back.
        let cached = get_entry::<CachedManifest>(&*store, &key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached.value.tools, tools);
        assert_eq!(cached.value.provider_tools, 1);
    }

    #[tokio::test]
    async fn test_filtered_out_provider_tools_stay_cached() {
        let connector = Arc::new(CountingConnector::default());
        let gateway = gateway_with(Arc::new(MemoryCacheStore::new()), connector.clone(), CATALOG)
            .with_filter(ToolFilter::new(
                [PluginKey::builtin("calculator")].into_iter().collect(),
                HashSet::new(),
            ));
        let tenant = TenantId::default();
        let providers = vec![provider("Foo")];

        for kind in ManifestKind::ALL {
            for _ in 0..3 {
                let tools = gateway.get_or_build(&tenant, kind, &providers).await.unwrap();
                assert_eq!(keys(&tools), vec!["calculator"]);
            }
        }
        // One fetch per manifest kind.
        assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_provider_manifest_is_not_repaired_without_providers() {
        let connector = Arc::new(CountingConnector::default());
        let gateway = gateway_with(Arc::new(MemoryCacheStore::new()), connector.clone(), CATALOG);
        let tenant = TenantId::default();

        gateway
            .get_or_build(&tenant, ManifestKind::Plugins, &[])
            .await
            .unwrap();
        let tools = gateway
            .get_or_build(&tenant, ManifestKind::Plugins, &[])
            .await
            .unwrap();
        assert_eq!(keys(&tools), vec!["calculator"]);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cache_key_follows_provider_fingerprint() {
        let tenant = TenantId::new("acme");
        let one =
            ManifestCacheGateway::cache_key(&tenant, ManifestKind::Tools, &[provider("Foo")]);
        assert!(one.starts_with("manifest:tools:acme:"));
        assert_eq!(one.len(), "manifest:tools:acme:".len() + FINGERPRINT_LEN);
        assert_eq!(
            ManifestCacheGateway::cache_key(&tenant, ManifestKind::Tools, &[provider("Foo")]),
            one
        );

        let two = ManifestCacheGateway::cache_key(
            &tenant,
            ManifestKind::Tools,
            &[provider("Foo"), provider("Bar")],
        );
        assert_ne!(two, one);

        let mut slower = provider("Foo");
        slower.timeout_ms = 1_000;
        assert_ne!(
            ManifestCacheGateway::cache_key(&tenant, ManifestKind::Tools, &[slower]),
            one
        );
        assert_ne!(
            ManifestCacheGateway::cache_key(
                &TenantId::default(),
                ManifestKind::Tools,
                &[provider("Foo")]
            ),
            one
        );
    }

    #[tokio::test]
    async fn test_shared_store_never_serves_another_provider_set() {
        let store = Arc::new(MemoryCacheStore::new());
        let tenant = TenantId::new("acme");

        let first = gateway_with(store.clone(), Arc::default(), CATALOG);
        let tools = first
            .get_or_build(&tenant, ManifestKind::Tools, &[provider("Foo")])
            .await
            .unwrap();
        assert_eq!(keys(&tools), vec!["search::Foo", "calculator"]);

        // A restarted or sibling process sharing the store, configured with another set.
        let connector = Arc::new(CountingConnector::default());
        let second = gateway_with(store.clone(), connector.clone(), CATALOG);
        let tools = second
            .get_or_build(&tenant, ManifestKind::Tools, &[provider("Bar")])
            .await
            .unwrap();
        assert_eq!(keys(&tools), vec!["search::Bar", "calculator"]);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);

        // The original set is still served from the shared cache.
        let tools = second
            .get_or_build(&tenant, ManifestKind::Tools, &[provider("Foo")])
            .await
            .unwrap();
        assert_eq!(keys(&tools), vec!["search::Foo", "calculator"]);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
    }

    struct DownStore;

    #[async_trait]
    impl CacheStore for DownStore {
        fn backend(&self) -> &'static str {
            "down"
        }

        async fn get(&self, _key: &str) -> CacheResult<Option<serde_json::Value>> {
            Err(CacheError::Unavailable("connection refused".into()))
        }

        async fn set(
            &self,
            _key: &str,
            _value: serde_json::Value,
            _ttl: Option<Duration>,
        ) -> CacheResult<()> {
            Err(CacheError::Unavailable("connection refused".into()))
        }

        async fn delete(&self, _key: &str) -> CacheResult<bool> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_unavailable_cache_is_bypassed() {
        let connector = Arc::new(CountingConnector::default());
        let gateway = gateway_with(Arc::new(DownStore), connector.clone(), CATALOG);
        let tenant = TenantId::default();
        let providers = vec![provider("Foo")];

        for _ in 0..2 {
            let tools = gateway
                .get_or_build(&tenant, ManifestKind::Tools, &providers)
                .await
                .unwrap();
            assert_eq!(keys(&tools), vec!["search::Foo", "calculator"]);
        }
        assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
        assert_eq!(gateway.invalidate(&tenant, &providers).await, 0);
    }

    #[tokio::test]
    async fn test_no_op_cache_rebuilds_every_time() {
        let connector = Arc::new(CountingConnector::default());
        let gateway = gateway_with(Arc::new(NoOpCacheStore::new()), connector.clone(), CATALOG);
        let tenant = TenantId::default();

        for _ in 0..2 {
            let tools = gateway
                .get_or_build(&tenant, ManifestKind::Tools, &[provider("Foo")])
                .await
                .unwrap();
            assert_eq!(keys(&tools), vec!["search::Foo", "calculator"]);
        }
        assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_offline_provider_yields_static_only() {
        let connector = Arc::new(CountingConnector {
            offline: true,
            ..Default::default()
        });
        let gateway = gateway_with(Arc::new(MemoryCacheStore::new()), connector, CATALOG);

        let tools = gateway
            .get_or_build(&TenantId::default(), ManifestKind::Tools, &[provider("Foo")])
            .await
            .unwrap();
        assert_eq!(keys(&tools), vec!["calculator"]);
    }

    #[tokio::test]
    async fn test_catalog_failure_surfaces() {
        let gateway = gateway_with(Arc::new(MemoryCacheStore::new()), Arc::default(), "{}");
        let err = gateway
            .get_or_build(&TenantId::default(), ManifestKind::Plugins, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ManifestError::Catalog(CatalogError::NotAnArray(_))));
    }

    #[tokio::test]
    async fn test_invalidate_removes_both_kinds() {
        let store = Arc::new(MemoryCacheStore::new());
        let connector = Arc::new(CountingConnector::default());
        let gateway = gateway_with(store.clone(), connector.clone(), CATALOG);
        let tenant = TenantId::default();
        let providers = vec![provider("Foo")];

        for kind in ManifestKind::ALL {
            gateway.get_or_build(&tenant, kind, &providers).await.unwrap();
        }
        assert_eq!(gateway.invalidate(&tenant, &providers).await, 2);
        assert_eq!(gateway.invalidate(&tenant, &providers).await, 0);

        let before = connector.connects.load(Ordering::SeqCst);
        gateway
            .get_or_build(&tenant, ManifestKind::Plugins, &providers)
            .await
            .unwrap();
        assert_eq!(connector.connects.load(Ordering::SeqCst), before + 1);
    }
}
