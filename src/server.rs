//! Application state assembly and the HTTP server.

use std::sync::Arc;

use axum::Router;
use data_connector::{create_cache_store, CacheStore};
use thiserror::Error;
use toolgate_mcp::{
    CachedServerTools, ProviderConfig, ProviderConnector, ProviderManager, RmcpConnector,
    TenantId,
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{
    config::GatewayConfig,
    manifest::{
        AuthFieldResolver, CatalogError, CredentialSource, EnvCredentials, ExecutorDefinitions,
        ManifestBuilder, ManifestCacheGateway, ManifestEnricher, ProviderIconEnricher,
        StaticToolRegistry, ToolFilter,
    },
    routers,
    tenants::{InMemoryTenantConfig, TenantConfigSource},
};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Cache store: {0}")]
    Cache(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

pub struct AppState {
    pub gateway: Arc<ManifestCacheGateway>,
    pub tenants: Arc<dyn TenantConfigSource>,
    /// Applied to every served manifest, in order.
    pub enrichers: Vec<Arc<dyn ManifestEnricher>>,
}

impl AppState {
    pub fn new(
        gateway: Arc<ManifestCacheGateway>,
        tenants: Arc<dyn TenantConfigSource>,
        enrichers: Vec<Arc<dyn ManifestEnricher>>,
    ) -> Self {
        Self {
            gateway,
            tenants,
            enrichers,
        }
    }

    /// Swap a tenant's providers and drop the manifests cached for its previous set.
    /// A tenant that was served the default manifest has nothing of its own to drop.
    pub async fn update_tenant_providers(
        &self,
        source: &InMemoryTenantConfig,
        tenant: TenantId,
        providers: Vec<ProviderConfig>,
    ) {
        match source.resolve(&tenant).await {
            Ok(previous) if previous.tenant == tenant => {
                self.gateway.invalidate(&tenant, &previous.providers).await;
            }
            Ok(_) => {}
            Err(e) => warn!(%tenant, error = %e, "Previous providers unknown, nothing invalidated"),
        }
        source.set_providers(tenant, providers);
    }
}

/// Everything the server needs, wired from configuration.
pub struct AppContext {
    pub state: Arc<AppState>,
    pub tenants: Arc<InMemoryTenantConfig>,
    pub store: Arc<dyn CacheStore>,
}

impl AppContext {
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ServerError> {
        let store = create_cache_store(&config.cache).map_err(ServerError::Cache)?;
        Ok(Self::with_parts(
            config,
            store,
            Arc::new(RmcpConnector::new()),
            Arc::new(EnvCredentials),
        ))
    }

    /// Wire the application around explicit collaborators.
    pub fn with_parts(
        config: &GatewayConfig,
        store: Arc<dyn CacheStore>,
        connector: Arc<dyn ProviderConnector>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        let registry = Arc::new(StaticToolRegistry::from_path(config.catalog_path.clone()));
        Self::with_registry(config, registry, store, connector, credentials)
    }

    pub fn with_registry(
        config: &GatewayConfig,
        registry: Arc<StaticToolRegistry>,
        store: Arc<dyn CacheStore>,
        connector: Arc<dyn ProviderConnector>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        let server_tools = Arc::new(CachedServerTools::new(
            store.clone(),
            config.server_tools_ttl(),
        ));
        let providers = Arc::new(ProviderManager::new(connector, server_tools));
        let definitions = Arc::new(ExecutorDefinitions::new(
            config.executor_key_set(),
            registry.clone(),
            providers.clone(),
        ));
        let builder = ManifestBuilder::new(AuthFieldResolver::new(credentials));
        let gateway = ManifestCacheGateway::new(
            store.clone(),
            registry,
            providers,
            definitions,
            builder,
        )
        .with_filter(ToolFilter::new(config.allow_list(), config.deny_list()))
        .with_ttl(Some(config.manifest_ttl()));

        let tenants = Arc::new(InMemoryTenantConfig::from_config(config));
        let enrichers: Vec<Arc<dyn ManifestEnricher>> = vec![Arc::new(ProviderIconEnricher)];
        let state = Arc::new(AppState::new(
            Arc::new(gateway),
            tenants.clone(),
            enrichers,
        ));

        Self {
            state,
            tenants,
            store,
        }
    }
}

pub fn build_app(state: Arc<AppState>) -> Router {
    routers::build_router(state).layer(TraceLayer::new_for_http())
}

/// Load the catalog, bind and serve until ctrl-c.
pub async fn startup(config: GatewayConfig, host: &str, port: u16) -> Result<(), ServerError> {
    let context = AppContext::from_config(&config)?;

    // A broken catalog is fatal before the first request.
    let catalog = context.state.gateway.registry().list().await?;
    info!(
        catalog = %config.catalog_path.display(),
        tools = catalog.len(),
        cache = context.store.backend(),
        default_providers = config.providers.len(),
        tenants = config.tenants.len(),
        "Gateway configured"
    );

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, build_app(context.state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
