//! Per-tenant provider configuration.

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use toolgate_mcp::{ProviderConfig, TenantId};
use tracing::info;

use crate::config::GatewayConfig;

#[derive(Debug, Error)]
#[error("Tenant configuration unavailable for '{tenant}': {message}")]
pub struct TenantConfigError {
    pub tenant: TenantId,
    pub message: String,
}

/// A request's tenant mapped onto the identity its manifests are cached under.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTenant {
    /// The requested tenant when configured, the default tenant otherwise.
    pub tenant: TenantId,
    pub providers: Vec<ProviderConfig>,
}

#[async_trait]
pub trait TenantConfigSource: Send + Sync {
    /// Unknown tenants resolve to the default tenant and its providers.
    async fn resolve(&self, tenant: &TenantId) -> Result<ResolvedTenant, TenantConfigError>;

    async fn providers(&self, tenant: &TenantId) -> Result<Vec<ProviderConfig>, TenantConfigError> {
        Ok(self.resolve(tenant).await?.providers)
    }
}

/// Tenant provider lists held in memory, falling back to a shared default list.
#[derive(Debug, Default)]
pub struct InMemoryTenantConfig {
    fallback: Vec<ProviderConfig>,
    tenants: DashMap<TenantId, Vec<ProviderConfig>>,
}

impl InMemoryTenantConfig {
    pub fn new(fallback: Vec<ProviderConfig>) -> Self {
        Self {
            fallback,
            tenants: DashMap::new(),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        let source = Self::new(config.providers.clone());
        for (tenant, providers) in &config.tenants {
            source
                .tenants
                .insert(TenantId::new(tenant.as_str()), providers.clone());
        }
        source
    }

    /// Replace one tenant's providers. Returns the previous list, if any.
    pub fn set_providers(
        &self,
        tenant: TenantId,
        providers: Vec<ProviderConfig>,
    ) -> Option<Vec<ProviderConfig>> {
        info!(%tenant, providers = providers.len(), "Updated tenant providers");
        self.tenants.insert(tenant, providers)
    }

    /// Drop a tenant's own list so it falls back to the default providers.
    pub fn remove(&self, tenant: &TenantId) -> Option<Vec<ProviderConfig>> {
        self.tenants.remove(tenant).map(|(_, providers)| providers)
    }
}

#[async_trait]
impl TenantConfigSource for InMemoryTenantConfig {
    async fn resolve(&self, tenant: &TenantId) -> Result<ResolvedTenant, TenantConfigError> {
        let resolved = match self.tenants.get(tenant) {
            Some(providers) => ResolvedTenant {
                tenant: tenant.clone(),
                providers: providers.value().clone(),
            },
            None => ResolvedTenant {
                tenant: TenantId::default(),
                providers: self.fallback.clone(),
            },
        };
        Ok(resolved)
    }
}
