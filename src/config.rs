//! Gateway configuration loaded from YAML.

use std::{
    collections::{BTreeMap, HashSet},
    path::{Path, PathBuf},
    time::Duration,
};

use data_connector::CacheConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use toolgate_mcp::{PluginKey, ProviderConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// JSON file holding the built-in tool catalog.
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    #[serde(default)]
    pub cache: CacheConfig,

    /// TTL of cached manifests.
    #[serde(default = "default_manifest_ttl_secs")]
    pub manifest_ttl_secs: u64,

    #[serde(default = "default_server_tools_ttl_secs")]
    pub server_tools_ttl_secs: u64,

    /// Allow-list of plugin keys. When non-empty, `filtered_tools` is ignored.
    #[serde(default)]
    pub included_tools: Vec<String>,

    /// Deny-list of plugin keys.
    #[serde(default)]
    pub filtered_tools: Vec<String>,

    /// Built-in plugin keys with a runnable implementation.
    /// Unset treats every non-toolkit catalog entry as runnable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor_keys: Option<Vec<String>>,

    /// Providers for tenants without an entry in `tenants`.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    #[serde(default)]
    pub tenants: BTreeMap<String, Vec<ProviderConfig>>,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("config/manifest.json")
}

fn default_manifest_ttl_secs() -> u64 {
    3600
}

fn default_server_tools_ttl_secs() -> u64 {
    300
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            cache: CacheConfig::default(),
            manifest_ttl_secs: default_manifest_ttl_secs(),
            server_tools_ttl_secs: default_server_tools_ttl_secs(),
            included_tools: Vec::new(),
            filtered_tools: Vec::new(),
            executor_keys: None,
            providers: Vec::new(),
            tenants: BTreeMap::new(),
        }
    }
}

impl GatewayConfig {
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&raw)?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.cache.validate().map_err(ConfigError::Invalid)?;

        if self.server_tools_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "server_tools_ttl_secs must be > 0".to_string(),
            ));
        }
        if self.manifest_ttl_secs == 0 {
            return Err(ConfigError::Invalid("manifest_ttl_secs must be > 0".to_string()));
        }

        Self::validate_providers("default", &self.providers)?;
        for (tenant, providers) in &self.tenants {
            if tenant.trim().is_empty() {
                return Err(ConfigError::Invalid("tenant id must not be empty".to_string()));
            }
            Self::validate_providers(tenant, providers)?;
        }
        Ok(())
    }

    fn validate_providers(tenant: &str, providers: &[ProviderConfig]) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for provider in providers {
            provider
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("tenant '{}': {}", tenant, e)))?;
            if !seen.insert(provider.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "tenant '{}': duplicate provider '{}'",
                    tenant, provider.name
                )));
            }
        }
        Ok(())
    }

    pub fn manifest_ttl(&self) -> Duration {
        Duration::from_secs(self.manifest_ttl_secs)
    }

    pub fn server_tools_ttl(&self) -> Duration {
        Duration::from_secs(self.server_tools_ttl_secs)
    }

    pub fn allow_list(&self) -> HashSet<PluginKey> {
        self.included_tools.iter().map(|k| PluginKey::parse(k)).collect()
    }

    pub fn deny_list(&self) -> HashSet<PluginKey> {
        self.filtered_tools.iter().map(|k| PluginKey::parse(k)).collect()
    }

    pub fn executor_key_set(&self) -> Option<HashSet<PluginKey>> {
        self.executor_keys
            .as_ref()
            .map(|keys| keys.iter().map(|k| PluginKey::parse(k)).collect())
    }
}
