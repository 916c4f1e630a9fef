//! Built-in tool catalog.
//!
//! Loaded once from a JSON array and constant for the rest of the process lifetime.

use std::{path::PathBuf, sync::Arc};

use serde_json::Value;
use thiserror::Error;
use tokio::sync::OnceCell;
use toolgate_mcp::{PluginKey, ToolDescriptor};
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read tool catalog {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Tool catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Tool catalog must be a JSON array, found {0}")]
    NotAnArray(&'static str),
}

#[derive(Debug, Clone)]
enum CatalogSource {
    File(PathBuf),
    Inline(String),
}

#[derive(Debug)]
pub struct StaticToolRegistry {
    source: CatalogSource,
    tools: OnceCell<Arc<Vec<ToolDescriptor>>>,
}

impl StaticToolRegistry {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: CatalogSource::File(path.into()),
            tools: OnceCell::new(),
        }
    }

    pub fn from_json(raw: impl Into<String>) -> Self {
        Self {
            source: CatalogSource::Inline(raw.into()),
            tools: OnceCell::new(),
        }
    }

    /// Catalog entries in file order. A failed load is retried on the next call.
    pub async fn list(&self) -> Result<Arc<Vec<ToolDescriptor>>, CatalogError> {
        self.tools
            .get_or_try_init(|| async {
                let raw = match &self.source {
                    CatalogSource::File(path) => {
                        tokio::fs::read_to_string(path)
                            .await
                            .map_err(|source| CatalogError::Io {
                                path: path.clone(),
                                source,
                            })?
                    }
                    CatalogSource::Inline(raw) => raw.clone(),
                };
                let tools = parse_catalog(&raw)?;
                info!(count = tools.len(), "Loaded tool catalog");
                Ok(Arc::new(tools))
            })
            .await
            .cloned()
    }

    /// Keys of concrete (non-toolkit) catalog entries.
    pub async fn concrete_keys(&self) -> Result<Vec<PluginKey>, CatalogError> {
        Ok(self
            .list()
            .await?
            .iter()
            .filter(|t| !t.toolkit)
            .map(|t| t.plugin_key.clone())
            .collect())
    }
}

/// Decode a catalog document. Bad entries are dropped; a non-array document is an error.
pub fn parse_catalog(raw: &str) -> Result<Vec<ToolDescriptor>, CatalogError> {
    let doc: Value = serde_json::from_str(raw)?;
    let entries = match doc {
        Value::Array(entries) => entries,
        other => return Err(CatalogError::NotAnArray(json_kind(&other))),
    };

    let mut tools = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let mut tool = match serde_json::from_value::<ToolDescriptor>(entry) {
            Ok(tool) => tool,
            Err(e) => {
                warn!(index, error = %e, "Dropping malformed catalog entry");
                continue;
            }
        };
        if let Err(e) = tool.validate() {
            warn!(index, "Dropping malformed catalog entry: {}", e);
            continue;
        }
        tool.authenticated = false;
        tools.push(tool);
    }
    Ok(tools)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
