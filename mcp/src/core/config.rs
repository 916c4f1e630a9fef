//! Tool-provider configuration types.
//!
//! Defines per-tenant provider server configuration: transport, timeout and the
//! user-credential variables a server expects.

use std::{collections::BTreeMap, fmt, time::Duration};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::inventory::{AuthRequirement, PLUGIN_KEY_DELIMITER};

/// Tenant-scoped configuration for one tool-provider server.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Server name; becomes the namespace suffix of every tool key from this server.
    pub name: String,
    #[serde(flatten)]
    pub transport: McpTransport,

    /// Budget for handshake plus tool listing (milliseconds).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Credential fields each user must supply for this server.
    /// - absent: tools are authenticated by the generic resolver
    /// - present and empty: tools need no user credential at all
    /// - present and non-empty: tools require these fields from the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_user_vars: Option<BTreeMap<String, CustomUserVar>>,

    /// Icon shown for this server's tools when they carry none of their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_path: Option<String>,

    /// Whether this server's tools appear in the chat tool menu.
    #[serde(default = "default_true")]
    pub chat_menu: bool,
}

/// Display metadata for one user-supplied credential field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CustomUserVar {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum McpTransport {
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        envs: BTreeMap<String, String>,
    },
    Sse {
        url: String,
        /// Bearer token for Authorization header
        #[serde(skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },
    Streamable {
        url: String,
        /// Bearer token for Authorization header
        #[serde(skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },
}

impl fmt::Debug for McpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            McpTransport::Stdio {
                command,
                args,
                envs,
            } => f
                .debug_struct("Stdio")
                .field("command", command)
                .field("args", args)
                .field("envs", &format!("{} vars", envs.len()))
                .finish(),
            McpTransport::Sse { url, token } => f
                .debug_struct("Sse")
                .field("url", url)
                .field("token", &token.as_ref().map(|_| "****"))
                .finish(),
            McpTransport::Streamable { url, token } => f
                .debug_struct("Streamable")
                .field("url", url)
                .field("token", &token.as_ref().map(|_| "****"))
                .finish(),
        }
    }
}

impl McpTransport {
    pub fn url(&self) -> Option<&str> {
        match self {
            McpTransport::Sse { url, .. } | McpTransport::Streamable { url, .. } => Some(url),
            McpTransport::Stdio { .. } => None,
        }
    }

    pub fn is_remote(&self) -> bool {
        self.url().is_some()
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>, transport: McpTransport) -> Self {
        Self {
            name: name.into(),
            transport,
            timeout_ms: default_timeout_ms(),
            custom_user_vars: None,
            icon_path: None,
            chat_menu: true,
        }
    }

    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub fn with_custom_user_vars(mut self, vars: BTreeMap<String, CustomUserVar>) -> Self {
        self.custom_user_vars = Some(vars);
        self
    }

    #[must_use]
    pub fn with_icon_path(mut self, icon_path: impl Into<String>) -> Self {
        self.icon_path = Some(icon_path.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Auth requirements implied by `custom_user_vars`, one per variable, in key order.
    /// `None` when the server declares no custom variables.
    pub fn custom_auth_config(&self) -> Option<Vec<AuthRequirement>> {
        let vars = self.custom_user_vars.as_ref()?;
        Some(
            vars.iter()
                .map(|(field, var)| AuthRequirement {
                    auth_field: field.clone(),
                    label: var.title.clone().unwrap_or_else(|| field.clone()),
                    description: var.description.clone().unwrap_or_default(),
                })
                .collect(),
        )
    }

    pub fn validate(&self) -> Result<(), String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("provider name must not be empty".to_string());
        }
        if self.name.contains(PLUGIN_KEY_DELIMITER) {
            return Err(format!(
                "provider name '{}' must not contain '{}'",
                self.name, PLUGIN_KEY_DELIMITER
            ));
        }
        if self.timeout_ms == 0 {
            return Err(format!("provider '{}' timeout_ms must be > 0", self.name));
        }
        match &self.transport {
            McpTransport::Stdio { command, .. } if command.trim().is_empty() => {
                Err(format!("provider '{}' has an empty command", self.name))
            }
            McpTransport::Sse { url, .. } | McpTransport::Streamable { url, .. } => {
                let parsed = Url::parse(url)
                    .map_err(|e| format!("provider '{}' has invalid url: {}", self.name, e))?;
                match parsed.scheme() {
                    "http" | "https" => Ok(()),
                    scheme => Err(format!(
                        "provider '{}' url has unsupported scheme: {}",
                        self.name, scheme
                    )),
                }
            }
            McpTransport::Stdio { .. } => Ok(()),
        }
    }
}
