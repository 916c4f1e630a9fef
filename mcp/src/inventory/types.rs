//! Core types for tool manifests.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Separator between a tool name and its provider server in serialized plugin keys.
pub const PLUGIN_KEY_DELIMITER: &str = "::";

/// Separator between alternative credential fields inside one `authField`.
pub const AUTH_FIELD_SEPARATOR: &str = "||";

/// Credential placeholder meaning "each end user supplies their own value".
pub const USER_PROVIDED: &str = "user_provided";

/// Manifest-unique tool identifier: `tool` for built-ins, `tool::server` for provider tools.
///
/// Kept structured internally; the delimited form only exists when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginKey {
    base: String,
    server: Option<String>,
}

impl PluginKey {
    pub fn builtin(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            server: None,
        }
    }

    pub fn provider(base: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            server: Some(server.into()),
        }
    }

    /// Parse from the delimited form. Everything after the first delimiter is the server.
    pub fn parse(s: &str) -> Self {
        match s.split_once(PLUGIN_KEY_DELIMITER) {
            Some((base, server)) => Self::provider(base, server),
            None => Self::builtin(s),
        }
    }

    /// Tool name without the provider suffix. This is also the toolkit key a tool belongs to.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    pub fn is_provider(&self) -> bool {
        self.server.is_some()
    }
}

impl fmt::Display for PluginKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.server {
            Some(server) => write!(f, "{}{}{}", self.base, PLUGIN_KEY_DELIMITER, server),
            None => f.write_str(&self.base),
        }
    }
}

impl From<&str> for PluginKey {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl Serialize for PluginKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PluginKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// One credential requirement. `auth_field` may list alternatives joined by `||`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequirement {
    pub auth_field: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
}

impl AuthRequirement {
    pub fn new(auth_field: impl Into<String>) -> Self {
        let auth_field = auth_field.into();
        Self {
            label: auth_field.clone(),
            auth_field,
            description: String::new(),
        }
    }

    /// Alternative credential field names, any one of which satisfies this requirement.
    pub fn alternatives(&self) -> impl Iterator<Item = &str> {
        self.auth_field.split(AUTH_FIELD_SEPARATOR)
    }
}

fn default_true() -> bool {
    true
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A discoverable, invocable capability as served in a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub plugin_key: PluginKey,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub auth_config: Vec<AuthRequirement>,
    /// Computed on every build; values read from catalogs or caches are not trusted.
    #[serde(default)]
    pub authenticated: bool,
    /// Grouping of concrete tools rather than an invocable tool.
    #[serde(default, skip_serializing_if = "is_false")]
    pub toolkit: bool,
    #[serde(default = "default_true")]
    pub chat_menu: bool,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, plugin_key: PluginKey) -> Self {
        Self {
            name: name.into(),
            plugin_key,
            description: String::new(),
            icon: None,
            auth_config: Vec::new(),
            authenticated: false,
            toolkit: false,
            chat_menu: true,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_auth_config(mut self, auth_config: Vec<AuthRequirement>) -> Self {
        self.auth_config = auth_config;
        self
    }

    #[must_use]
    pub fn as_toolkit(mut self) -> Self {
        self.toolkit = true;
        self
    }

    pub fn is_provider_tool(&self) -> bool {
        self.plugin_key.is_provider()
    }

    pub fn server_name(&self) -> Option<&str> {
        self.plugin_key.server()
    }

    /// Reject descriptors missing the fields every manifest consumer relies on.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err(format!("'{}' has an empty name", self.plugin_key));
        }
        if self.plugin_key.base().trim().is_empty() {
            return Err(format!("'{}' has an empty plugin key", self.name));
        }
        if self.plugin_key.server().is_some_and(|s| s.trim().is_empty()) {
            return Err(format!("'{}' has an empty server name", self.plugin_key));
        }
        Ok(())
    }
}
