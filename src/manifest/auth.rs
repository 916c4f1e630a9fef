//! Authentication readiness of tool descriptors.

use std::{collections::HashMap, sync::Arc};

use toolgate_mcp::{AuthRequirement, ToolDescriptor, USER_PROVIDED};

/// Where credential values are looked up by field name.
pub trait CredentialSource: Send + Sync {
    fn get(&self, field: &str) -> Option<String>;
}

/// Credentials from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn get(&self, field: &str) -> Option<String> {
        std::env::var(field).ok()
    }
}

/// Fixed credentials, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MapCredentials(HashMap<String, String>);

impl MapCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapCredentials {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl CredentialSource for MapCredentials {
    fn get(&self, field: &str) -> Option<String> {
        self.0.get(field).cloned()
    }
}

#[derive(Clone)]
pub struct AuthFieldResolver {
    source: Arc<dyn CredentialSource>,
}

impl AuthFieldResolver {
    pub fn new(source: Arc<dyn CredentialSource>) -> Self {
        Self { source }
    }

    /// Every requirement satisfied. A tool without requirements is never authenticated here.
    pub fn is_authenticated(&self, tool: &ToolDescriptor) -> bool {
        !tool.auth_config.is_empty()
            && tool
                .auth_config
                .iter()
                .all(|requirement| self.is_satisfied(requirement))
    }

    /// Any one of the `||` alternatives has a usable value.
    pub fn is_satisfied(&self, requirement: &AuthRequirement) -> bool {
        requirement
            .alternatives()
            .any(|field| self.has_value(field.trim()))
    }

    fn has_value(&self, field: &str) -> bool {
        if field.is_empty() {
            return false;
        }
        match self.source.get(field) {
            Some(value) => {
                let value = value.trim();
                !value.is_empty() && value != USER_PROVIDED
            }
            None => false,
        }
    }
}
