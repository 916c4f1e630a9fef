//! Manifest assembly: merge, dedupe, authenticate, filter.

use std::collections::{HashMap, HashSet};

use toolgate_mcp::{AuthRequirement, PluginKey, ProviderConfig, ToolDescriptor};
use tracing::{debug, warn};

use super::{auth::AuthFieldResolver, toolkit::has_member};

/// Allow/deny lists of plugin keys. A non-empty allow-list makes the deny-list inert.
#[derive(Debug, Clone, Default)]
pub struct ToolFilter {
    allow: HashSet<PluginKey>,
    deny: HashSet<PluginKey>,
}

impl ToolFilter {
    pub fn new(allow: HashSet<PluginKey>, deny: HashSet<PluginKey>) -> Self {
        Self { allow, deny }
    }

    pub fn keeps(&self, key: &PluginKey) -> bool {
        if !self.allow.is_empty() {
            self.allow.contains(key)
        } else {
            !self.deny.contains(key)
        }
    }
}

/// Servers whose `custom_user_vars` is present, mapped to the requirements it implies.
pub fn server_auth_overrides(
    configs: &[ProviderConfig],
) -> HashMap<String, Vec<AuthRequirement>> {
    configs
        .iter()
        .filter_map(|c| c.custom_auth_config().map(|auth| (c.name.clone(), auth)))
        .collect()
}

pub struct BuildInputs<'a> {
    pub static_tools: &'a [ToolDescriptor],
    pub provider_tools: &'a [ToolDescriptor],
    /// Keys with a runnable implementation.
    pub defined_keys: &'a HashSet<PluginKey>,
    pub filter: &'a ToolFilter,
    pub server_auth: &'a HashMap<String, Vec<AuthRequirement>>,
}

#[derive(Clone)]
pub struct ManifestBuilder {
    resolver: AuthFieldResolver,
}

impl ManifestBuilder {
    pub fn new(resolver: AuthFieldResolver) -> Self {
        Self { resolver }
    }

    /// Combined manifest: every known tool, deduplicated, authenticated and filtered.
    pub fn combine(
        &self,
        static_tools: &[ToolDescriptor],
        provider_tools: &[ToolDescriptor],
        filter: &ToolFilter,
    ) -> Vec<ToolDescriptor> {
        let merged = merge(provider_tools, static_tools);
        merged
            .into_iter()
            .map(|mut tool| {
                tool.authenticated = self.resolver.is_authenticated(&tool);
                tool
            })
            .filter(|tool| filter.keeps(&tool.plugin_key))
            .collect()
    }

    /// Filtered manifest: the combined manifest restricted to runnable tools and toolkits
    /// with at least one runnable member, with per-server credential overrides applied.
    pub fn build(&self, inputs: &BuildInputs<'_>) -> Vec<ToolDescriptor> {
        let combined = self.combine(inputs.static_tools, inputs.provider_tools, inputs.filter);
        let before = combined.len();

        let tools: Vec<ToolDescriptor> = combined
            .into_iter()
            .filter(|tool| {
                inputs.defined_keys.contains(&tool.plugin_key)
                    || (tool.toolkit && has_member(tool.plugin_key.base(), inputs.defined_keys))
            })
            .map(|tool| apply_server_auth(tool, inputs.server_auth))
            .collect();

        debug!(
            combined = before,
            kept = tools.len(),
            "Filtered manifest to defined tools"
        );
        dedupe(tools)
    }
}

fn apply_server_auth(
    mut tool: ToolDescriptor,
    server_auth: &HashMap<String, Vec<AuthRequirement>>,
) -> ToolDescriptor {
    let Some(auth) = tool.server_name().and_then(|s| server_auth.get(s)) else {
        return tool;
    };
    tool.authenticated = auth.is_empty();
    tool.auth_config = auth.clone();
    tool
}

/// Provider tools first so they win key collisions with built-ins.
fn merge(
    provider_tools: &[ToolDescriptor],
    static_tools: &[ToolDescriptor],
) -> Vec<ToolDescriptor> {
    let valid = provider_tools
        .iter()
        .chain(static_tools)
        .filter(|tool| match tool.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!("Dropping malformed tool descriptor: {}", e);
                false
            }
        })
        .cloned()
        .collect();
    dedupe(valid)
}

fn dedupe(tools: Vec<ToolDescriptor>) -> Vec<ToolDescriptor> {
    let mut seen = HashSet::with_capacity(tools.len());
    tools
        .into_iter()
        .filter(|tool| seen.insert(tool.plugin_key.clone()))
        .collect()
}
