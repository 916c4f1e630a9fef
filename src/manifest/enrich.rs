//! Post-build manifest stages applied per response.

use toolgate_mcp::{ProviderConfig, TenantId, ToolDescriptor};

use super::gateway::ManifestKind;

/// What an enricher may consult about the request being served.
pub struct EnrichContext<'a> {
    pub tenant: &'a TenantId,
    pub kind: ManifestKind,
    pub providers: &'a [ProviderConfig],
}

/// One stage of the response pipeline. Stages run in the order they are registered.
pub trait ManifestEnricher: Send + Sync {
    fn name(&self) -> &'static str;

    fn enrich(&self, ctx: &EnrichContext<'_>, tools: Vec<ToolDescriptor>) -> Vec<ToolDescriptor>;
}

/// Gives provider tools without an icon their server's configured icon.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProviderIconEnricher;

impl ManifestEnricher for ProviderIconEnricher {
    fn name(&self) -> &'static str {
        "provider_icon"
    }

    fn enrich(
        &self,
        ctx: &EnrichContext<'_>,
        mut tools: Vec<ToolDescriptor>,
    ) -> Vec<ToolDescriptor> {
        for tool in tools.iter_mut().filter(|t| t.icon.is_none()) {
            let icon = tool.server_name().and_then(|server| {
                ctx.providers
                    .iter()
                    .find(|p| p.name == server)
                    .and_then(|p| p.icon_path.clone())
            });
            if icon.is_some() {
                tool.icon = icon;
            }
        }
        tools
    }
}
