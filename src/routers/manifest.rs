//! Manifest endpoints.

use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use toolgate_mcp::TenantId;
use tracing::{debug, error, warn};

use crate::{
    manifest::{EnrichContext, ManifestKind},
    routers::error,
    server::AppState,
};

/// Header selecting the tenant whose manifest is served.
pub const HEADER_TENANT_ID: &str = "x-tenant-id";

const MAX_TENANT_ID_LEN: usize = 128;

/// Tenant from the request headers. Missing or blank selects the default tenant.
pub fn tenant_from_headers(headers: &HeaderMap) -> Result<TenantId, Response> {
    let Some(value) = headers.get(HEADER_TENANT_ID) else {
        return Ok(TenantId::default());
    };
    let raw = value
        .to_str()
        .map_err(|_| error::bad_request("invalid_tenant", "x-tenant-id must be ASCII"))?
        .trim();
    if raw.is_empty() {
        return Ok(TenantId::default());
    }
    let valid = raw.len() <= MAX_TENANT_ID_LEN
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        return Err(error::bad_request(
            "invalid_tenant",
            format!("Invalid tenant id '{}'", raw),
        ));
    }
    Ok(TenantId::new(raw))
}

/// `GET /plugins`: every known tool.
pub async fn list_plugins(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    serve_manifest(&state, &headers, ManifestKind::Plugins).await
}

/// `GET /tools`: runnable tools only.
pub async fn list_tools(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    serve_manifest(&state, &headers, ManifestKind::Tools).await
}

/// `GET /health`
pub async fn health() -> Response {
    Json(json!({"status": "ok"})).into_response()
}

async fn serve_manifest(state: &AppState, headers: &HeaderMap, kind: ManifestKind) -> Response {
    let requested = match tenant_from_headers(headers) {
        Ok(tenant) => tenant,
        Err(response) => return response,
    };

    let (tenant, providers) = match state.tenants.resolve(&requested).await {
        Ok(resolved) => {
            if resolved.tenant != requested {
                debug!(tenant = %requested, "Unknown tenant, serving the default manifest");
            }
            (resolved.tenant, resolved.providers)
        }
        Err(e) => {
            warn!(
                tenant = %requested,
                error = %e,
                "Serving the default manifest without providers"
            );
            (TenantId::default(), Vec::new())
        }
    };

    let mut tools = match state.gateway.get_or_build(&tenant, kind, &providers).await {
        Ok(tools) => tools,
        Err(e) => {
            error!(%tenant, %kind, error = %e, "Failed to build manifest");
            return error::manifest_error(&e);
        }
    };

    let ctx = EnrichContext {
        tenant: &tenant,
        kind,
        providers: &providers,
    };
    for enricher in &state.enrichers {
        tools = enricher.enrich(&ctx, tools);
        debug!(%tenant, enricher = enricher.name(), "Applied manifest enricher");
    }

    Json(tools).into_response()
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_TENANT_ID, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_default_tenant_when_missing_or_blank() {
        assert!(tenant_from_headers(&HeaderMap::new()).unwrap().is_default());
        assert!(tenant_from_headers(&headers("  ")).unwrap().is_default());
    }

    #[test]
    fn test_tenant_header_is_trimmed() {
        let tenant = tenant_from_headers(&headers(" acme-corp_1.eu ")).unwrap();
        assert_eq!(tenant.as_str(), "acme-corp_1.eu");
    }

    #[test]
    fn test_rejects_tenant_with_key_separator() {
        let response = tenant_from_headers(&headers("acme:g1")).unwrap_err();
        assert_eq!(
            error::extract_error_code_from_response(&response),
            "invalid_tenant"
        );
        assert!(tenant_from_headers(&headers(&"a".repeat(129))).is_err());
    }
}
