//! Shared fixtures for HTTP-level tests.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use data_connector::MemoryCacheStore;
use http_body_util::BodyExt;
use serde_json::Value;
use toolgate::{
    build_app,
    config::GatewayConfig,
    manifest::{MapCredentials, StaticToolRegistry},
    AppContext,
};
use toolgate_mcp::{
    McpError, McpResult, McpTransport, ProviderConfig, ProviderConnector, ProviderSession,
    ProviderTool, ServerHandshake,
};
use tower::ServiceExt;

pub const CATALOG: &str = r#"[
    {"name": "Calculator", "pluginKey": "calculator", "description": "Evaluate math"},
    {"name": "Google", "pluginKey": "google",
     "authConfig": [
        {"authField": "GOOGLE_CSE_ID", "label": "CSE id", "description": ""},
        {"authField": "GOOGLE_KEY||GOOGLE_API_KEY", "label": "API key", "description": ""}
     ]},
    {"name": "DALL-E", "pluginKey": "dalle", "authConfig": [
        {"authField": "DALLE_API_KEY", "label": "Key", "description": ""}
    ]},
    {"name": "Image Generation", "pluginKey": "image_gen", "toolkit": true},
    {"name": "Web Browsing", "pluginKey": "web", "toolkit": true},
    {"pluginKey": "nameless"}
]"#;

#[derive(Clone)]
pub enum Server {
    Tools(Vec<&'static str>),
    Slow(Duration, Vec<&'static str>),
    Down,
}

/// Connector answering from a fixed table of servers.
#[derive(Default)]
pub struct MockConnector {
    servers: HashMap<String, Server>,
    pub connects: AtomicUsize,
}

impl MockConnector {
    pub fn with(mut self, name: &str, server: Server) -> Self {
        self.servers.insert(name.to_string(), server);
        self
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

struct MockSession {
    handshake: ServerHandshake,
    tools: Vec<ProviderTool>,
}

#[async_trait]
impl ProviderSession for MockSession {
    fn handshake(&self) -> &ServerHandshake {
        &self.handshake
    }

    async fn list_tools(&self) -> McpResult<Vec<ProviderTool>> {
        Ok(self.tools.clone())
    }

    async fn close(self: Box<Self>) {}
}

#[async_trait]
impl ProviderConnector for MockConnector {
    async fn connect(&self, config: &ProviderConfig) -> McpResult<Box<dyn ProviderSession>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let names = match self.servers.get(&config.name) {
            Some(Server::Tools(names)) => names.clone(),
            Some(Server::Slow(delay, names)) => {
                tokio::time::sleep(*delay).await;
                names.clone()
            }
            Some(Server::Down) | None => {
                return Err(McpError::ConnectionFailed(format!(
                    "{} is unreachable",
                    config.name
                )))
            }
        };
        Ok(Box::new(MockSession {
            handshake: ServerHandshake {
                protocol_version: "2025-03-26".to_string(),
                server_name: config.name.clone(),
                server_version: "0.1.0".to_string(),
            },
            tools: names
                .into_iter()
                .map(|n| ProviderTool::new(n).with_description(format!("{} tool", n)))
                .collect(),
        }))
    }
}

pub fn provider(name: &str) -> ProviderConfig {
    ProviderConfig::new(
        name,
        McpTransport::Streamable {
            url: format!("http://{}.internal/mcp", name.to_lowercase()),
            token: None,
        },
    )
}

pub struct TestApp {
    pub app: Router,
    pub context: AppContext,
    pub connector: Arc<MockConnector>,
    pub store: Arc<MemoryCacheStore>,
}

pub fn test_app(
    config: GatewayConfig,
    connector: MockConnector,
    credentials: MapCredentials,
) -> TestApp {
    test_app_with_catalog(config, connector, credentials, CATALOG)
}

pub fn test_app_with_catalog(
    config: GatewayConfig,
    connector: MockConnector,
    credentials: MapCredentials,
    catalog: &str,
) -> TestApp {
    let connector = Arc::new(connector);
    let store = Arc::new(MemoryCacheStore::new());
    let context = AppContext::with_registry(
        &config,
        Arc::new(StaticToolRegistry::from_json(catalog)),
        store.clone(),
        connector.clone(),
        Arc::new(credentials),
    );
    TestApp {
        app: build_app(context.state.clone()),
        context,
        connector,
        store,
    }
}

pub async fn get_json(app: &Router, uri: &str, tenant: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder().method("GET").uri(uri);
    if let Some(tenant) = tenant {
        request = request.header("x-tenant-id", tenant);
    }
    let request = request
        .body(Body::empty())
        .expect("request should build");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    let json = serde_json::from_slice(&bytes).expect("body should be JSON");
    (status, json)
}

pub fn plugin_keys(manifest: &Value) -> Vec<String> {
    manifest
        .as_array()
        .expect("manifest should be an array")
        .iter()
        .map(|t| t["pluginKey"].as_str().unwrap_or_default().to_string())
        .collect()
}

pub fn find<'a>(manifest: &'a Value, key: &str) -> &'a Value {
    manifest
        .as_array()
        .and_then(|tools| tools.iter().find(|t| t["pluginKey"] == key))
        .unwrap_or_else(|| panic!("{} not in manifest", key))
}
