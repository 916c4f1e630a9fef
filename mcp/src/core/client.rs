//! Provider channel: capability handshake and tool listing for one server.
//!
//! [`ProviderConnector`] is the seam between the provider manager and the wire.
//! [`RmcpConnector`] speaks MCP over stdio, SSE or streamable HTTP.

use std::time::Duration;

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use rmcp::{
    service::RunningService,
    transport::{
        sse_client::SseClientConfig, streamable_http_client::StreamableHttpClientTransportConfig,
        ConfigureCommandExt, SseClientTransport, StreamableHttpClientTransport, TokioChildProcess,
    },
    RoleClient, ServiceExt,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use super::config::{McpTransport, ProviderConfig};
use crate::error::{McpError, McpResult};

/// Type alias for MCP client
type McpClient = RunningService<RoleClient, ()>;

/// What a provider reported about itself during the capability handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerHandshake {
    pub protocol_version: String,
    pub server_name: String,
    pub server_version: String,
}

/// A tool exactly as a provider listed it, before namespacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderTool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Value,
}

impl ProviderTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: Value::Object(Default::default()),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Opens a session with a provider; connecting performs the capability handshake.
#[async_trait]
pub trait ProviderConnector: Send + Sync + 'static {
    async fn connect(&self, config: &ProviderConfig) -> McpResult<Box<dyn ProviderSession>>;
}

/// An initialized session with one provider.
#[async_trait]
pub trait ProviderSession: Send + Sync {
    fn handshake(&self) -> &ServerHandshake;

    async fn list_tools(&self) -> McpResult<Vec<ProviderTool>>;

    /// Close the session. Dropping a session also tears it down, without waiting.
    async fn close(self: Box<Self>);
}

/// MCP connector backed by the rmcp SDK.
#[derive(Debug, Clone, Default)]
pub struct RmcpConnector {
    /// Retry transient connection failures of remote transports.
    retry: bool,
}

impl RmcpConnector {
    pub fn new() -> Self {
        Self { retry: true }
    }

    /// Single attempt per connect; the caller's timeout is the only bound.
    pub fn without_retry() -> Self {
        Self { retry: false }
    }

    /// Connect with exponential backoff retry for remote servers
    async fn connect_with_retry(config: &ProviderConfig) -> McpResult<McpClient> {
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(250))
            .with_max_interval(Duration::from_secs(5))
            .with_max_elapsed_time(Some(config.timeout()))
            .build();

        backoff::future::retry(backoff, || async {
            match Self::connect_once(config).await {
                Ok(client) => Ok(client),
                Err(e) if e.is_permanent() => {
                    error!(
                        "Permanent error connecting to '{}': {} - not retrying",
                        config.name, e
                    );
                    Err(backoff::Error::permanent(e))
                }
                Err(e) => {
                    warn!("Failed to connect to '{}', retrying: {}", config.name, e);
                    Err(backoff::Error::transient(e))
                }
            }
        })
        .await
    }

    /// Internal implementation of server connection (stdio/sse/streamable)
    async fn connect_once(config: &ProviderConfig) -> McpResult<McpClient> {
        info!(
            "Connecting to provider '{}' via {:?}",
            config.name, config.transport
        );

        match &config.transport {
            McpTransport::Stdio {
                command,
                args,
                envs,
            } => {
                let transport = TokioChildProcess::new(
                    tokio::process::Command::new(command).configure(|cmd| {
                        cmd.args(args)
                            .envs(envs.iter())
                            .stderr(std::process::Stdio::inherit());
                    }),
                )
                .map_err(|e| McpError::Transport(format!("create stdio transport: {}", e)))?;

                ().serve(transport).await.map_err(|e| {
                    McpError::ConnectionFailed(format!("initialize stdio client: {}", e))
                })
            }

            McpTransport::Sse { url, token } => {
                let mut builder =
                    reqwest::Client::builder().connect_timeout(Duration::from_secs(10));

                if let Some(token) = token {
                    let mut headers = reqwest::header::HeaderMap::new();
                    headers.insert(
                        reqwest::header::AUTHORIZATION,
                        format!("Bearer {}", token)
                            .parse()
                            .map_err(|e| McpError::Transport(format!("auth token: {}", e)))?,
                    );
                    builder = builder.default_headers(headers);
                }

                let client = builder
                    .build()
                    .map_err(|e| McpError::Transport(format!("build HTTP client: {}", e)))?;

                let cfg = SseClientConfig {
                    sse_endpoint: url.clone().into(),
                    ..Default::default()
                };

                let transport = SseClientTransport::start_with_client(client, cfg)
                    .await
                    .map_err(|e| McpError::ConnectionFailed(format!("open SSE stream: {}", e)))?;

                ().serve(transport).await.map_err(|e| {
                    McpError::ConnectionFailed(format!("initialize SSE client: {}", e))
                })
            }

            McpTransport::Streamable { url, token } => {
                let transport = if let Some(tok) = token {
                    let mut cfg = StreamableHttpClientTransportConfig::with_uri(url.as_str());
                    cfg.auth_header = Some(tok.to_string());
                    StreamableHttpClientTransport::from_config(cfg)
                } else {
                    StreamableHttpClientTransport::from_uri(url.as_str())
                };

                ().serve(transport).await.map_err(|e| {
                    McpError::ConnectionFailed(format!("initialize streamable client: {}", e))
                })
            }
        }
    }

    fn handshake_of(client: &McpClient) -> ServerHandshake {
        let Some(info) = client.peer().peer_info() else {
            return ServerHandshake::default();
        };
        let protocol_version = serde_json::to_value(&info.protocol_version)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        ServerHandshake {
            protocol_version,
            server_name: info.server_info.name.clone(),
            server_version: info.server_info.version.clone(),
        }
    }
}

#[async_trait]
impl ProviderConnector for RmcpConnector {
    async fn connect(&self, config: &ProviderConfig) -> McpResult<Box<dyn ProviderSession>> {
        let client = if self.retry && config.transport.is_remote() {
            Self::connect_with_retry(config).await?
        } else {
            Self::connect_once(config).await?
        };
        let handshake = Self::handshake_of(&client);
        Ok(Box::new(RmcpSession { client, handshake }))
    }
}

struct RmcpSession {
    client: McpClient,
    handshake: ServerHandshake,
}

#[async_trait]
impl ProviderSession for RmcpSession {
    fn handshake(&self) -> &ServerHandshake {
        &self.handshake
    }

    async fn list_tools(&self) -> McpResult<Vec<ProviderTool>> {
        let tools = self
            .client
            .peer()
            .list_all_tools()
            .await
            .map_err(|e| McpError::Protocol(format!("list tools: {}", e)))?;

        Ok(tools
            .into_iter()
            .map(|t| ProviderTool {
                name: t.name.to_string(),
                description: t.description.map(|d| d.to_string()),
                input_schema: Value::Object((*t.input_schema).clone()),
            })
            .collect())
    }

    async fn close(self: Box<Self>) {
        let RmcpSession { client, handshake } = *self;
        if let Err(e) = client.cancel().await {
            warn!(
                "Error disconnecting from provider '{}': {}",
                handshake.server_name, e
            );
        }
    }
}
