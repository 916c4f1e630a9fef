//! Tool-provider error types.
//!
//! Every variant is recoverable at the provider boundary: a failing provider
//! contributes no tools to a manifest build.

use thiserror::Error;

pub type McpResult<T> = Result<T, McpError>;

#[derive(Debug, Error)]
pub enum McpError {
    /// Provider could not be reached or refused the handshake.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider answered with something other than a valid tool listing.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Provider '{server}' timed out after {timeout_ms}ms")]
    Timeout { server: String, timeout_ms: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed tool descriptor: {0}")]
    MalformedTool(String),
}

impl McpError {
    /// Errors that retrying the same connection attempt cannot fix.
    pub fn is_permanent(&self) -> bool {
        match self {
            McpError::Config(_) | McpError::Transport(_) | McpError::MalformedTool(_) => true,
            McpError::Protocol(_) | McpError::Timeout { .. } => false,
            McpError::ConnectionFailed(msg) => {
                msg.contains("initialize")
                    || msg.contains("connection closed")
                    || msg.contains("invalid URL")
                    || msg.contains("not found")
            }
        }
    }
}
