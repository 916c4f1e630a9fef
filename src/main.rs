use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use toolgate::{
    config::GatewayConfig,
    logging::{init_logging, LoggingConfig},
    server,
};

#[derive(Parser, Debug)]
#[command(name = "toolgate", version, about = "Tool manifest gateway")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "TOOLGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "TOOLGATE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "TOOLGATE_PORT", default_value_t = 3080)]
    port: u16,

    /// Log level used when RUST_LOG is unset
    #[arg(long, env = "TOOLGATE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit JSON logs
    #[arg(long, env = "TOOLGATE_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&LoggingConfig {
        level: cli.log_level.clone(),
        json: cli.log_json,
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    let config = match &cli.config {
        Some(path) => GatewayConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => {
            tracing::info!("No config file given, using defaults");
            GatewayConfig::default()
        }
    };

    server::startup(config, &cli.host, cli.port).await?;
    Ok(())
}
