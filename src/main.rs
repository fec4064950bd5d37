use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use replygate::config::load_config;
use replygate::gateway;
use replygate::outbound::CloudApiChannel;
use replygate::pipeline::IntakePipeline;
use replygate::settings::SettingsHandle;
use replygate::store::MemoryStore;

#[derive(Parser)]
#[command(name = "replygate", version, about = "WhatsApp auto-reply gateway")]
struct Cli {
    /// Path to the config file (default: ./replygate.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind host, overrides the config file
    #[arg(long)]
    host: Option<String>,

    /// Bind port, overrides the config file
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".parse().unwrap());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let host = cli.host.unwrap_or_else(|| config.server.host.clone());
    let port = cli.port.unwrap_or(config.server.port);

    let store = Arc::new(MemoryStore::new());
    let settings = SettingsHandle::new(store.clone());
    let outbound = Arc::new(CloudApiChannel::new());
    let pipeline = Arc::new(IntakePipeline::new(store, settings, outbound));

    let (handle, _state) = gateway::start(&host, port, pipeline, &config.webhook).await?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
        res = handle => {
            if let Err(e) = res {
                tracing::error!("gateway task failed: {}", e);
            }
        }
    }

    Ok(())
}
