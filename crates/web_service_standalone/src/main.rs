use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chat_core::{paths::default_data_dir, Config};
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Standalone SQL chat server
#[derive(Parser, Debug)]
#[command(name = "sql-chat-server", version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(long, env = "APP_PORT", default_value_t = 3000)]
    port: u16,

    /// Interface to bind
    #[arg(long, env = "APP_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Directory holding the persisted session (defaults to ~/.sql-chat)
    #[arg(long, env = "DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_line_number(true)
                .with_file(false),
        )
        .init();

    let args = Args::parse();
    let config = Config::new();
    let data_dir = args
        .data_dir
        .or_else(|| config.data_dir.clone())
        .unwrap_or_else(default_data_dir);

    tracing::info!(
        environment = ?config.environment,
        use_database = config.use_database,
        data_dir = %data_dir.display(),
        "Starting standalone web service..."
    );

    web_service::run(config, data_dir, &args.host, args.port)
        .await
        .map_err(|e| anyhow!("Failed to run web service: {e}"))
}
