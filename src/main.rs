use clap::Parser;
use tracing_subscriber::EnvFilter;

use rest_skeleton::cli::{self, Cli};
use rest_skeleton::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so local runs pick up DATABASE_URL, APP_PRIVATE_KEY, etc.
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env();

    let default_level = if config.app.debug_mode { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();
    tracing::info!("Starting in {:?} mode", config.environment);

    let cli = Cli::parse();
    if let Err(e) = cli::run(cli, config).await {
        match std::env::var("CLI_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => eprintln!("Error: {e:?}"),
            _ => eprintln!("Error: {e}"),
        }
        std::process::exit(1);
    }

    Ok(())
}
