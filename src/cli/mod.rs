pub mod commands;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "rest-skeleton")]
#[command(about = "User, role and permission REST API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Start the HTTP server")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides APP_PORT)")]
        port: Option<u16>,

        #[arg(long, help = "Keep data in process memory instead of PostgreSQL")]
        in_memory: bool,

        #[arg(long, help = "Seed default roles, permissions and fake users before serving")]
        seed: bool,
    },

    #[command(about = "Apply database migrations")]
    Migrate,

    #[command(about = "Seed default roles, permissions and fake users")]
    Seed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Serve { port, in_memory, seed } => {
            commands::serve::handle(config, port, in_memory, seed).await
        }
        Commands::Migrate => commands::migrate::handle(config, output_format).await,
        Commands::Seed => commands::seed::handle(config, output_format).await,
    }
}
