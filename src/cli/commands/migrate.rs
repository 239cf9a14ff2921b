use anyhow::Context;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::manager;

pub async fn handle(config: AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = manager::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    manager::migrate(&pool).await.context("failed to apply migrations")?;

    match output_format {
        OutputFormat::Json => println!("{}", json!({ "migrated": true, "database": config.database.name })),
        OutputFormat::Text => println!("Migrations applied to {}", config.database.name),
    }
    Ok(())
}
