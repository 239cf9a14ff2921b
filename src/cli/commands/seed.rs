use anyhow::Context;
use std::sync::Arc;

use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::{manager, PgStore};
use crate::entity::{BcryptHasher, SecretHasher};
use crate::seeds;

pub async fn handle(config: AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = manager::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    let store = PgStore::new(pool);
    let hasher: Arc<dyn SecretHasher> = Arc::new(BcryptHasher::new(config.security.bcrypt_cost));

    let report = seeds::run(&store, hasher).await.context("seeding failed")?;

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
        OutputFormat::Text => println!(
            "Seeded {} permissions, {} roles and {} users",
            report.permissions, report.roles, report.users
        ),
    }
    Ok(())
}
