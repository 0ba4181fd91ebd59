//! Ensure the secondary indexes exist.
//!
//! Uses the same repository selection as the server (`repository.toml`
//! overridden by `REPOSITORY_TYPE` / `MONGODB_URI`).

use anyhow::Context;
use tracing::info;

use dreamers::db::{RepositoryConfig, RepositoryFactory};
use dreamers::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let settings = RepositoryConfig::load()?;
    let repository = RepositoryFactory::from_repository_config(&settings)
        .await
        .context("Failed to initialize repository")?;

    let indexes = repository
        .ensure_indexes()
        .await
        .context("Failed to ensure indexes")?;

    for name in &indexes {
        info!(index = %name, "index ensured");
    }
    println!("Indexes ensured: {}", indexes.join(", "));
    Ok(())
}
