//! One-shot seeding of demo accounts and jobs into the configured store.

use helpdesk_backend::{
    config::{get_config, init_config},
    database::{seed, store::JsonStore},
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let store = JsonStore::open(&config.database_path).await?;
    let users = seed::seed_demo_users(&store).await?;
    let jobs = seed::seed_demo_jobs(&store).await?;

    info!(
        users,
        jobs,
        path = %config.database_path.display(),
        "seed complete"
    );
    Ok(())
}
