use dotenv::dotenv;
use std::env;

use leekboard::bot::{self, EngineContext};
use leekboard::config::EngineConfig;
use leekboard::db::SqliteRepository;

use anyhow::{Context, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Begin logger
    env_logger::init();

    // Load discord bot token and engine overrides
    dotenv().ok();
    let config = EngineConfig::from_env().context("Invalid engine configuration in environment.")?;
    let db_path = env::var("LEEKBOARD_DB").unwrap_or_else(|_| String::from("leek.db"));

    // Initialize database
    SqliteRepository::open(&db_path)
        .with_context(|| format!("Could not open database at {db_path}"))?;
    log::info!("Using database {db_path}");

    bot::run_bot(EngineContext { db_path: db_path.into(), config }).await
}
