//! Trend Hunter
//!
//! Polls market-data providers for new Solana tokens, clusters look-alike
//! names into topics and keeps market snapshots fresh.

use anyhow::Result;

use trend_hunter::adapters::cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if it exists (API keys go here, not in the TOML config)
    dotenvy::dotenv().ok();

    let app = cli::init();
    cli::execute(app).await
}
