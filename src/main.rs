mod api;
mod bootstrap;
mod config;
mod error;
mod execution;
mod funding;
mod middleware;
mod server;
mod settlement;

#[cfg(test)]
mod testing;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Initialize logging and tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug,escrow_settlement=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before anything reads the environment
    dotenv::dotenv().ok();
    init_tracing();

    info!("🚀 Starting escrow settlement service");

    let config = config::Config::from_env()?;
    let state = bootstrap::initialize_app_state(&config)?;

    // Create HTTP server
    let app = server::create_app(state, &config.cors_allowed_origins);

    // Run the Server
    server::run_server(app, &config.bind_address).await?;

    Ok(())
}
