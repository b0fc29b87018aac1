use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    api::handler::{fund_account, health_check, release_settlement, AppState},
    middleware::{create_cors_layer, rate_limit_middleware, require_cron_secret},
};

pub fn create_app(state: AppState, cors_origins: &[String]) -> Router {
    info!("⚙️ Setting up HTTP routes...");

    // Scheduler-only: settlement moves escrowed funds
    let settlement_routes = Router::new()
        .route("/settlements/release", post(release_settlement))
        .route_layer(from_fn_with_state(state.cron_auth.clone(), require_cron_secret));

    let funding_routes = Router::new()
        .route("/accounts/fund", post(fund_account))
        .route_layer(from_fn_with_state(state.fund_rate_limit.clone(), rate_limit_middleware));

    let app = Router::new()
        // Public health check endpoint
        .route("/health", get(health_check))
        .merge(settlement_routes)
        .merge(funding_routes)
        .layer(create_cors_layer(cors_origins))
        // Add request tracing
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("✓ HTTP routes configured");
    app
}

pub async fn run_server(app: Router, bind_address: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("🌐 Server listening on: {}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
