use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::info;

use crate::{
    api::models::{
        FundAccountRequest, FundAccountResponse, HealthResponse, ReleaseSettlementRequest, ReleaseSettlementResponse,
    },
    config::NetworkKind,
    error::{AppError, AppResult},
    funding::FundingRelay,
    middleware::{CronAuth, RateLimitLayer, ValidatedJson},
    settlement::{SettlementOrchestrator, SettlementRequest},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// None when the escrow signer is not fully configured
    pub settlement: Option<Arc<SettlementOrchestrator>>,
    pub funding: Arc<FundingRelay>,
    pub cron_auth: CronAuth,
    pub fund_rate_limit: RateLimitLayer,
    pub network: NetworkKind,
}

/// Release escrowed funds for a finished consultation
/// POST /settlements/release
pub async fn release_settlement(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ReleaseSettlementRequest>,
) -> AppResult<Json<ReleaseSettlementResponse>> {
    let request = SettlementRequest::from(request);
    if request.consultation_id.is_empty() {
        return Err(AppError::BadRequest("consultationId is required".to_string()));
    }

    let orchestrator = state
        .settlement
        .clone()
        .ok_or_else(|| AppError::Config("escrow signer is not configured".to_string()))?;

    info!(
        "📥 Release requested for consultation {} ({} to {})",
        request.consultation_id, request.amount_raw, request.specialist_account
    );

    // Runs detached so a client disconnect cannot cancel between the two legs
    let report = tokio::spawn(async move { orchestrator.release(&request).await })
        .await
        .map_err(|e| AppError::Internal(format!("settlement task failed: {}", e)))??;

    Ok(Json(ReleaseSettlementResponse::from(report)))
}

/// Top up a freshly created implicit account
/// POST /accounts/fund
pub async fn fund_account(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<FundAccountRequest>,
) -> AppResult<Json<FundAccountResponse>> {
    let result = state.funding.fund(request.account_id.trim()).await?;

    info!("✅ Funded {} with {} yocto", result.account_id, result.amount_yocto);
    Ok(Json(FundAccountResponse::from(result)))
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            network: state.network.as_str().to_string(),
            settlement_enabled: state.settlement.is_some(),
            funding_enabled: state.funding.is_configured(),
        }),
    )
}
