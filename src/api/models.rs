use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    funding::{FundingReceipt, FundingResult},
    settlement::{SettlementReport, SettlementRequest, SettlementStatus},
};

// ========== REQUEST MODELS ==========

/// Body of POST /settlements/release
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSettlementRequest {
    #[validate(length(min = 1, message = "consultationId is required"))]
    pub consultation_id: String,

    /// Base-10 integer in the token's smallest unit
    #[validate(length(min = 1, message = "amountRaw is required"))]
    pub amount_raw: String,

    #[validate(length(min = 2, max = 64, message = "specialistAccount must be 2-64 characters"))]
    pub specialist_account: String,
}

impl From<ReleaseSettlementRequest> for SettlementRequest {
    fn from(request: ReleaseSettlementRequest) -> Self {
        SettlementRequest {
            consultation_id: request.consultation_id.trim().to_string(),
            amount_raw: request.amount_raw.trim().to_string(),
            specialist_account: request.specialist_account.trim().to_string(),
        }
    }
}

/// Body of POST /accounts/fund
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FundAccountRequest {
    #[validate(length(min = 1, message = "accountId is required"))]
    pub account_id: String,
}

// ========== RESPONSE MODELS ==========

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSettlementResponse {
    pub success: bool,
    pub consultation_id: String,
    /// Same as `specialist_tx_hash`, kept for older callers
    pub tx_hash: Option<String>,
    pub specialist_tx_hash: Option<String>,
    /// None when the fee rounded down to zero and no transfer was needed
    pub platform_tx_hash: Option<String>,
    pub platform_fee_raw: String,
    pub specialist_amount_raw: String,
    pub status: SettlementStatus,
    pub replayed: bool,
}

impl From<SettlementReport> for ReleaseSettlementResponse {
    fn from(report: SettlementReport) -> Self {
        let specialist_tx_hash = report.specialist_tx_hash().map(str::to_string);
        Self {
            success: report.status == SettlementStatus::Complete,
            tx_hash: specialist_tx_hash.clone(),
            specialist_tx_hash,
            platform_tx_hash: report.platform_tx_hash().map(str::to_string),
            platform_fee_raw: report.split.platform_fee_raw.to_string(),
            specialist_amount_raw: report.split.specialist_amount_raw.to_string(),
            status: report.status,
            replayed: report.replayed,
            consultation_id: report.consultation_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundAccountResponse {
    pub success: bool,
    #[serde(flatten)]
    pub receipt: FundingReceipt,
    pub account_id: String,
    /// Yocto NEAR as a decimal string
    pub amount: String,
}

impl From<FundingResult> for FundAccountResponse {
    fn from(result: FundingResult) -> Self {
        Self {
            success: true,
            receipt: result.receipt,
            account_id: result.account_id,
            amount: result.amount_yocto.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub network: String,
    pub settlement_enabled: bool,
    pub funding_enabled: bool,
}
