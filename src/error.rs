use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use near_primitives::account::id::ParseAccountError;
use serde::Serialize;
use thiserror::Error;

use crate::settlement::LegKind;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Settlement error: {0}")]
    Settlement(#[from] SettlementError),

    #[error("Signer error: {0}")]
    Signer(#[from] SignerError),

    #[error("Funding error: {0}")]
    Funding(#[from] FundingError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("External error: {0}")]
    ExternalError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Settlement pipeline errors
#[derive(Error, Debug)]
pub enum SettlementError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid account: {0}")]
    InvalidAccount(String),

    #[error("Registration failed for {account}: {message}")]
    RegistrationFailed { account: String, message: String },

    #[error("Specialist transfer failed: {0}")]
    SpecialistTransferFailed(String),

    #[error("Specialist transfer {tx_hash} has an unknown outcome, reconcile before retrying: {message}")]
    SpecialistTransferUnconfirmed {
        consultation_id: String,
        tx_hash: String,
        message: String,
    },

    #[error("Specialist paid ({specialist_tx_hash}) but platform fee transfer failed: {message}")]
    PartiallySettled {
        consultation_id: String,
        specialist_tx_hash: String,
        message: String,
    },

    #[error("Settlement already in progress for consultation {0}")]
    InProgress(String),

    #[error("Consultation {consultation_id} was journaled with different terms: {message}")]
    Conflict {
        consultation_id: String,
        message: String,
    },

    #[error("Journal error: {0}")]
    Journal(String),
}

/// Signing capability errors
#[derive(Error, Debug)]
pub enum SignerError {
    #[error("Account {0} has no access keys")]
    NoAccessKey(String),

    #[error("Operation not implemented by this signer: {0}")]
    NotImplemented(&'static str),

    #[error("Invalid signature from signer: {0}")]
    InvalidSignature(String),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Remote signer request failed: {0}")]
    Upstream(String),

    #[error("Failed to serialize transaction: {0}")]
    Serialization(String),
}

/// Account funding errors
#[derive(Error, Debug)]
pub enum FundingError {
    #[error("Invalid implicit account id: {0}")]
    InvalidAccountId(String),

    #[error("No funding strategy configured")]
    NotConfigured,

    #[error("Faucet request failed: {0}")]
    Faucet(String),

    #[error("Funding relay failed: {0}")]
    Relay(String),
}

/// Ledger RPC errors
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("RPC request failed: {0}")]
    Rpc(String),

    #[error("Unexpected query response: {0}")]
    UnexpectedResponse(String),

    /// Rejected by the node or failed on chain; nothing was transferred
    #[error("Transaction {tx_hash} failed: {message}")]
    TransactionFailed { tx_hash: String, message: String },

    /// Broadcast was attempted but finality was never observed
    #[error("Transaction {tx_hash} outcome unknown: {message}")]
    Unconfirmed { tx_hash: String, message: String },
}

/// API error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Body returned when only the specialist leg reached finality
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSettlementResponse {
    pub success: bool,
    pub status: &'static str,
    pub consultation_id: String,
    pub specialist_tx_hash: String,
    pub platform_tx_hash: Option<String>,
    pub error: String,
    pub details: serde_json::Value,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Settlement(SettlementError::PartiallySettled {
            consultation_id,
            specialist_tx_hash,
            message,
        }) = self
        {
            let body = PartialSettlementResponse {
                success: false,
                status: "partially_settled",
                consultation_id,
                specialist_tx_hash,
                platform_tx_hash: None,
                error: "Platform fee transfer failed after specialist payout".to_string(),
                details: serde_json::json!({
                    "failedLeg": LegKind::PlatformFee,
                    "message": message,
                }),
            };
            return (StatusCode::MULTI_STATUS, Json(body)).into_response();
        }

        let message = self.to_string();
        let (status, error_code, details) = match &self {
            AppError::Settlement(SettlementError::InvalidAmount(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_AMOUNT", None)
            }
            AppError::Settlement(SettlementError::InvalidAccount(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_ACCOUNT", None)
            }
            AppError::Settlement(SettlementError::InProgress(id)) => (
                StatusCode::CONFLICT,
                "SETTLEMENT_IN_PROGRESS",
                Some(serde_json::json!({ "consultationId": id })),
            ),
            AppError::Settlement(SettlementError::Conflict { consultation_id, .. }) => (
                StatusCode::CONFLICT,
                "SETTLEMENT_CONFLICT",
                Some(serde_json::json!({ "consultationId": consultation_id })),
            ),
            AppError::Settlement(SettlementError::RegistrationFailed { account, message }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "REGISTRATION_FAILED",
                Some(serde_json::json!({ "account": account, "upstream": message })),
            ),
            AppError::Settlement(SettlementError::SpecialistTransferFailed(upstream)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SPECIALIST_TRANSFER_FAILED",
                Some(serde_json::json!({
                    "failedLeg": LegKind::Specialist,
                    "upstream": upstream,
                })),
            ),
            AppError::Settlement(SettlementError::SpecialistTransferUnconfirmed {
                consultation_id,
                tx_hash,
                ..
            }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SPECIALIST_TRANSFER_UNCONFIRMED",
                Some(serde_json::json!({
                    "consultationId": consultation_id,
                    "failedLeg": LegKind::Specialist,
                    "txHash": tx_hash,
                })),
            ),
            AppError::Funding(FundingError::InvalidAccountId(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_ACCOUNT_ID", None)
            }
            AppError::Funding(FundingError::NotConfigured) => {
                (StatusCode::SERVICE_UNAVAILABLE, "FUNDING_NOT_CONFIGURED", None)
            }
            AppError::Funding(FundingError::Faucet(upstream)) => (
                StatusCode::BAD_GATEWAY,
                "FAUCET_FAILED",
                Some(serde_json::json!({ "upstream": upstream })),
            ),
            AppError::Funding(FundingError::Relay(upstream)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "FUNDING_FAILED",
                Some(serde_json::json!({ "upstream": upstream })),
            ),
            AppError::Config(_) => (StatusCode::SERVICE_UNAVAILABLE, "NOT_CONFIGURED", None),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", None),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", None),
            AppError::Signer(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SIGNER_ERROR",
                Some(serde_json::json!({ "upstream": e.to_string() })),
            ),
            AppError::Ledger(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "LEDGER_ERROR",
                Some(serde_json::json!({ "upstream": e.to_string() })),
            ),
            AppError::ExternalError(upstream) => (
                StatusCode::BAD_GATEWAY,
                "EXTERNAL_ERROR",
                Some(serde_json::json!({ "upstream": upstream })),
            ),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", None),
        };

        // Auth failures never echo internal state
        let message = match self {
            AppError::Unauthorized => "Unauthorized".to_string(),
            AppError::Config(_) => "Service not configured".to_string(),
            _ => message,
        };

        let body = Json(ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

impl From<ParseAccountError> for AppError {
    fn from(error: ParseAccountError) -> Self {
        AppError::Settlement(SettlementError::InvalidAccount(error.to_string()))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        AppError::ExternalError(format!("HTTP request error: {:?}", error))
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
