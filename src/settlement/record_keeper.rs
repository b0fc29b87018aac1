// Record keeper mirror
//
// The external record store only mirrors settlement outcomes for display.
// Notifications are single-attempt; the orchestrator logs failures and moves on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::{
    error::{AppError, AppResult},
    settlement::{SettlementStatus, TransactionOutcome},
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementNotice {
    pub consultation_id: String,
    pub status: SettlementStatus,
    pub outcomes: Vec<TransactionOutcome>,
    pub platform_fee_raw: String,
    pub specialist_amount_raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub reported_at: DateTime<Utc>,
}

#[async_trait]
pub trait RecordKeeper: Send + Sync {
    async fn notify(&self, notice: &SettlementNotice) -> AppResult<()>;
}

pub struct HttpRecordKeeper {
    url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpRecordKeeper {
    pub fn new(url: String, api_key: Option<String>) -> Self {
        Self {
            url,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl RecordKeeper for HttpRecordKeeper {
    async fn notify(&self, notice: &SettlementNotice) -> AppResult<()> {
        let mut request = self.client.post(&self.url).json(notice);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ExternalError(format!(
                "record keeper returned {} for {}",
                status, notice.consultation_id
            )));
        }

        debug!("Record keeper acknowledged {}", notice.consultation_id);
        Ok(())
    }
}
