// Escrow settlement: fee split, two-leg payout, journal and record keeper mirror
pub mod fee;
pub mod journal;
pub mod orchestrator;
pub mod record_keeper;

pub use fee::{split, SplitResult};
pub use journal::SettlementJournal;
pub use orchestrator::{SettlementOrchestrator, SettlementRequest};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegKind {
    Specialist,
    PlatformFee,
}

/// One settlement leg as observed on the ledger; `tx_hash` is only present
/// when the transfer reached finality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutcome {
    pub leg: LegKind,
    pub tx_hash: Option<String>,
}

impl TransactionOutcome {
    pub fn confirmed(leg: LegKind, tx_hash: impl Into<String>) -> Self {
        Self {
            leg,
            tx_hash: Some(tx_hash.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Complete,
    PartiallySettled,
    Failed,
    /// A broadcast is awaiting manual reconciliation
    Unconfirmed,
}

#[derive(Debug, Clone)]
pub struct SettlementReport {
    pub consultation_id: String,
    pub split: SplitResult,
    pub outcomes: Vec<TransactionOutcome>,
    pub status: SettlementStatus,
    /// Served from the journal without touching the ledger
    pub replayed: bool,
}

impl SettlementReport {
    pub fn tx_hash(&self, leg: LegKind) -> Option<&str> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.leg == leg)
            .and_then(|outcome| outcome.tx_hash.as_deref())
    }

    pub fn specialist_tx_hash(&self) -> Option<&str> {
        self.tx_hash(LegKind::Specialist)
    }

    pub fn platform_tx_hash(&self) -> Option<&str> {
        self.tx_hash(LegKind::PlatformFee)
    }
}
