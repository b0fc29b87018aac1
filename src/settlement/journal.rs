//! Per-consultation settlement journal.
//!
//! The journal is claimed before any transfer is broadcast and advanced after
//! every confirmed leg, so a second release for the same consultation can
//! never re-enter the specialist transfer. With a path configured, every
//! transition is flushed to a JSON file (write to temp, then rename) before
//! the call returns.
//!
//! An entry left `InFlight` across a restart is not reclaimed automatically:
//! a transfer may have been broadcast, so it needs manual reconciliation.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use crate::error::SettlementError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JournalState {
    /// Claimed by a run. Hashes recorded here were broadcast without an
    /// observed final outcome and must be reconciled by hand.
    InFlight {
        specialist_tx_hash: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        platform_tx_hash: Option<String>,
    },
    SpecialistPaid {
        specialist_tx_hash: String,
    },
    Complete {
        specialist_tx_hash: String,
        platform_tx_hash: Option<String>,
    },
    /// Nothing moved; the consultation may be released again
    Aborted {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub consultation_id: String,
    pub amount_raw: String,
    pub specialist_account: String,
    pub state: JournalState,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of claiming a consultation for settlement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    Fresh,
    /// Specialist leg already final; only the platform fee remains
    ResumeAfterSpecialist { specialist_tx_hash: String },
    AlreadyComplete(JournalEntry),
}

pub struct SettlementJournal {
    entries: Mutex<HashMap<String, JournalEntry>>,
    path: Option<PathBuf>,
}

impl SettlementJournal {
    pub fn in_memory() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            path: None,
        }
    }

    /// Open a file-backed journal, loading existing entries if the file exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SettlementError> {
        let path = path.as_ref().to_path_buf();
        let mut entries = HashMap::new();

        if path.exists() {
            let raw = fs::read(&path).map_err(|e| SettlementError::Journal(format!("read {}: {}", path.display(), e)))?;
            let stored: Vec<JournalEntry> = serde_json::from_slice(&raw)
                .map_err(|e| SettlementError::Journal(format!("parse {}: {}", path.display(), e)))?;

            for entry in stored {
                if matches!(entry.state, JournalState::InFlight { .. }) {
                    warn!(
                        consultation_id = %entry.consultation_id,
                        "⚠️  Settlement left in flight by a previous run, manual reconciliation required"
                    );
                }
                entries.insert(entry.consultation_id.clone(), entry);
            }
        }

        info!("📒 Settlement journal loaded from {} ({} entries)", path.display(), entries.len());

        Ok(Self {
            entries: Mutex::new(entries),
            path: Some(path),
        })
    }

    pub fn get(&self, consultation_id: &str) -> Option<JournalEntry> {
        self.entries.lock().get(consultation_id).cloned()
    }

    /// Atomically claim `consultation_id` for a settlement run.
    pub fn begin(
        &self,
        consultation_id: &str,
        amount_raw: &str,
        specialist_account: &str,
    ) -> Result<Claim, SettlementError> {
        let mut entries = self.entries.lock();

        let claim = match entries.get(consultation_id) {
            None | Some(JournalEntry { state: JournalState::Aborted { .. }, .. }) => Claim::Fresh,
            Some(existing) => {
                if existing.amount_raw != amount_raw || existing.specialist_account != specialist_account {
                    return Err(SettlementError::Conflict {
                        consultation_id: consultation_id.to_string(),
                        message: format!(
                            "journaled {} to {}, requested {} to {}",
                            existing.amount_raw, existing.specialist_account, amount_raw, specialist_account
                        ),
                    });
                }

                match &existing.state {
                    JournalState::InFlight { .. } => {
                        return Err(SettlementError::InProgress(consultation_id.to_string()))
                    }
                    JournalState::SpecialistPaid { specialist_tx_hash } => Claim::ResumeAfterSpecialist {
                        specialist_tx_hash: specialist_tx_hash.clone(),
                    },
                    JournalState::Complete { .. } => return Ok(Claim::AlreadyComplete(existing.clone())),
                    JournalState::Aborted { .. } => Claim::Fresh,
                }
            }
        };

        let specialist_tx_hash = match &claim {
            Claim::ResumeAfterSpecialist { specialist_tx_hash } => Some(specialist_tx_hash.clone()),
            _ => None,
        };

        let previous = entries.insert(
            consultation_id.to_string(),
            JournalEntry {
                consultation_id: consultation_id.to_string(),
                amount_raw: amount_raw.to_string(),
                specialist_account: specialist_account.to_string(),
                state: JournalState::InFlight {
                    specialist_tx_hash,
                    platform_tx_hash: None,
                },
                updated_at: Utc::now(),
            },
        );

        if let Err(e) = self.persist(&entries) {
            // Nothing broadcast yet: undo the claim, keeping any earlier payout record
            match previous {
                Some(previous) => entries.insert(consultation_id.to_string(), previous),
                None => entries.remove(consultation_id),
            };
            return Err(e);
        }

        debug!("Journal claimed {} ({:?})", consultation_id, claim);
        Ok(claim)
    }

    pub fn mark_specialist_paid(&self, consultation_id: &str, specialist_tx_hash: &str) -> Result<(), SettlementError> {
        self.transition(
            consultation_id,
            JournalState::SpecialistPaid {
                specialist_tx_hash: specialist_tx_hash.to_string(),
            },
        )
    }

    pub fn mark_complete(
        &self,
        consultation_id: &str,
        specialist_tx_hash: &str,
        platform_tx_hash: Option<&str>,
    ) -> Result<(), SettlementError> {
        self.transition(
            consultation_id,
            JournalState::Complete {
                specialist_tx_hash: specialist_tx_hash.to_string(),
                platform_tx_hash: platform_tx_hash.map(str::to_string),
            },
        )
    }

    /// Hold the claim after a broadcast whose outcome was never observed.
    /// Further releases get `InProgress` until an operator reconciles.
    pub fn mark_unconfirmed(
        &self,
        consultation_id: &str,
        specialist_tx_hash: &str,
        platform_tx_hash: Option<&str>,
    ) -> Result<(), SettlementError> {
        self.transition(
            consultation_id,
            JournalState::InFlight {
                specialist_tx_hash: Some(specialist_tx_hash.to_string()),
                platform_tx_hash: platform_tx_hash.map(str::to_string),
            },
        )
    }

    pub fn mark_aborted(&self, consultation_id: &str, reason: &str) -> Result<(), SettlementError> {
        self.transition(
            consultation_id,
            JournalState::Aborted {
                reason: reason.to_string(),
            },
        )
    }

    fn transition(&self, consultation_id: &str, state: JournalState) -> Result<(), SettlementError> {
        let mut entries = self.entries.lock();
        let entry = entries
            .get_mut(consultation_id)
            .ok_or_else(|| SettlementError::Journal(format!("no journal entry for {}", consultation_id)))?;

        entry.state = state;
        entry.updated_at = Utc::now();

        self.persist(&entries)
    }

    // Blocking write under the entries lock. Fine for a journal of a few
    // thousand entries; move to spawn_blocking if it grows past that.
    fn persist(&self, entries: &HashMap<String, JournalEntry>) -> Result<(), SettlementError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut snapshot: Vec<&JournalEntry> = entries.values().collect();
        snapshot.sort_by(|a, b| a.consultation_id.cmp(&b.consultation_id));

        let encoded = serde_json::to_vec_pretty(&snapshot).map_err(|e| SettlementError::Journal(e.to_string()))?;
        let tmp = path.with_extension("tmp");

        fs::write(&tmp, encoded).map_err(|e| SettlementError::Journal(format!("write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, path).map_err(|e| SettlementError::Journal(format!("rename {}: {}", path.display(), e)))?;

        Ok(())
    }
}
