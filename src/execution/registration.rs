use near_primitives::{transaction::Action, types::AccountId};
use std::sync::Arc;
use tracing::debug;

use crate::{
    error::AppResult,
    execution::{
        near::LedgerClient,
        token::{storage_deposit_action, STORAGE_BALANCE_OF},
    },
};

/// Storage registration lookups against the settlement token contract.
///
/// A token transfer to an unregistered account fails on chain, so the
/// registration action must reach finality before the transfer is sent.
pub struct RegistrationChecker {
    ledger: Arc<dyn LedgerClient>,
    token_contract: AccountId,
}

impl RegistrationChecker {
    pub fn new(ledger: Arc<dyn LedgerClient>, token_contract: AccountId) -> Self {
        Self { ledger, token_contract }
    }

    pub fn token_contract(&self) -> &AccountId {
        &self.token_contract
    }

    pub async fn has_registration(&self, account_id: &AccountId) -> AppResult<bool> {
        let balance = self
            .ledger
            .view_function(
                &self.token_contract,
                STORAGE_BALANCE_OF,
                serde_json::json!({ "account_id": account_id.to_string() }),
            )
            .await?;

        debug!("{} storage balance on {}: {}", account_id, self.token_contract, balance);
        Ok(!balance.is_null())
    }

    pub fn registration_action(&self, account_id: &AccountId) -> Action {
        storage_deposit_action(account_id)
    }
}
