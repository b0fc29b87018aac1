use near_primitives::{
    hash::CryptoHash,
    transaction::{Action, Transaction, TransactionV0},
    types::AccountId,
};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::{
    error::AppResult,
    execution::{near::LedgerClient, signer::TransactionSigner},
};

/// Builds, signs and broadcasts transactions for a single signer account.
///
/// Every call is single-attempt: nonce and block hash are read fresh, and the
/// result is returned only after the ledger reports finality.
pub struct TransactionSubmitter {
    ledger: Arc<dyn LedgerClient>,
    signer: Arc<dyn TransactionSigner>,
}

impl TransactionSubmitter {
    pub fn new(ledger: Arc<dyn LedgerClient>, signer: Arc<dyn TransactionSigner>) -> Self {
        Self { ledger, signer }
    }

    pub fn signer_id(&self) -> &AccountId {
        self.signer.account_id()
    }

    pub async fn build_transaction(&self, receiver_id: &AccountId, actions: Vec<Action>) -> AppResult<Transaction> {
        let signer_id = self.signer.account_id().clone();
        let public_key = self.signer.public_key().await?;
        let nonce = self.ledger.access_key_nonce(&signer_id, &public_key).await?;
        let block_hash = self.ledger.latest_block_hash().await?;

        Ok(Transaction::V0(TransactionV0 {
            signer_id,
            public_key,
            nonce: nonce + 1,
            receiver_id: receiver_id.clone(),
            block_hash,
            actions,
        }))
    }

    #[instrument(skip(self, actions), fields(signer = %self.signer.account_id(), receiver = %receiver_id))]
    pub async fn submit(&self, receiver_id: &AccountId, actions: Vec<Action>) -> AppResult<CryptoHash> {
        let transaction = self.build_transaction(receiver_id, actions).await?;
        let (tx_hash, signed_transaction) = self.signer.sign_transaction(transaction).await?;

        info!("Submitting transaction {}", tx_hash);
        let confirmed = self.ledger.send_transaction(signed_transaction).await?;
        info!("✅ Transaction {} final", confirmed);

        Ok(confirmed)
    }
}
