// Funding relay for freshly created implicit accounts
//
// Strategy, chosen per request:
// 1. Funding account + key configured  -> native transfer signed locally
// 2. Testnet with a faucet configured  -> delegate to the external faucet
// 3. Otherwise                         -> FundingNotConfigured

pub mod faucet;

use near_primitives::types::AccountId;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::{
    config::NetworkKind,
    error::{AppResult, FundingError},
    execution::{submitter::TransactionSubmitter, token::native_transfer_action},
};
use faucet::FaucetClient;

/// Implicit account ids are the hex encoding of an ed25519 public key
pub const IMPLICIT_ACCOUNT_LEN: usize = 64;

pub fn validate_implicit_account(account_id: &str) -> Result<AccountId, FundingError> {
    let well_formed = account_id.len() == IMPLICIT_ACCOUNT_LEN
        && account_id.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

    if !well_formed {
        return Err(FundingError::InvalidAccountId(account_id.to_string()));
    }

    account_id
        .parse()
        .map_err(|e| FundingError::InvalidAccountId(format!("{}: {}", account_id, e)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FundingReceipt {
    /// Submitted by us; hash of a final ledger transaction
    TxHash(String),
    /// Identifier reported by the external faucet
    ExternalTxId(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingResult {
    pub account_id: String,
    pub amount_yocto: u128,
    pub receipt: FundingReceipt,
}

pub struct FundingRelay {
    network: NetworkKind,
    amount_yocto: u128,
    direct: Option<TransactionSubmitter>,
    faucet: Option<FaucetClient>,
}

impl FundingRelay {
    pub fn new(network: NetworkKind, amount_yocto: u128) -> Self {
        Self {
            network,
            amount_yocto,
            direct: None,
            faucet: None,
        }
    }

    pub fn with_funding_account(mut self, submitter: TransactionSubmitter) -> Self {
        self.direct = Some(submitter);
        self
    }

    pub fn with_faucet(mut self, faucet: FaucetClient) -> Self {
        self.faucet = Some(faucet);
        self
    }

    pub fn amount_yocto(&self) -> u128 {
        self.amount_yocto
    }

    /// True when `fund` has at least one strategy available
    pub fn is_configured(&self) -> bool {
        self.direct.is_some() || self.usable_faucet().is_some()
    }

    fn usable_faucet(&self) -> Option<&FaucetClient> {
        match self.network {
            NetworkKind::Testnet => self.faucet.as_ref(),
            NetworkKind::Mainnet => None,
        }
    }

    #[instrument(skip(self), fields(network = ?self.network))]
    pub async fn fund(&self, account_id: &str) -> AppResult<FundingResult> {
        let target = validate_implicit_account(account_id)?;

        let receipt = if let Some(submitter) = &self.direct {
            info!("💰 Funding {} from {}", target, submitter.signer_id());
            let tx_hash = submitter
                .submit(&target, vec![native_transfer_action(self.amount_yocto)])
                .await
                .map_err(|e| FundingError::Relay(e.to_string()))?;
            FundingReceipt::TxHash(tx_hash.to_string())
        } else if let Some(faucet) = self.usable_faucet() {
            info!("🚰 Funding {} through faucet", target);
            let external_id = faucet
                .request_funds(self.network, target.as_str(), self.amount_yocto)
                .await?;
            FundingReceipt::ExternalTxId(external_id)
        } else {
            return Err(FundingError::NotConfigured.into());
        };

        Ok(FundingResult {
            account_id: target.to_string(),
            amount_yocto: self.amount_yocto,
            receipt,
        })
    }
}
