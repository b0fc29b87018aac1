//! Transaction signing capability for ledger accounts
//!
//! `RemoteSigner` never sees key material and delegates the ed25519 operation
//! to an external hash signer. `LocalKeySigner` holds a secret key in process
//! and is only used for the funding account.

use async_trait::async_trait;
use near_crypto::{KeyType, PublicKey, SecretKey, Signature};
use near_primitives::{
    action::delegate::{DelegateAction, SignedDelegateAction},
    hash::CryptoHash,
    transaction::{SignedTransaction, Transaction},
    types::AccountId,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{str::FromStr, sync::Arc};
use tracing::{debug, instrument};

use crate::{
    error::{AppResult, SignerError},
    execution::{
        hash_signer::{HashSigner, NEAR_CHAIN_TAG},
        near::LedgerClient,
    },
};

/// Signature scheme of the ledger's default key type
const SIGNATURE_SCHEME: KeyType = KeyType::ED25519;
const SIGNATURE_LEN: usize = 64;

/// NEP-413 style off-chain message payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffchainMessage {
    pub message: String,
    pub recipient: String,
    pub nonce: [u8; 32],
    pub callback_url: Option<String>,
}

#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Account whose access key authorizes the signed transactions
    fn account_id(&self) -> &AccountId;

    async fn public_key(&self) -> AppResult<PublicKey>;

    /// Returns the transaction digest alongside the signed transaction so
    /// callers know the hash before broadcast.
    async fn sign_transaction(&self, transaction: Transaction) -> AppResult<(CryptoHash, SignedTransaction)>;

    async fn sign_delegate_action(&self, delegate_action: DelegateAction) -> AppResult<SignedDelegateAction>;

    async fn sign_offchain_message(&self, message: &OffchainMessage) -> AppResult<Signature>;
}

/// SHA-256 over the borsh encoding; this is the ledger's transaction hash.
pub fn transaction_digest(transaction: &Transaction) -> AppResult<CryptoHash> {
    let encoded = borsh::to_vec(transaction).map_err(|e| SignerError::Serialization(e.to_string()))?;
    Ok(CryptoHash(Sha256::digest(&encoded).into()))
}

/// Decode a hex signature (optionally `0x`-prefixed) into an ed25519 signature.
pub fn decode_signature(signature_hex: &str) -> Result<Signature, SignerError> {
    let trimmed = signature_hex.trim();
    let hex_str = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let bytes = hex::decode(hex_str).map_err(|e| SignerError::InvalidSignature(format!("not hex: {}", e)))?;
    if bytes.len() != SIGNATURE_LEN {
        return Err(SignerError::InvalidSignature(format!(
            "expected {} bytes, got {}",
            SIGNATURE_LEN,
            bytes.len()
        )));
    }

    Signature::from_parts(SIGNATURE_SCHEME, &bytes).map_err(|e| SignerError::InvalidSignature(e.to_string()))
}

pub struct RemoteSigner {
    account_id: AccountId,
    ledger: Arc<dyn LedgerClient>,
    hash_signer: Arc<dyn HashSigner>,
}

impl RemoteSigner {
    pub fn new(account_id: AccountId, ledger: Arc<dyn LedgerClient>, hash_signer: Arc<dyn HashSigner>) -> Self {
        Self {
            account_id,
            ledger,
            hash_signer,
        }
    }
}

#[async_trait]
impl TransactionSigner for RemoteSigner {
    fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    async fn public_key(&self) -> AppResult<PublicKey> {
        let keys = self.ledger.view_access_keys(&self.account_id).await?;
        keys.into_iter()
            .next()
            .ok_or_else(|| SignerError::NoAccessKey(self.account_id.to_string()).into())
    }

    #[instrument(skip(self, transaction), fields(account = %self.account_id))]
    async fn sign_transaction(&self, transaction: Transaction) -> AppResult<(CryptoHash, SignedTransaction)> {
        let digest = transaction_digest(&transaction)?;

        let signature_hex = self
            .hash_signer
            .sign_hash(&self.account_id, NEAR_CHAIN_TAG, &digest.0)
            .await?;
        let signature = decode_signature(&signature_hex)?;

        debug!("Remote signature obtained for {}", digest);
        Ok((digest, SignedTransaction::new(signature, transaction)))
    }

    async fn sign_delegate_action(&self, _delegate_action: DelegateAction) -> AppResult<SignedDelegateAction> {
        Err(SignerError::NotImplemented("sign_delegate_action").into())
    }

    async fn sign_offchain_message(&self, _message: &OffchainMessage) -> AppResult<Signature> {
        Err(SignerError::NotImplemented("sign_offchain_message").into())
    }
}

pub struct LocalKeySigner {
    account_id: AccountId,
    secret_key: SecretKey,
}

impl LocalKeySigner {
    pub fn new(account_id: AccountId, secret_key: SecretKey) -> Self {
        Self { account_id, secret_key }
    }

    /// Parse an `ed25519:<base58>` secret key
    pub fn from_secret_key_str(account_id: AccountId, secret_key: &str) -> Result<Self, SignerError> {
        let secret_key = SecretKey::from_str(secret_key.trim())
            .map_err(|e| SignerError::InvalidKey(format!("Invalid secret key format: {}", e)))?;
        Ok(Self::new(account_id, secret_key))
    }
}

#[async_trait]
impl TransactionSigner for LocalKeySigner {
    fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    async fn public_key(&self) -> AppResult<PublicKey> {
        Ok(self.secret_key.public_key())
    }

    async fn sign_transaction(&self, transaction: Transaction) -> AppResult<(CryptoHash, SignedTransaction)> {
        let digest = transaction_digest(&transaction)?;
        let signature = self.secret_key.sign(digest.as_ref());
        Ok((digest, SignedTransaction::new(signature, transaction)))
    }

    async fn sign_delegate_action(&self, _delegate_action: DelegateAction) -> AppResult<SignedDelegateAction> {
        Err(SignerError::NotImplemented("sign_delegate_action").into())
    }

    async fn sign_offchain_message(&self, _message: &OffchainMessage) -> AppResult<Signature> {
        Err(SignerError::NotImplemented("sign_offchain_message").into())
    }
}
