use async_trait::async_trait;
use near_crypto::PublicKey;
use near_jsonrpc_client::{methods, JsonRpcClient};
use near_jsonrpc_primitives::types::{query::QueryResponseKind, transactions::RpcTransactionError};
use near_primitives::{
    hash::CryptoHash,
    transaction::SignedTransaction,
    types::{AccountId, BlockReference, Finality, FunctionArgs},
    views::{FinalExecutionOutcomeViewEnum, FinalExecutionStatus, QueryRequest, TxExecutionStatus},
};
use tracing::{debug, info};

use crate::{
    config::NetworkKind,
    error::{AppResult, LedgerError},
};

#[derive(Debug, Clone)]
pub struct NearConfig {
    pub rpc_url: String,
    pub network: NetworkKind,
}

impl Default for NearConfig {
    fn default() -> Self {
        Self {
            rpc_url: NetworkKind::Testnet.default_rpc_url().to_string(),
            network: NetworkKind::Testnet,
        }
    }
}

/// Read and submit operations the settlement pipeline needs from the ledger.
///
/// `send_transaction` only returns once the transaction reached finality and
/// its execution succeeded. `LedgerError::TransactionFailed` means nothing was
/// transferred; `LedgerError::Unconfirmed` means the transaction may still land.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Active access keys of `account_id`, in the order the node reports them
    async fn view_access_keys(&self, account_id: &AccountId) -> AppResult<Vec<PublicKey>>;

    /// Current nonce of one access key
    async fn access_key_nonce(&self, account_id: &AccountId, public_key: &PublicKey) -> AppResult<u64>;

    /// Hash of the latest final block, used as transaction reference
    async fn latest_block_hash(&self) -> AppResult<CryptoHash>;

    /// Read-only contract call with JSON arguments and a JSON result
    async fn view_function(
        &self,
        contract_id: &AccountId,
        method_name: &str,
        args: serde_json::Value,
    ) -> AppResult<serde_json::Value>;

    async fn send_transaction(&self, signed_transaction: SignedTransaction) -> AppResult<CryptoHash>;
}

pub struct NearRpcClient {
    config: NearConfig,
    client: JsonRpcClient,
}

impl NearRpcClient {
    pub fn new(config: NearConfig) -> Self {
        let client = JsonRpcClient::connect(&config.rpc_url);
        Self { config, client }
    }

    async fn query(&self, request: QueryRequest) -> AppResult<QueryResponseKind> {
        let request = methods::query::RpcQueryRequest {
            block_reference: BlockReference::Finality(Finality::Final),
            request,
        };

        let response = self
            .client
            .call(request)
            .await
            .map_err(|e| LedgerError::Rpc(format!("query against {} failed: {}", self.config.rpc_url, e)))?;

        Ok(response.kind)
    }
}

#[async_trait]
impl LedgerClient for NearRpcClient {
    async fn view_access_keys(&self, account_id: &AccountId) -> AppResult<Vec<PublicKey>> {
        let kind = self
            .query(QueryRequest::ViewAccessKeyList {
                account_id: account_id.clone(),
            })
            .await?;

        match kind {
            QueryResponseKind::AccessKeyList(list) => {
                Ok(list.keys.into_iter().map(|key| key.public_key).collect())
            }
            _ => Err(LedgerError::UnexpectedResponse("expected access key list".to_string()).into()),
        }
    }

    async fn access_key_nonce(&self, account_id: &AccountId, public_key: &PublicKey) -> AppResult<u64> {
        let kind = self
            .query(QueryRequest::ViewAccessKey {
                account_id: account_id.clone(),
                public_key: public_key.clone(),
            })
            .await?;

        match kind {
            QueryResponseKind::AccessKey(access_key) => Ok(access_key.nonce),
            _ => Err(LedgerError::UnexpectedResponse("expected access key".to_string()).into()),
        }
    }

    async fn latest_block_hash(&self) -> AppResult<CryptoHash> {
        let request = methods::block::RpcBlockRequest {
            block_reference: BlockReference::Finality(Finality::Final),
        };

        let block = self
            .client
            .call(request)
            .await
            .map_err(|e| LedgerError::Rpc(format!("Failed to fetch block: {}", e)))?;

        debug!("Reference block height: {}", block.header.height);
        Ok(block.header.hash)
    }

    async fn view_function(
        &self,
        contract_id: &AccountId,
        method_name: &str,
        args: serde_json::Value,
    ) -> AppResult<serde_json::Value> {
        let kind = self
            .query(QueryRequest::CallFunction {
                account_id: contract_id.clone(),
                method_name: method_name.to_string(),
                args: FunctionArgs::from(args.to_string().into_bytes()),
            })
            .await?;

        match kind {
            QueryResponseKind::CallResult(result) => serde_json::from_slice(&result.result).map_err(|e| {
                LedgerError::UnexpectedResponse(format!("{}.{} returned non-JSON: {}", contract_id, method_name, e))
                    .into()
            }),
            _ => Err(LedgerError::UnexpectedResponse("expected call result".to_string()).into()),
        }
    }

    async fn send_transaction(&self, signed_transaction: SignedTransaction) -> AppResult<CryptoHash> {
        let tx_hash = signed_transaction.get_hash();
        info!("Broadcasting transaction {} to {:?}", tx_hash, self.config.network);

        let request = methods::send_tx::RpcSendTransactionRequest {
            signed_transaction,
            wait_until: TxExecutionStatus::Final,
        };

        let response = self.client.call(request).await.map_err(|e| match e.handler_error() {
            Some(RpcTransactionError::InvalidTransaction { .. }) => LedgerError::TransactionFailed {
                tx_hash: tx_hash.to_string(),
                message: format!("rejected by node: {}", e),
            },
            // Timeouts and transport errors say nothing about inclusion
            _ => LedgerError::Unconfirmed {
                tx_hash: tx_hash.to_string(),
                message: format!("no final outcome from {}: {}", self.config.rpc_url, e),
            },
        })?;

        let status = match response.final_execution_outcome {
            Some(FinalExecutionOutcomeViewEnum::FinalExecutionOutcome(outcome)) => outcome.status,
            Some(FinalExecutionOutcomeViewEnum::FinalExecutionOutcomeWithReceipt(outcome)) => {
                outcome.final_outcome.status
            }
            None => {
                return Err(LedgerError::Unconfirmed {
                    tx_hash: tx_hash.to_string(),
                    message: "node returned no execution outcome".to_string(),
                }
                .into())
            }
        };

        match status {
            FinalExecutionStatus::SuccessValue(_) => Ok(tx_hash),
            FinalExecutionStatus::Failure(failure) => Err(LedgerError::TransactionFailed {
                tx_hash: tx_hash.to_string(),
                message: format!("{:?}", failure),
            }
            .into()),
            other => Err(LedgerError::Unconfirmed {
                tx_hash: tx_hash.to_string(),
                message: format!("transaction not final: {:?}", other),
            }
            .into()),
        }
    }
}
