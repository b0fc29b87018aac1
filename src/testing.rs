// In-memory doubles for the ledger, the remote hash signer and the record keeper

use async_trait::async_trait;
use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json, Router,
};
use near_crypto::{KeyType, PublicKey, SecretKey};
use near_primitives::{
    hash::CryptoHash,
    transaction::{Action, SignedTransaction, Transaction, TransactionV0},
    types::AccountId,
};
use parking_lot::Mutex;
use std::{collections::HashSet, sync::Arc};
use tokio::sync::Semaphore;

use crate::{
    error::{AppResult, LedgerError, SignerError},
    execution::{
        hash_signer::HashSigner,
        near::LedgerClient,
        token::{native_transfer_action, STORAGE_DEPOSIT},
    },
    settlement::record_keeper::{RecordKeeper, SettlementNotice},
};

pub const FAKE_NONCE: u64 = 41;

pub const FIXED_SIGNATURE_HEX: &str = "0a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f9\
                                       0a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f9";

pub fn sample_transaction(nonce: u64) -> Transaction {
    Transaction::V0(TransactionV0 {
        signer_id: "escrow.testnet".parse().unwrap(),
        public_key: SecretKey::from_seed(KeyType::ED25519, "escrow").public_key(),
        nonce,
        receiver_id: "doctor.testnet".parse().unwrap(),
        block_hash: CryptoHash::default(),
        actions: vec![native_transfer_action(1_000)],
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    View {
        contract: String,
        method: String,
        account: String,
    },
    Send {
        receiver: String,
        methods: Vec<String>,
    },
}

#[derive(Debug, Clone)]
pub struct SentAction {
    pub method: Option<String>,
    pub args: serde_json::Value,
    pub deposit_yocto: u128,
}

#[derive(Debug, Clone)]
pub struct SentTransaction {
    pub hash: CryptoHash,
    pub signer_id: String,
    pub receiver_id: String,
    pub actions: Vec<SentAction>,
}

impl SentTransaction {
    fn from_signed(signed: &SignedTransaction) -> Self {
        let Transaction::V0(tx) = &signed.transaction else {
            panic!("fake ledger only understands V0 transactions");
        };

        let actions = tx
            .actions
            .iter()
            .map(|action| match action {
                Action::FunctionCall(call) => SentAction {
                    method: Some(call.method_name.clone()),
                    args: serde_json::from_slice(&call.args).unwrap_or(serde_json::Value::Null),
                    deposit_yocto: call.deposit.as_yoctonear(),
                },
                Action::Transfer(transfer) => SentAction {
                    method: None,
                    args: serde_json::Value::Null,
                    deposit_yocto: transfer.deposit.as_yoctonear(),
                },
                other => panic!("unexpected action {:?}", other),
            })
            .collect();

        Self {
            hash: signed.get_hash(),
            signer_id: tx.signer_id.to_string(),
            receiver_id: tx.receiver_id.to_string(),
            actions,
        }
    }

    pub fn method(&self) -> Option<&str> {
        self.actions.first().and_then(|a| a.method.as_deref())
    }

    /// `receiver_id` argument of an ft_transfer
    pub fn ft_receiver(&self) -> Option<String> {
        self.actions
            .first()
            .and_then(|a| a.args["receiver_id"].as_str().map(str::to_string))
    }

    pub fn ft_amount(&self) -> Option<String> {
        self.actions.first().and_then(|a| a.args["amount"].as_str().map(str::to_string))
    }
}

type SendPredicate = Box<dyn Fn(&SentTransaction) -> bool + Send + Sync>;
type SendHook = Box<dyn Fn(&SentTransaction) + Send + Sync>;

pub struct FakeLedger {
    access_keys: Vec<PublicKey>,
    registered: Mutex<HashSet<String>>,
    fail_when: Option<SendPredicate>,
    lose_response_when: Option<SendPredicate>,
    on_send: Option<SendHook>,
    send_gate: Option<Arc<Semaphore>>,
    calls: Mutex<Vec<LedgerCall>>,
    sent: Mutex<Vec<SentTransaction>>,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self {
            access_keys: vec![
                SecretKey::from_seed(KeyType::ED25519, "first").public_key(),
                SecretKey::from_seed(KeyType::ED25519, "second").public_key(),
            ],
            registered: Mutex::new(HashSet::new()),
            fail_when: None,
            lose_response_when: None,
            on_send: None,
            send_gate: None,
            calls: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn without_access_keys(mut self) -> Self {
        self.access_keys.clear();
        self
    }

    pub fn with_registered(self, account: &str) -> Self {
        self.registered.lock().insert(account.to_string());
        self
    }

    /// Reject any broadcast matching `predicate` with an execution failure
    pub fn fail_when(mut self, predicate: impl Fn(&SentTransaction) -> bool + Send + Sync + 'static) -> Self {
        self.fail_when = Some(Box::new(predicate));
        self
    }

    /// Let matching broadcasts land, then report a timeout instead of the outcome
    pub fn lose_response_when(
        mut self,
        predicate: impl Fn(&SentTransaction) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.lose_response_when = Some(Box::new(predicate));
        self
    }

    /// Run `hook` after every broadcast that lands
    pub fn on_send(mut self, hook: impl Fn(&SentTransaction) + Send + Sync + 'static) -> Self {
        self.on_send = Some(Box::new(hook));
        self
    }

    /// Every broadcast waits for one permit from `gate`
    pub fn with_send_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.send_gate = Some(gate);
        self
    }

    pub fn access_keys(&self) -> Vec<PublicKey> {
        self.access_keys.clone()
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.calls.lock().clone()
    }

    /// Successfully finalized transactions, in submission order
    pub fn sent(&self) -> Vec<SentTransaction> {
        self.sent.lock().clone()
    }

    pub fn sent_methods(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                LedgerCall::Send { methods, .. } => Some(methods.join("+")),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn view_access_keys(&self, _account_id: &AccountId) -> AppResult<Vec<PublicKey>> {
        Ok(self.access_keys.clone())
    }

    async fn access_key_nonce(&self, _account_id: &AccountId, _public_key: &PublicKey) -> AppResult<u64> {
        Ok(FAKE_NONCE)
    }

    async fn latest_block_hash(&self) -> AppResult<CryptoHash> {
        Ok(CryptoHash::default())
    }

    async fn view_function(
        &self,
        contract_id: &AccountId,
        method_name: &str,
        args: serde_json::Value,
    ) -> AppResult<serde_json::Value> {
        let account = args["account_id"].as_str().unwrap_or_default().to_string();
        self.calls.lock().push(LedgerCall::View {
            contract: contract_id.to_string(),
            method: method_name.to_string(),
            account: account.clone(),
        });

        if self.registered.lock().contains(&account) {
            Ok(serde_json::json!({ "total": "1250000000000000000000", "available": "0" }))
        } else {
            Ok(serde_json::Value::Null)
        }
    }

    async fn send_transaction(&self, signed_transaction: SignedTransaction) -> AppResult<CryptoHash> {
        let sent = SentTransaction::from_signed(&signed_transaction);
        self.calls.lock().push(LedgerCall::Send {
            receiver: sent.receiver_id.clone(),
            methods: sent
                .actions
                .iter()
                .map(|a| a.method.clone().unwrap_or_else(|| "transfer".to_string()))
                .collect(),
        });

        if let Some(gate) = &self.send_gate {
            gate.acquire().await.expect("send gate closed").forget();
        }

        if self.fail_when.as_ref().is_some_and(|predicate| predicate(&sent)) {
            return Err(LedgerError::TransactionFailed {
                tx_hash: sent.hash.to_string(),
                message: "ActionError: simulated failure".to_string(),
            }
            .into());
        }

        if sent.method() == Some(STORAGE_DEPOSIT) {
            if let Some(account) = sent.actions[0].args["account_id"].as_str() {
                self.registered.lock().insert(account.to_string());
            }
        }

        let hash = sent.hash;
        let lost = self.lose_response_when.as_ref().is_some_and(|predicate| predicate(&sent));
        if let Some(hook) = &self.on_send {
            hook(&sent);
        }
        self.sent.lock().push(sent);

        if lost {
            return Err(LedgerError::Unconfirmed {
                tx_hash: hash.to_string(),
                message: "TIMEOUT_ERROR: no final outcome".to_string(),
            }
            .into());
        }
        Ok(hash)
    }
}

pub struct StubHashSigner {
    response: Result<String, String>,
    requests: Mutex<Vec<(String, String, [u8; 32])>>,
}

impl StubHashSigner {
    pub fn fixed() -> Self {
        Self::returning(FIXED_SIGNATURE_HEX)
    }

    pub fn returning(signature_hex: &str) -> Self {
        Self {
            response: Ok(signature_hex.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<(String, String, [u8; 32])> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl HashSigner for StubHashSigner {
    async fn sign_hash(&self, account_id: &AccountId, chain: &str, digest: &[u8; 32]) -> AppResult<String> {
        self.requests
            .lock()
            .push((account_id.to_string(), chain.to_string(), *digest));

        self.response
            .clone()
            .map_err(|message| SignerError::Upstream(message).into())
    }
}

#[derive(Default)]
pub struct RecordingKeeper {
    fail: bool,
    notices: Mutex<Vec<SettlementNotice>>,
}

impl RecordingKeeper {
    pub fn failing() -> Self {
        Self {
            fail: true,
            notices: Mutex::new(Vec::new()),
        }
    }

    pub fn notices(&self) -> Vec<SettlementNotice> {
        self.notices.lock().clone()
    }
}

#[async_trait]
impl RecordKeeper for RecordingKeeper {
    async fn notify(&self, notice: &SettlementNotice) -> AppResult<()> {
        self.notices.lock().push(notice.clone());
        if self.fail {
            return Err(crate::error::AppError::ExternalError("record keeper down".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

/// Local HTTP endpoint that answers every JSON POST with a canned response
pub struct StubHttpServer {
    pub url: String,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl StubHttpServer {
    pub async fn start(status: StatusCode, response: serde_json::Value) -> Self {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let recorder = captured.clone();

        let app = Router::new().fallback(move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
            let recorder = recorder.clone();
            let response = response.clone();
            async move {
                recorder.lock().push(CapturedRequest {
                    authorization: headers
                        .get(AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string),
                    body,
                });
                (status, Json(response))
            }
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { url, captured }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.captured.lock().clone()
    }
}
