// External raw-hash signing service
//
// The service holds the escrow key. We send it a 32-byte digest and get back
// a hex-encoded 64-byte ed25519 signature; nothing else crosses the wire.

use async_trait::async_trait;
use near_primitives::types::AccountId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppResult, SignerError};

/// Chain tag sent with every signing request
pub const NEAR_CHAIN_TAG: &str = "near";

/// Out-of-process signing capability: `(account, chain, digest) -> hex signature`
#[async_trait]
pub trait HashSigner: Send + Sync {
    async fn sign_hash(&self, account_id: &AccountId, chain: &str, digest: &[u8; 32]) -> AppResult<String>;
}

#[derive(Debug, Serialize)]
struct SignHashRequest<'a> {
    account_id: &'a str,
    chain: &'a str,
    hash: String,
}

#[derive(Debug, Deserialize)]
struct SignHashResponse {
    signature: Option<String>,
}

pub struct HttpHashSigner {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpHashSigner {
    pub fn new(endpoint: String, api_key: String) -> Self {
        Self {
            endpoint,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl HashSigner for HttpHashSigner {
    async fn sign_hash(&self, account_id: &AccountId, chain: &str, digest: &[u8; 32]) -> AppResult<String> {
        let request = SignHashRequest {
            account_id: account_id.as_str(),
            chain,
            hash: hex::encode(digest),
        };

        debug!("Requesting remote signature for {} on {}", account_id, chain);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SignerError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SignerError::Upstream(format!("signer returned {}: {}", status, body)).into());
        }

        let body: SignHashResponse = response
            .json()
            .await
            .map_err(|e| SignerError::Upstream(format!("unreadable signer response: {}", e)))?;

        body.signature
            .ok_or_else(|| SignerError::Upstream("signer response has no signature".to_string()).into())
    }
}
