use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{config::NetworkKind, error::FundingError};

#[derive(Debug, Serialize)]
struct FaucetRequest<'a> {
    network: &'a str,
    address: &'a str,
    amount: String,
}

/// Faucets disagree on what they call the transaction id
#[derive(Debug, Default, Deserialize)]
struct FaucetResponse {
    #[serde(rename = "txHash")]
    tx_hash_camel: Option<String>,
    tx_hash: Option<String>,
    id: Option<serde_json::Value>,
}

impl FaucetResponse {
    fn external_id(self) -> Option<String> {
        self.tx_hash_camel.or(self.tx_hash).or_else(|| match self.id? {
            serde_json::Value::String(id) => Some(id),
            serde_json::Value::Number(id) => Some(id.to_string()),
            _ => None,
        })
    }
}

pub struct FaucetClient {
    url: String,
    client: reqwest::Client,
}

impl FaucetClient {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }

    pub async fn request_funds(
        &self,
        network: NetworkKind,
        address: &str,
        amount_yocto: u128,
    ) -> Result<String, FundingError> {
        let body = FaucetRequest {
            network: network.as_str(),
            address,
            amount: amount_yocto.to_string(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| FundingError::Faucet(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("Faucet rejected {}: {} {}", address, status, text);
            return Err(FundingError::Faucet(format!("faucet returned {}: {}", status, text)));
        }

        let parsed: FaucetResponse = response
            .json()
            .await
            .map_err(|e| FundingError::Faucet(format!("unreadable faucet response: {}", e)))?;

        let external_id = parsed
            .external_id()
            .ok_or_else(|| FundingError::Faucet("faucet response carried no transaction id".to_string()))?;

        debug!("Faucet accepted {} as {}", address, external_id);
        Ok(external_id)
    }
}
