use config::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 0.1 NEAR
pub const DEFAULT_FUNDING_AMOUNT_YOCTO: u128 = 100_000_000_000_000_000_000_000;

pub const DEFAULT_FUND_RATE_LIMIT_PER_MINUTE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    Mainnet,
    Testnet,
}

impl NetworkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkKind::Mainnet => "mainnet",
            NetworkKind::Testnet => "testnet",
        }
    }

    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            NetworkKind::Mainnet => "https://rpc.mainnet.near.org",
            NetworkKind::Testnet => "https://rpc.testnet.near.org",
        }
    }

    /// Canonical USDC deployment on each network
    pub fn default_token_contract(&self) -> &'static str {
        match self {
            NetworkKind::Mainnet => "17208628f84f5d6ad33f0da3bbbeb27ffcb398eac501a31bd6ad2011e36133a1",
            NetworkKind::Testnet => "usdc.fakes.testnet",
        }
    }
}

impl FromStr for NetworkKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(NetworkKind::Mainnet),
            "testnet" => Ok(NetworkKind::Testnet),
            other => Err(ConfigError::Message(format!("NEAR_NETWORK must be mainnet or testnet, got {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub network: NetworkKind,
    pub near_rpc_url: String,
    pub token_contract: String,

    // Settlement signing
    pub escrow_account_id: Option<String>,
    pub remote_signer_url: Option<String>,
    pub remote_signer_api_key: Option<String>,
    pub platform_fee_account_id: Option<String>,
    pub cron_secret: Option<String>,

    // Account funding
    pub funding_account_id: Option<String>,
    pub funding_private_key: Option<String>,
    pub faucet_url: Option<String>,
    pub min_funding_amount_yocto: u128,
    pub fund_rate_limit_per_minute: u32,

    pub record_keeper_url: Option<String>,
    pub record_keeper_api_key: Option<String>,
    pub settlement_journal_path: Option<String>,
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let network = match var("NEAR_NETWORK") {
            Some(raw) => raw.parse()?,
            None => NetworkKind::Testnet,
        };

        Ok(Self {
            bind_address: var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            network,
            near_rpc_url: var("NEAR_RPC_URL").unwrap_or_else(|| network.default_rpc_url().to_string()),
            token_contract: var("SETTLEMENT_TOKEN_CONTRACT")
                .unwrap_or_else(|| network.default_token_contract().to_string()),
            escrow_account_id: var("ESCROW_ACCOUNT_ID"),
            remote_signer_url: var("REMOTE_SIGNER_URL"),
            remote_signer_api_key: var("REMOTE_SIGNER_API_KEY"),
            platform_fee_account_id: var("PLATFORM_FEE_ACCOUNT_ID"),
            cron_secret: var("CRON_SECRET"),
            funding_account_id: var("FUNDING_ACCOUNT_ID"),
            funding_private_key: var("FUNDING_PRIVATE_KEY"),
            faucet_url: var("FAUCET_URL"),
            min_funding_amount_yocto: parse_or("MIN_FUNDING_AMOUNT_YOCTO", var("MIN_FUNDING_AMOUNT_YOCTO"), DEFAULT_FUNDING_AMOUNT_YOCTO)?,
            fund_rate_limit_per_minute: parse_or(
                "FUND_RATE_LIMIT_PER_MINUTE",
                var("FUND_RATE_LIMIT_PER_MINUTE"),
                DEFAULT_FUND_RATE_LIMIT_PER_MINUTE,
            )?,
            record_keeper_url: var("RECORD_KEEPER_URL"),
            record_keeper_api_key: var("RECORD_KEEPER_API_KEY"),
            settlement_journal_path: var("SETTLEMENT_JOURNAL_PATH"),
            cors_allowed_origins: var("CORS_ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|e| ConfigError::Message(format!("{} is not valid ({}): {}", key, raw, e))),
        None => Ok(default),
    }
}
