use near_primitives::types::AccountId;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    api::handler::AppState,
    config::Config,
    error::{AppError, AppResult},
    execution::{
        registration::RegistrationChecker, HttpHashSigner, LedgerClient, LocalKeySigner, NearConfig,
        NearRpcClient, RemoteSigner, TransactionSubmitter,
    },
    funding::{faucet::FaucetClient, FundingRelay},
    middleware::{CronAuth, RateLimitLayer},
    settlement::{record_keeper::HttpRecordKeeper, SettlementJournal, SettlementOrchestrator},
};

pub fn initialize_app_state(config: &Config) -> AppResult<AppState> {
    info!("Initializing application components ...");

    let ledger: Arc<dyn LedgerClient> = Arc::new(NearRpcClient::new(NearConfig {
        rpc_url: config.near_rpc_url.clone(),
        network: config.network,
    }));
    info!("✅ NEAR RPC client ready for {} at {}", config.network.as_str(), config.near_rpc_url);

    let settlement = initialize_settlement(config, ledger.clone())?;
    let funding = initialize_funding(config, ledger)?;

    if config.cron_secret.is_none() {
        warn!("⚠️  CRON_SECRET not set - settlement endpoint will refuse every call");
    }

    Ok(AppState {
        settlement,
        funding: Arc::new(funding),
        cron_auth: CronAuth::new(config.cron_secret.clone()),
        fund_rate_limit: RateLimitLayer::per_minute(config.fund_rate_limit_per_minute),
        network: config.network,
    })
}

fn parse_account(key: &str, value: &str) -> AppResult<AccountId> {
    value
        .parse()
        .map_err(|e| AppError::Config(format!("{} is not a valid account id: {}", key, e)))
}

fn initialize_settlement(
    config: &Config,
    ledger: Arc<dyn LedgerClient>,
) -> AppResult<Option<Arc<SettlementOrchestrator>>> {
    let (Some(escrow), Some(signer_url), Some(signer_key), Some(platform)) = (
        config.escrow_account_id.as_deref(),
        config.remote_signer_url.as_deref(),
        config.remote_signer_api_key.as_deref(),
        config.platform_fee_account_id.as_deref(),
    ) else {
        warn!(
            "⚠️  ESCROW_ACCOUNT_ID / REMOTE_SIGNER_URL / REMOTE_SIGNER_API_KEY / PLATFORM_FEE_ACCOUNT_ID incomplete - settlement disabled"
        );
        return Ok(None);
    };

    let escrow = parse_account("ESCROW_ACCOUNT_ID", escrow)?;
    let platform = parse_account("PLATFORM_FEE_ACCOUNT_ID", platform)?;
    let token_contract = parse_account("SETTLEMENT_TOKEN_CONTRACT", &config.token_contract)?;

    let hash_signer = Arc::new(HttpHashSigner::new(signer_url.to_string(), signer_key.to_string()));
    let signer = Arc::new(RemoteSigner::new(escrow.clone(), ledger.clone(), hash_signer));

    let journal = match &config.settlement_journal_path {
        Some(path) => SettlementJournal::open(path)?,
        None => {
            warn!("⚠️  SETTLEMENT_JOURNAL_PATH not set - idempotency guard will not survive restarts");
            SettlementJournal::in_memory()
        }
    };

    let mut orchestrator = SettlementOrchestrator::new(
        TransactionSubmitter::new(ledger.clone(), signer),
        RegistrationChecker::new(ledger, token_contract),
        Arc::new(journal),
        platform,
    );

    if let Some(url) = &config.record_keeper_url {
        orchestrator = orchestrator.with_record_keeper(Arc::new(HttpRecordKeeper::new(
            url.clone(),
            config.record_keeper_api_key.clone(),
        )));
        info!("✅ Record keeper notifications enabled");
    }

    info!("✅ Settlement orchestrator registered for escrow {}", escrow);
    Ok(Some(Arc::new(orchestrator)))
}

fn initialize_funding(config: &Config, ledger: Arc<dyn LedgerClient>) -> AppResult<FundingRelay> {
    let mut relay = FundingRelay::new(config.network, config.min_funding_amount_yocto);

    if let (Some(account), Some(key)) = (
        config.funding_account_id.as_deref(),
        config.funding_private_key.as_deref(),
    ) {
        let account = parse_account("FUNDING_ACCOUNT_ID", account)?;
        let signer = LocalKeySigner::from_secret_key_str(account.clone(), key)
            .map_err(|e| AppError::Config(format!("FUNDING_PRIVATE_KEY: {}", e)))?;
        relay = relay.with_funding_account(TransactionSubmitter::new(ledger, Arc::new(signer)));
        info!("✅ Direct funding enabled from {}", account);
    }

    if let Some(url) = &config.faucet_url {
        relay = relay.with_faucet(FaucetClient::new(url.clone()));
        info!("✅ Faucet funding configured");
    }

    if !relay.is_configured() {
        warn!("⚠️  No funding strategy available - /accounts/fund will return 503");
    }

    Ok(relay)
}
