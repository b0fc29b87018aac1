// Settlement orchestrator
//
// Release flow for one consultation:
// 1. Validate the specialist account and split the escrowed amount
// 2. Claim the consultation in the journal
// 3. Register the specialist on the token contract if needed (awaits finality)
// 4. Transfer the specialist share
// 5. Transfer the platform fee
// 6. Notify the record keeper (best effort)
//
// The ledger has no multi-transfer atomicity and nothing here compensates a
// confirmed leg. The specialist leg always goes first; a failed platform leg
// is reported as a partial settlement and can be resumed from the journal.
// A broadcast with no observed outcome keeps the journal entry in flight so
// it can never be sent a second time by a retry.

use near_primitives::types::AccountId;
use num_bigint::BigUint;
use num_traits::Zero;
use std::{str::FromStr, sync::Arc};
use tracing::{error, info, instrument, warn};

use crate::{
    error::{AppError, AppResult, LedgerError, SettlementError},
    execution::{
        registration::RegistrationChecker,
        submitter::TransactionSubmitter,
        token::ft_transfer_action,
    },
    settlement::{
        fee::{self, SplitResult},
        journal::{Claim, JournalEntry, JournalState, SettlementJournal},
        record_keeper::{RecordKeeper, SettlementNotice},
        LegKind, SettlementReport, SettlementStatus, TransactionOutcome,
    },
};

#[derive(Debug, Clone)]
pub struct SettlementRequest {
    pub consultation_id: String,
    pub amount_raw: String,
    pub specialist_account: String,
}

pub struct SettlementOrchestrator {
    submitter: TransactionSubmitter,
    registration: RegistrationChecker,
    journal: Arc<SettlementJournal>,
    record_keeper: Option<Arc<dyn RecordKeeper>>,
    platform_account: AccountId,
}

impl SettlementOrchestrator {
    pub fn new(
        submitter: TransactionSubmitter,
        registration: RegistrationChecker,
        journal: Arc<SettlementJournal>,
        platform_account: AccountId,
    ) -> Self {
        Self {
            submitter,
            registration,
            journal,
            record_keeper: None,
            platform_account,
        }
    }

    pub fn with_record_keeper(mut self, record_keeper: Arc<dyn RecordKeeper>) -> Self {
        self.record_keeper = Some(record_keeper);
        self
    }

    #[instrument(skip(self, request), fields(consultation_id = %request.consultation_id))]
    pub async fn release(&self, request: &SettlementRequest) -> AppResult<SettlementReport> {
        // Init
        let specialist = AccountId::from_str(&request.specialist_account)
            .map_err(|e| SettlementError::InvalidAccount(format!("{}: {}", request.specialist_account, e)))?;

        let amount = fee::parse_raw_amount(&request.amount_raw)?;
        if amount.is_zero() {
            return Err(SettlementError::InvalidAmount("amount must be greater than zero".to_string()).into());
        }
        let split = fee::split_amount(&amount);

        info!(
            "💸 Releasing {} for {}: specialist {} / platform fee {}",
            amount, specialist, split.specialist_amount_raw, split.platform_fee_raw
        );

        let claim = self
            .journal
            .begin(&request.consultation_id, &amount.to_string(), specialist.as_str())?;

        let specialist_tx_hash = match claim {
            Claim::AlreadyComplete(entry) => {
                info!("Consultation {} already settled, replaying journal", request.consultation_id);
                return Ok(replayed_report(entry, split));
            }
            Claim::ResumeAfterSpecialist { specialist_tx_hash } => {
                warn!(
                    leg = "specialist",
                    tx_hash = %specialist_tx_hash,
                    "Specialist already paid by an earlier attempt, resuming at platform fee"
                );
                specialist_tx_hash
            }
            Claim::Fresh => {
                if let Err(e) = self.ensure_registered(&specialist).await {
                    self.abort(&request.consultation_id, &e);
                    return Err(SettlementError::RegistrationFailed {
                        account: specialist.to_string(),
                        message: e.to_string(),
                    }
                    .into());
                }

                let tx_hash = match self
                    .transfer(&request.consultation_id, &specialist, &split.specialist_amount_raw)
                    .await
                {
                    Ok(tx_hash) => tx_hash,
                    Err(e) => return Err(self.specialist_leg_failed(request, &split, e).await),
                };

                // The platform leg is only broadcast once the payout is on disk
                if let Err(e) = self.journal.mark_specialist_paid(&request.consultation_id, &tx_hash) {
                    error!(leg = "specialist", tx_hash = %tx_hash, "❌ Failed to journal specialist payout: {}", e);
                    let message = format!("specialist paid but journal write failed, platform fee not attempted: {}", e);
                    self.notify(
                        &request.consultation_id,
                        &split,
                        vec![TransactionOutcome::confirmed(LegKind::Specialist, tx_hash.clone())],
                        SettlementStatus::PartiallySettled,
                        Some(message.clone()),
                    )
                    .await;
                    return Err(SettlementError::PartiallySettled {
                        consultation_id: request.consultation_id.clone(),
                        specialist_tx_hash: tx_hash,
                        message,
                    }
                    .into());
                }

                tx_hash
            }
        };

        let mut outcomes = vec![TransactionOutcome::confirmed(LegKind::Specialist, specialist_tx_hash.clone())];

        let platform_tx_hash = if split.platform_fee_raw.is_zero() {
            info!("Platform fee rounds to zero, skipping platform leg");
            None
        } else {
            match self
                .transfer(&request.consultation_id, &self.platform_account, &split.platform_fee_raw)
                .await
            {
                Ok(tx_hash) => Some(tx_hash),
                Err(e) => {
                    error!(
                        leg = "platform_fee",
                        specialist_tx_hash = %specialist_tx_hash,
                        "❌ Platform fee transfer failed after specialist payout: {}",
                        e
                    );
                    let journaled = match unconfirmed_broadcast(&e) {
                        // Might still land: a resume would pay the fee twice
                        Some(platform_tx_hash) => self.journal.mark_unconfirmed(
                            &request.consultation_id,
                            &specialist_tx_hash,
                            Some(platform_tx_hash),
                        ),
                        None => self
                            .journal
                            .mark_specialist_paid(&request.consultation_id, &specialist_tx_hash),
                    };
                    if let Err(journal_err) = journaled {
                        error!("Failed to journal partial settlement: {}", journal_err);
                    }
                    self.notify(
                        &request.consultation_id,
                        &split,
                        outcomes,
                        SettlementStatus::PartiallySettled,
                        Some(e.to_string()),
                    )
                    .await;
                    return Err(SettlementError::PartiallySettled {
                        consultation_id: request.consultation_id.clone(),
                        specialist_tx_hash,
                        message: e.to_string(),
                    }
                    .into());
                }
            }
        };

        if let Some(tx_hash) = &platform_tx_hash {
            outcomes.push(TransactionOutcome::confirmed(LegKind::PlatformFee, tx_hash.clone()));
        }

        if let Err(e) = self.journal.mark_complete(
            &request.consultation_id,
            &specialist_tx_hash,
            platform_tx_hash.as_deref(),
        ) {
            error!("Failed to journal completed settlement: {}", e);
        }

        self.notify(
            &request.consultation_id,
            &split,
            outcomes.clone(),
            SettlementStatus::Complete,
            None,
        )
        .await;

        info!("✅ Settlement {} complete", request.consultation_id);

        Ok(SettlementReport {
            consultation_id: request.consultation_id.clone(),
            split,
            outcomes,
            status: SettlementStatus::Complete,
            replayed: false,
        })
    }

    /// Journal and report a failed specialist leg. Only a failure that
    /// provably moved nothing releases the claim for a retry.
    async fn specialist_leg_failed(&self, request: &SettlementRequest, split: &SplitResult, e: AppError) -> AppError {
        if let Some(tx_hash) = unconfirmed_broadcast(&e) {
            let tx_hash = tx_hash.to_string();
            error!(
                leg = "specialist",
                tx_hash = %tx_hash,
                "❓ Specialist transfer outcome unknown, holding settlement for reconciliation: {}",
                e
            );
            if let Err(journal_err) = self.journal.mark_unconfirmed(&request.consultation_id, &tx_hash, None) {
                error!("Failed to journal unconfirmed specialist transfer: {}", journal_err);
            }
            self.notify(
                &request.consultation_id,
                split,
                vec![TransactionOutcome {
                    leg: LegKind::Specialist,
                    tx_hash: None,
                }],
                SettlementStatus::Unconfirmed,
                Some(e.to_string()),
            )
            .await;
            return SettlementError::SpecialistTransferUnconfirmed {
                consultation_id: request.consultation_id.clone(),
                tx_hash,
                message: e.to_string(),
            }
            .into();
        }

        error!(leg = "specialist", "❌ Specialist transfer failed: {}", e);
        self.abort(&request.consultation_id, &e);
        self.notify(
            &request.consultation_id,
            split,
            Vec::new(),
            SettlementStatus::Failed,
            Some(e.to_string()),
        )
        .await;
        SettlementError::SpecialistTransferFailed(e.to_string()).into()
    }

    async fn ensure_registered(&self, account_id: &AccountId) -> AppResult<()> {
        if self.registration.has_registration(account_id).await? {
            return Ok(());
        }

        info!("📝 Registering {} on {}", account_id, self.registration.token_contract());
        let action = self.registration.registration_action(account_id);
        let tx_hash = self
            .submitter
            .submit(self.registration.token_contract(), vec![action])
            .await?;

        info!("Registration of {} final in {}", account_id, tx_hash);
        Ok(())
    }

    async fn transfer(&self, consultation_id: &str, receiver: &AccountId, amount_raw: &BigUint) -> AppResult<String> {
        let memo = format!("consultation:{}", consultation_id);
        let action = ft_transfer_action(receiver, amount_raw, Some(&memo));

        let tx_hash = self
            .submitter
            .submit(self.registration.token_contract(), vec![action])
            .await?;

        Ok(tx_hash.to_string())
    }

    fn abort(&self, consultation_id: &str, cause: &AppError) {
        if let Err(e) = self.journal.mark_aborted(consultation_id, &cause.to_string()) {
            error!("Failed to journal aborted settlement: {}", e);
        }
    }

    async fn notify(
        &self,
        consultation_id: &str,
        split: &SplitResult,
        outcomes: Vec<TransactionOutcome>,
        status: SettlementStatus,
        error: Option<String>,
    ) {
        let Some(record_keeper) = &self.record_keeper else {
            return;
        };

        let notice = SettlementNotice {
            consultation_id: consultation_id.to_string(),
            status,
            outcomes,
            platform_fee_raw: split.platform_fee_raw.to_string(),
            specialist_amount_raw: split.specialist_amount_raw.to_string(),
            error,
            reported_at: chrono::Utc::now(),
        };

        if let Err(e) = record_keeper.notify(&notice).await {
            warn!(
                consultation_id = %consultation_id,
                status = ?status,
                "⚠️  Record keeper notification failed: {}",
                e
            );
        }
    }
}

/// Hash of a broadcast that may have landed without us seeing finality
fn unconfirmed_broadcast(error: &AppError) -> Option<&str> {
    match error {
        AppError::Ledger(LedgerError::Unconfirmed { tx_hash, .. }) => Some(tx_hash),
        _ => None,
    }
}

fn replayed_report(entry: JournalEntry, split: SplitResult) -> SettlementReport {
    let mut outcomes = Vec::new();
    if let JournalState::Complete {
        specialist_tx_hash,
        platform_tx_hash,
    } = entry.state
    {
        outcomes.push(TransactionOutcome::confirmed(LegKind::Specialist, specialist_tx_hash));
        if let Some(tx_hash) = platform_tx_hash {
            outcomes.push(TransactionOutcome::confirmed(LegKind::PlatformFee, tx_hash));
        }
    }

    SettlementReport {
        consultation_id: entry.consultation_id,
        split,
        outcomes,
        status: SettlementStatus::Complete,
        replayed: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        execution::{
            near::LedgerClient,
            signer::RemoteSigner,
            token::{FT_TRANSFER, STORAGE_BALANCE_OF, STORAGE_DEPOSIT},
        },
        testing::{FakeLedger, LedgerCall, RecordingKeeper, StubHashSigner},
    };

    const TOKEN: &str = "usdc.fakes.testnet";
    const ESCROW: &str = "escrow.testnet";
    const PLATFORM: &str = "platform.testnet";
    const DOCTOR: &str = "doctor.testnet";

    struct Harness {
        ledger: Arc<FakeLedger>,
        keeper: Arc<RecordingKeeper>,
        journal: Arc<SettlementJournal>,
        orchestrator: SettlementOrchestrator,
    }

    fn harness(ledger: FakeLedger, keeper: RecordingKeeper) -> Harness {
        harness_with_journal(ledger, keeper, SettlementJournal::in_memory())
    }

    fn harness_with_journal(ledger: FakeLedger, keeper: RecordingKeeper, journal: SettlementJournal) -> Harness {
        let ledger = Arc::new(ledger);
        let keeper = Arc::new(keeper);
        let journal = Arc::new(journal);
        let rpc: Arc<dyn LedgerClient> = ledger.clone();

        let signer = Arc::new(RemoteSigner::new(
            ESCROW.parse().unwrap(),
            rpc.clone(),
            Arc::new(StubHashSigner::fixed()),
        ));
        let orchestrator = SettlementOrchestrator::new(
            TransactionSubmitter::new(rpc.clone(), signer),
            RegistrationChecker::new(rpc, TOKEN.parse().unwrap()),
            journal.clone(),
            PLATFORM.parse().unwrap(),
        )
        .with_record_keeper(keeper.clone());

        Harness {
            ledger,
            keeper,
            journal,
            orchestrator,
        }
    }

    fn request(amount: &str) -> SettlementRequest {
        SettlementRequest {
            consultation_id: "consult-42".to_string(),
            amount_raw: amount.to_string(),
            specialist_account: DOCTOR.to_string(),
        }
    }

    fn to_platform(tx: &crate::testing::SentTransaction) -> bool {
        tx.ft_receiver().as_deref() == Some(PLATFORM)
    }

    fn to_doctor(tx: &crate::testing::SentTransaction) -> bool {
        tx.ft_receiver().as_deref() == Some(DOCTOR)
    }

    #[tokio::test]
    async fn test_full_settlement_for_registered_specialist() {
        let h = harness(FakeLedger::new().with_registered(DOCTOR), RecordingKeeper::default());

        let report = h.orchestrator.release(&request("10000000")).await.unwrap();

        assert_eq!(report.status, SettlementStatus::Complete);
        assert_eq!(h.ledger.sent_methods(), vec![FT_TRANSFER, FT_TRANSFER]);

        let sent = h.ledger.sent();
        assert!(sent.iter().all(|tx| tx.receiver_id == TOKEN && tx.signer_id == ESCROW));
        assert_eq!(sent[0].ft_receiver().as_deref(), Some(DOCTOR));
        assert_eq!(sent[0].ft_amount().as_deref(), Some("8500000"));
        assert_eq!(sent[1].ft_receiver().as_deref(), Some(PLATFORM));
        assert_eq!(sent[1].ft_amount().as_deref(), Some("1500000"));
        assert_eq!(sent[0].actions[0].args["memo"], "consultation:consult-42");

        assert_eq!(report.specialist_tx_hash(), Some(sent[0].hash.to_string().as_str()));
        assert_eq!(report.platform_tx_hash(), Some(sent[1].hash.to_string().as_str()));

        let notices = h.keeper.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].status, SettlementStatus::Complete);
        assert_eq!(notices[0].outcomes.len(), 2);
    }

    #[tokio::test]
    async fn test_registration_precedes_specialist_transfer() {
        let h = harness(FakeLedger::new(), RecordingKeeper::default());

        h.orchestrator.release(&request("10000000")).await.unwrap();

        let calls = h.ledger.calls();
        assert_eq!(
            calls[0],
            LedgerCall::View {
                contract: TOKEN.to_string(),
                method: STORAGE_BALANCE_OF.to_string(),
                account: DOCTOR.to_string(),
            }
        );
        assert_eq!(h.ledger.sent_methods(), vec![STORAGE_DEPOSIT, FT_TRANSFER, FT_TRANSFER]);

        let sent = h.ledger.sent();
        assert_eq!(sent[0].actions[0].args["account_id"], DOCTOR);
        assert_eq!(sent[1].ft_receiver().as_deref(), Some(DOCTOR));
    }

    #[tokio::test]
    async fn test_registration_failure_moves_no_funds() {
        let ledger = FakeLedger::new().fail_when(|tx| tx.method() == Some(STORAGE_DEPOSIT));
        let h = harness(ledger, RecordingKeeper::default());

        let err = h.orchestrator.release(&request("10000000")).await.unwrap_err();

        assert!(matches!(err, AppError::Settlement(SettlementError::RegistrationFailed { .. })));
        assert!(h.ledger.sent().is_empty());
        assert!(matches!(
            h.journal.get("consult-42").unwrap().state,
            JournalState::Aborted { .. }
        ));
    }

    #[tokio::test]
    async fn test_specialist_failure_never_attempts_platform_leg() {
        let ledger = FakeLedger::new().with_registered(DOCTOR).fail_when(to_doctor);
        let h = harness(ledger, RecordingKeeper::default());

        let err = h.orchestrator.release(&request("10000000")).await.unwrap_err();

        assert!(matches!(err, AppError::Settlement(SettlementError::SpecialistTransferFailed(_))));
        // the single broadcast attempt was the rejected specialist transfer
        assert_eq!(h.ledger.sent_methods(), vec![FT_TRANSFER]);
        assert!(h.ledger.sent().is_empty());

        let notices = h.keeper.notices();
        assert_eq!(notices[0].status, SettlementStatus::Failed);
        assert!(notices[0].outcomes.is_empty());
        assert!(matches!(
            h.journal.get("consult-42").unwrap().state,
            JournalState::Aborted { .. }
        ));
    }

    #[tokio::test]
    async fn test_lost_specialist_outcome_holds_claim() {
        let ledger = FakeLedger::new().with_registered(DOCTOR).lose_response_when(to_doctor);
        let h = harness(ledger, RecordingKeeper::default());

        let err = h.orchestrator.release(&request("10000000")).await.unwrap_err();

        let broadcast = h.ledger.sent()[0].hash.to_string();
        match err {
            AppError::Settlement(SettlementError::SpecialistTransferUnconfirmed { tx_hash, .. }) => {
                assert_eq!(tx_hash, broadcast);
            }
            other => panic!("expected unconfirmed specialist transfer, got {:?}", other),
        }
        assert_eq!(
            h.journal.get("consult-42").unwrap().state,
            JournalState::InFlight {
                specialist_tx_hash: Some(broadcast),
                platform_tx_hash: None,
            }
        );
        assert_eq!(h.keeper.notices()[0].status, SettlementStatus::Unconfirmed);

        let retry = h.orchestrator.release(&request("10000000")).await.unwrap_err();
        assert!(matches!(retry, AppError::Settlement(SettlementError::InProgress(_))));
        assert_eq!(h.ledger.sent().iter().filter(|tx| to_doctor(tx)).count(), 1);
        assert_eq!(h.ledger.sent_methods(), vec![FT_TRANSFER]);
    }

    #[tokio::test]
    async fn test_lost_platform_outcome_is_not_resumed() {
        let ledger = FakeLedger::new().with_registered(DOCTOR).lose_response_when(to_platform);
        let h = harness(ledger, RecordingKeeper::default());

        let err = h.orchestrator.release(&request("10000000")).await.unwrap_err();
        assert!(matches!(err, AppError::Settlement(SettlementError::PartiallySettled { .. })));

        let sent = h.ledger.sent();
        assert_eq!(
            h.journal.get("consult-42").unwrap().state,
            JournalState::InFlight {
                specialist_tx_hash: Some(sent[0].hash.to_string()),
                platform_tx_hash: Some(sent[1].hash.to_string()),
            }
        );

        let retry = h.orchestrator.release(&request("10000000")).await.unwrap_err();
        assert!(matches!(retry, AppError::Settlement(SettlementError::InProgress(_))));
        assert_eq!(h.ledger.sent().iter().filter(|tx| to_platform(tx)).count(), 1);
    }

    #[tokio::test]
    async fn test_unjournaled_payout_stops_before_platform_leg() {
        let dir = tempfile::tempdir().unwrap();
        let journal_dir = dir.path().join("journal");
        std::fs::create_dir(&journal_dir).unwrap();
        let journal = SettlementJournal::open(journal_dir.join("settlements.json")).unwrap();

        let doomed = journal_dir.clone();
        let ledger = FakeLedger::new().with_registered(DOCTOR).on_send(move |tx| {
            if to_doctor(tx) {
                std::fs::remove_dir_all(&doomed).unwrap();
            }
        });
        let h = harness_with_journal(ledger, RecordingKeeper::default(), journal);

        let err = h.orchestrator.release(&request("10000000")).await.unwrap_err();

        match err {
            AppError::Settlement(SettlementError::PartiallySettled { message, .. }) => {
                assert!(message.contains("journal"), "{message}");
            }
            other => panic!("expected partial settlement, got {:?}", other),
        }
        assert_eq!(h.ledger.sent().len(), 1);
        assert_eq!(h.ledger.sent_methods(), vec![FT_TRANSFER]);
        assert_eq!(h.keeper.notices()[0].status, SettlementStatus::PartiallySettled);
    }

    #[tokio::test]
    async fn test_platform_failure_is_partial_settlement() {
        let ledger = FakeLedger::new().with_registered(DOCTOR).fail_when(to_platform);
        let h = harness(ledger, RecordingKeeper::default());

        let err = h.orchestrator.release(&request("10000000")).await.unwrap_err();

        let specialist_hash = h.ledger.sent()[0].hash.to_string();
        match err {
            AppError::Settlement(SettlementError::PartiallySettled {
                specialist_tx_hash,
                consultation_id,
                ..
            }) => {
                assert_eq!(specialist_tx_hash, specialist_hash);
                assert_eq!(consultation_id, "consult-42");
            }
            other => panic!("expected partial settlement, got {:?}", other),
        }

        assert_eq!(
            h.journal.get("consult-42").unwrap().state,
            JournalState::SpecialistPaid {
                specialist_tx_hash: specialist_hash
            }
        );

        let notices = h.keeper.notices();
        assert_eq!(notices[0].status, SettlementStatus::PartiallySettled);
        assert_eq!(notices[0].outcomes.len(), 1);
        assert_eq!(notices[0].outcomes[0].leg, LegKind::Specialist);
    }

    #[tokio::test]
    async fn test_retry_after_partial_pays_only_platform() {
        let h = harness(FakeLedger::new().with_registered(DOCTOR), RecordingKeeper::default());
        h.journal.begin("consult-42", "10000000", DOCTOR).unwrap();
        h.journal.mark_specialist_paid("consult-42", "EarlierHash").unwrap();

        let report = h.orchestrator.release(&request("10000000")).await.unwrap();

        assert_eq!(report.specialist_tx_hash(), Some("EarlierHash"));
        let sent = h.ledger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].ft_receiver().as_deref(), Some(PLATFORM));
    }

    #[tokio::test]
    async fn test_completed_settlement_is_replayed_without_ledger_calls() {
        let h = harness(FakeLedger::new().with_registered(DOCTOR), RecordingKeeper::default());

        let first = h.orchestrator.release(&request("10000000")).await.unwrap();
        let calls_after_first = h.ledger.calls().len();
        let second = h.orchestrator.release(&request("10000000")).await.unwrap();

        assert!(second.replayed);
        assert_eq!(first.outcomes, second.outcomes);
        assert_eq!(h.ledger.calls().len(), calls_after_first);
    }

    #[tokio::test]
    async fn test_zero_fee_skips_platform_leg() {
        let h = harness(FakeLedger::new().with_registered(DOCTOR), RecordingKeeper::default());

        let report = h.orchestrator.release(&request("6")).await.unwrap();

        assert_eq!(report.status, SettlementStatus::Complete);
        assert_eq!(report.platform_tx_hash(), None);
        assert_eq!(h.ledger.sent().len(), 1);
        assert_eq!(h.ledger.sent()[0].ft_amount().as_deref(), Some("6"));
    }

    #[tokio::test]
    async fn test_record_keeper_failure_does_not_change_verdict() {
        let h = harness(FakeLedger::new().with_registered(DOCTOR), RecordingKeeper::failing());

        let report = h.orchestrator.release(&request("10000000")).await.unwrap();

        assert_eq!(report.status, SettlementStatus::Complete);
        assert_eq!(h.keeper.notices().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_inputs_rejected_before_ledger() {
        let h = harness(FakeLedger::new(), RecordingKeeper::default());

        let mut bad_account = request("100");
        bad_account.specialist_account = "Not An Account!".to_string();
        assert!(matches!(
            h.orchestrator.release(&bad_account).await.unwrap_err(),
            AppError::Settlement(SettlementError::InvalidAccount(_))
        ));

        for amount in ["0", "-5", "1.5"] {
            assert!(matches!(
                h.orchestrator.release(&request(amount)).await.unwrap_err(),
                AppError::Settlement(SettlementError::InvalidAmount(_))
            ));
        }

        assert!(h.ledger.calls().is_empty());
        assert!(h.journal.get("consult-42").is_none());
    }
}
