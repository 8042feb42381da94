use super::deposit::DepositSettlement;
use super::intake::{DepositTerms, TransactionIntake, WithdrawalTerms};
use super::lifecycle::SettlementOutcome;
use super::locks::TransactionLocks;
use super::withdrawal::WithdrawalSettlement;
use crate::config::AnchorConfig;
use crate::domain::ports::{SharedLedgerClient, SharedTransactionStore};
use crate::domain::transaction::{Transaction, TransactionKind};
use crate::error::{Result, SettlementError};

/// The main entry point for settlement.
///
/// `SettlementService` owns the store and ledger handles and shares a single
/// lock registry between intake, deposit and withdrawal operations, so no two
/// operations on the same transaction ever interleave.
pub struct SettlementService {
    store: SharedTransactionStore,
    intake: TransactionIntake,
    deposits: DepositSettlement,
    withdrawals: WithdrawalSettlement,
}

impl SettlementService {
    pub fn new(
        config: &AnchorConfig,
        store: SharedTransactionStore,
        ledger: SharedLedgerClient,
    ) -> Self {
        let locks = TransactionLocks::new();
        Self {
            intake: TransactionIntake::new(store.clone(), locks.clone(), config),
            deposits: DepositSettlement::new(store.clone(), ledger.clone(), locks.clone(), config),
            withdrawals: WithdrawalSettlement::new(store.clone(), ledger, locks, config),
            store,
        }
    }

    pub async fn create(
        &self,
        kind: TransactionKind,
        user_ledger_account: &str,
        on_change_callback: Option<String>,
    ) -> Result<Transaction> {
        self.intake
            .create(kind, user_ledger_account, on_change_callback)
            .await
    }

    pub async fn record_deposit_terms(&self, id: &str, terms: DepositTerms) -> Result<SettlementOutcome> {
        self.intake.record_deposit_terms(id, terms).await
    }

    pub async fn record_withdrawal_terms(
        &self,
        id: &str,
        terms: WithdrawalTerms,
    ) -> Result<SettlementOutcome> {
        self.intake.record_withdrawal_terms(id, terms).await
    }

    pub async fn complete_deposit(&self, id: &str) -> Result<SettlementOutcome> {
        self.deposits.complete_deposit(id).await
    }

    pub async fn verify_and_advance(&self, id: &str, ledger_ref: &str) -> Result<SettlementOutcome> {
        self.withdrawals.verify_and_advance(id, ledger_ref).await
    }

    pub async fn reopen(&self, id: &str) -> Result<SettlementOutcome> {
        self.withdrawals.reopen(id).await
    }

    pub async fn confirm_payout(&self, id: &str, payout_reference: &str) -> Result<SettlementOutcome> {
        self.withdrawals.confirm_payout(id, payout_reference).await
    }

    pub async fn transaction(&self, id: &str) -> Result<Transaction> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| SettlementError::NotFound(id.to_string()))
    }

    /// Every transaction, oldest first.
    pub async fn transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.store.all().await?)
    }
}
