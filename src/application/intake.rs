use super::lifecycle::{SettlementOutcome, commit, load, record_failure};
use super::locks::TransactionLocks;
use crate::config::AnchorConfig;
use crate::domain::amount::Amount;
use crate::domain::ports::SharedTransactionStore;
use crate::domain::transaction::{Transaction, TransactionKind, TransactionStatus};
use crate::error::{Result, SettlementError};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

pub const INVALID_TERMS_MESSAGE: &str = "invalid amount or amount_fee from interactive callback";

/// What the interactive deposit flow settled on with the user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepositTerms {
    /// Fiat the user will send.
    pub amount_in: Option<Decimal>,
    /// Tokens the user will receive; the difference is the fee.
    pub amount_out: Option<Decimal>,
    pub memo: Option<String>,
    pub memo_type: Option<String>,
    /// Reference of the fiat receipt, when already known.
    pub external_transaction_id: Option<String>,
    pub on_change_callback: Option<String>,
}

/// What the interactive withdrawal flow settled on with the user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WithdrawalTerms {
    /// Tokens the user will send.
    pub amount_in: Option<Decimal>,
    pub amount_fee: Option<Decimal>,
    pub to_bank_details: Option<String>,
    pub memo: Option<String>,
    pub memo_type: Option<String>,
    pub on_change_callback: Option<String>,
}

/// Opens transactions and records the terms agreed in the interactive flow.
pub struct TransactionIntake {
    store: SharedTransactionStore,
    locks: TransactionLocks,
    receiving_account: String,
    asset_code: String,
}

impl TransactionIntake {
    pub fn new(store: SharedTransactionStore, locks: TransactionLocks, config: &AnchorConfig) -> Self {
        Self {
            store,
            locks,
            receiving_account: config.receiving_account.clone(),
            asset_code: config.asset.code.clone(),
        }
    }

    /// Opens an `incomplete` transaction for `user_ledger_account`.
    pub async fn create(
        &self,
        kind: TransactionKind,
        user_ledger_account: &str,
        on_change_callback: Option<String>,
    ) -> Result<Transaction> {
        let mut tx = Transaction::new(kind, user_ledger_account, self.asset_code.clone());
        tx.on_change_callback = on_change_callback;
        self.store.insert(tx.clone()).await?;
        info!(transaction_id = %tx.id, kind = %kind, account = user_ledger_account, "transaction created");
        Ok(tx)
    }

    /// Records deposit terms and moves the deposit to `pending_user_transfer_complete`.
    pub async fn record_deposit_terms(
        &self,
        id: &str,
        terms: DepositTerms,
    ) -> Result<SettlementOutcome> {
        let _guard = self.locks.acquire(id).await;
        let store = self.store.as_ref();

        let tx = load(store, id, TransactionKind::Deposit).await?;
        ensure_incomplete(&tx)?;

        let amounts = terms
            .amount_in
            .zip(terms.amount_out)
            .ok_or_else(|| SettlementError::InvalidTerms("missing amount_in or amount_out".to_string()))
            .and_then(|(amount_in, amount_out)| {
                let amount_in = Amount::new(amount_in)?;
                Amount::new(amount_out)?;
                let fee = amount_in.value() - amount_out;
                amount_in.less_fee(fee)?;
                Ok((amount_in.value(), amount_out, fee))
            });
        let (amount_in, amount_out, fee) = match amounts {
            Ok(amounts) => amounts,
            Err(cause) => return Err(self.reject(tx, cause).await),
        };

        let expected = tx.status;
        let mut updated = tx;
        updated.amount_in = Some(amount_in);
        updated.amount_out = Some(amount_out);
        updated.amount_fee = Some(fee);
        updated.memo = terms.memo;
        updated.memo_type = terms.memo_type;
        updated.external_transaction_id = terms.external_transaction_id;
        if terms.on_change_callback.is_some() {
            updated.on_change_callback = terms.on_change_callback;
        }
        updated.transition(TransactionStatus::PendingUserTransferComplete)?;

        let outcome = commit(store, expected, updated).await?;
        info!(transaction_id = id, amount_in = %amount_in, amount_out = %amount_out, "deposit terms recorded");
        Ok(outcome)
    }

    /// Records withdrawal terms and moves the withdrawal to `pending_user_transfer_start`.
    ///
    /// `amount_out` is derived once here and never recomputed.
    pub async fn record_withdrawal_terms(
        &self,
        id: &str,
        terms: WithdrawalTerms,
    ) -> Result<SettlementOutcome> {
        let _guard = self.locks.acquire(id).await;
        let store = self.store.as_ref();

        let tx = load(store, id, TransactionKind::Withdrawal).await?;
        ensure_incomplete(&tx)?;

        let amounts = terms
            .amount_in
            .zip(terms.amount_fee)
            .ok_or_else(|| SettlementError::InvalidTerms("missing amount_in or amount_fee".to_string()))
            .and_then(|(amount_in, fee)| {
                let amount_in = Amount::new(amount_in)?;
                Ok((amount_in.value(), fee, amount_in.less_fee(fee)?))
            });
        let (amount_in, fee, amount_out) = match amounts {
            Ok(amounts) => amounts,
            Err(cause) => return Err(self.reject(tx, cause).await),
        };

        let expected = tx.status;
        let mut updated = tx;
        updated.amount_in = Some(amount_in);
        updated.amount_fee = Some(fee);
        updated.amount_out = Some(amount_out);
        updated.to_bank_details = terms.to_bank_details;
        updated.receiving_anchor_account = Some(self.receiving_account.clone());
        updated.memo = terms.memo;
        updated.memo_type = terms.memo_type;
        if terms.on_change_callback.is_some() {
            updated.on_change_callback = terms.on_change_callback;
        }
        updated.transition(TransactionStatus::PendingUserTransferStart)?;

        let outcome = commit(store, expected, updated).await?;
        info!(transaction_id = id, amount_in = %amount_in, amount_out = %amount_out, "withdrawal terms recorded");
        Ok(outcome)
    }

    async fn reject(&self, tx: Transaction, cause: SettlementError) -> SettlementError {
        warn!(transaction_id = %tx.id, reason = %cause, "rejecting interactive terms");
        record_failure(self.store.as_ref(), tx, INVALID_TERMS_MESSAGE.to_string(), cause).await
    }
}

fn ensure_incomplete(tx: &Transaction) -> Result<()> {
    if tx.status == TransactionStatus::Incomplete {
        Ok(())
    } else {
        Err(SettlementError::InvalidState {
            id: tx.id.clone(),
            status: tx.status,
        })
    }
}
