use super::lifecycle::{SettlementOutcome, commit, load, record_failure};
use super::locks::TransactionLocks;
use crate::config::AnchorConfig;
use crate::domain::ledger::{LedgerAsset, PaymentRequest};
use crate::domain::ports::{SharedLedgerClient, SharedTransactionStore};
use crate::domain::transaction::{TransactionKind, TransactionStatus};
use crate::error::{LedgerError, Result, SettlementError};
use chrono::Utc;
use tracing::{error, info, warn};

/// Status message left on a deposit whose payment may or may not have reached the ledger.
pub const UNCONFIRMED_MESSAGE: &str = "submission unconfirmed: needs manual reconciliation";

/// Text memos are capped at 28 bytes; "Deposit " takes 8.
const MEMO_ID_CHARS: usize = 20;

pub fn deposit_memo(transaction_id: &str) -> String {
    let id: String = transaction_id.chars().take(MEMO_ID_CHARS).collect();
    format!("Deposit {id}")
}

/// Drives deposits from confirmed fiat receipt to custodial disbursement.
pub struct DepositSettlement {
    store: SharedTransactionStore,
    ledger: SharedLedgerClient,
    locks: TransactionLocks,
    hot_wallet_account: String,
    asset: LedgerAsset,
}

impl DepositSettlement {
    pub fn new(
        store: SharedTransactionStore,
        ledger: SharedLedgerClient,
        locks: TransactionLocks,
        config: &AnchorConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            locks,
            hot_wallet_account: config.hot_wallet_account.clone(),
            asset: config.asset.clone(),
        }
    }

    /// Sends `amount_out` of the anchored token from the hot wallet to the user.
    ///
    /// Only valid from `pending_user_transfer_complete` or `pending_anchor`.
    /// An underfunded hot wallet leaves the transaction untouched so the
    /// operator can top up and retry. Before submitting, the deposit is moved to
    /// `pending_stellar`; from there it only leaves for `completed` or `error`,
    /// so a payment is never sent twice.
    pub async fn complete_deposit(&self, id: &str) -> Result<SettlementOutcome> {
        let _guard = self.locks.acquire(id).await;
        let store = self.store.as_ref();

        let tx = load(store, id, TransactionKind::Deposit).await?;
        if !matches!(
            tx.status,
            TransactionStatus::PendingUserTransferComplete | TransactionStatus::PendingAnchor
        ) {
            warn!(transaction_id = id, status = %tx.status, "deposit not ready for disbursement");
            return Err(SettlementError::InvalidState {
                id: tx.id,
                status: tx.status,
            });
        }
        let required = tx.amount_out.ok_or_else(|| {
            SettlementError::InvalidTerms(format!("deposit {id} has no amount_out"))
        })?;
        info!(transaction_id = id, amount = %required, "processing deposit completion");

        let available = match self
            .ledger
            .account_balance(&self.hot_wallet_account, &self.asset)
            .await
        {
            Ok(balance) => balance,
            Err(err) => {
                error!(transaction_id = id, error = %err, "hot wallet balance query failed");
                let message = format!("ledger error: {err}");
                return Err(record_failure(store, tx, message, err.into()).await);
            }
        };
        if available < required {
            warn!(transaction_id = id, required = %required, available = %available, "insufficient hot wallet balance");
            return Err(SettlementError::InsufficientFunds {
                required,
                available,
            });
        }

        // Claim the deposit before touching the ledger. `pending_stellar` is not an
        // entry state, so any other caller fails here or at load time.
        let memo = deposit_memo(&tx.id);
        let entry_status = tx.status;
        let mut claimed = tx;
        claimed.transition(TransactionStatus::PendingStellar)?;
        claimed.status_message = Some(format!("payment submitted with memo {memo:?}"));
        commit(store, entry_status, claimed.clone()).await?;

        let request = PaymentRequest {
            destination: claimed.user_ledger_account.clone(),
            asset: self.asset.clone(),
            amount: required,
            memo,
        };
        let hash = match self.ledger.submit_payment(&request).await {
            Ok(hash) => hash,
            Err(LedgerError::SubmissionUnconfirmed(reason)) => {
                error!(transaction_id = id, reason = %reason, "deposit payment outcome unknown");
                let cause = SettlementError::Ledger(LedgerError::SubmissionUnconfirmed(reason));
                return Err(
                    record_failure(store, claimed, UNCONFIRMED_MESSAGE.to_string(), cause).await,
                );
            }
            Err(err) => {
                error!(transaction_id = id, error = %err, "deposit payment failed");
                let message = format!("ledger error: {err}");
                return Err(record_failure(store, claimed, message, err.into()).await);
            }
        };

        let mut completed = claimed.clone();
        completed.transition(TransactionStatus::Completed)?;
        completed.status_message = None;
        completed.ledger_transaction_id = Some(hash.clone());
        completed.completed_at = Some(Utc::now());

        match commit(store, TransactionStatus::PendingStellar, completed).await {
            Ok(outcome) => {
                info!(transaction_id = id, ledger_tx = %hash, amount = %required, "deposit completed");
                Ok(outcome)
            }
            Err(err) => {
                error!(transaction_id = id, ledger_tx = %hash, error = %err, "payment sent but completion not recorded");
                let message = format!("payment {hash} sent but completion not recorded: {err}");
                claimed.ledger_transaction_id = Some(hash);
                Err(record_failure(store, claimed, message, err).await)
            }
        }
    }
}
