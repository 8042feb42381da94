use super::lifecycle::{SettlementOutcome, commit, load, record_failure};
use super::locks::TransactionLocks;
use super::verifier::{PaymentExpectation, PaymentVerifier, Verification};
use crate::config::AnchorConfig;
use crate::domain::ledger::LedgerAsset;
use crate::domain::ports::{SharedLedgerClient, SharedTransactionStore};
use crate::domain::transaction::{TransactionKind, TransactionStatus};
use crate::error::{Result, SettlementError};
use chrono::Utc;
use tracing::{error, info, warn};

pub const VERIFICATION_FAILED_MESSAGE: &str = "payment verification failed";

/// Drives withdrawals from the user's on-chain payment to the fiat payout.
pub struct WithdrawalSettlement {
    store: SharedTransactionStore,
    ledger: SharedLedgerClient,
    verifier: PaymentVerifier,
    locks: TransactionLocks,
    asset: LedgerAsset,
}

impl WithdrawalSettlement {
    pub fn new(
        store: SharedTransactionStore,
        ledger: SharedLedgerClient,
        locks: TransactionLocks,
        config: &AnchorConfig,
    ) -> Self {
        Self {
            verifier: PaymentVerifier::new(ledger.clone()),
            store,
            ledger,
            locks,
            asset: config.asset.clone(),
        }
    }

    /// Confirms that `ledger_ref` pays `amount_in` of the anchored token into
    /// the receiving account, then moves the withdrawal to `pending_anchor`.
    ///
    /// Anything short of a confirmed payment moves it to `error`; use
    /// [`WithdrawalSettlement::reopen`] before trying another reference.
    pub async fn verify_and_advance(&self, id: &str, ledger_ref: &str) -> Result<SettlementOutcome> {
        let _guard = self.locks.acquire(id).await;
        let store = self.store.as_ref();

        let tx = load(store, id, TransactionKind::Withdrawal).await?;
        if tx.status != TransactionStatus::PendingUserTransferStart {
            warn!(transaction_id = id, status = %tx.status, "withdrawal not awaiting a user transfer");
            return Err(SettlementError::InvalidState {
                id: tx.id,
                status: tx.status,
            });
        }
        let (Some(min_amount), Some(destination)) = (tx.amount_in, tx.receiving_anchor_account.clone())
        else {
            return Err(SettlementError::InvalidTerms(format!(
                "withdrawal {id} has no amount_in or receiving account"
            )));
        };
        info!(transaction_id = id, ledger_tx = ledger_ref, "verifying withdrawal payment");

        let verification = match self.ledger.transaction(ledger_ref).await {
            Ok(ledger_tx) if !ledger_tx.successful => {
                warn!(transaction_id = id, ledger_tx = ledger_ref, "ledger transaction failed on chain");
                Ok(Verification::NotFound)
            }
            Ok(ledger_tx) => {
                let expectation = PaymentExpectation {
                    destination: &destination,
                    asset: &self.asset,
                    min_amount,
                };
                self.verifier.verify(&ledger_tx.hash, &expectation).await
            }
            Err(err) => Err(err),
        };

        match verification {
            Ok(Verification::Verified { amount, .. }) => {
                let expected = tx.status;
                let mut advanced = tx;
                advanced.transition(TransactionStatus::PendingAnchor)?;
                advanced.ledger_transaction_id = Some(ledger_ref.to_string());
                let payout = advanced.amount_out;
                let outcome = commit(store, expected, advanced).await?;
                info!(transaction_id = id, ledger_tx = ledger_ref, received = %amount, payout = ?payout, "withdrawal payment verified, fiat payout pending");
                Ok(outcome)
            }
            Ok(Verification::NotFound) => {
                error!(transaction_id = id, ledger_tx = ledger_ref, "withdrawal payment verification failed");
                let cause = SettlementError::VerificationFailed {
                    id: id.to_string(),
                    ledger_tx: ledger_ref.to_string(),
                };
                Err(record_failure(store, tx, VERIFICATION_FAILED_MESSAGE.to_string(), cause).await)
            }
            Err(err) => {
                error!(transaction_id = id, ledger_tx = ledger_ref, error = %err, "ledger error while verifying withdrawal");
                let message = format!("ledger error: {err}");
                Err(record_failure(store, tx, message, err.into()).await)
            }
        }
    }

    /// Returns a failed withdrawal to `pending_user_transfer_start` so a
    /// corrected ledger reference can be verified.
    pub async fn reopen(&self, id: &str) -> Result<SettlementOutcome> {
        let _guard = self.locks.acquire(id).await;
        let store = self.store.as_ref();

        let tx = load(store, id, TransactionKind::Withdrawal).await?;
        if tx.status != TransactionStatus::Error {
            return Err(SettlementError::InvalidState {
                id: tx.id,
                status: tx.status,
            });
        }
        let expected = tx.status;
        let previous = tx.status_message.clone();
        let mut reopened = tx;
        reopened.transition(TransactionStatus::PendingUserTransferStart)?;
        reopened.status_message = None;
        reopened.ledger_transaction_id = None;

        let outcome = commit(store, expected, reopened).await?;
        info!(transaction_id = id, previous_error = ?previous, "withdrawal reopened");
        Ok(outcome)
    }

    /// Records that the fiat payout for a verified withdrawal has been made.
    pub async fn confirm_payout(&self, id: &str, payout_reference: &str) -> Result<SettlementOutcome> {
        let _guard = self.locks.acquire(id).await;
        let store = self.store.as_ref();

        let tx = load(store, id, TransactionKind::Withdrawal).await?;
        if tx.status != TransactionStatus::PendingAnchor {
            return Err(SettlementError::InvalidState {
                id: tx.id,
                status: tx.status,
            });
        }
        let expected = tx.status;
        let mut completed = tx;
        completed.transition(TransactionStatus::Completed)?;
        completed.external_transaction_id = Some(payout_reference.to_string());
        completed.completed_at = Some(Utc::now());

        let outcome = commit(store, expected, completed).await?;
        info!(transaction_id = id, payout_reference, "withdrawal payout confirmed");
        Ok(outcome)
    }
}
