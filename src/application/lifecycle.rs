use crate::domain::ports::TransactionStore;
use crate::domain::transaction::{Transaction, TransactionKind, TransactionStatus};
use crate::error::{Result, SettlementError};
use serde::Serialize;
use tracing::error;

/// What a settlement operation left behind: the transaction's status and message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettlementOutcome {
    pub transaction_id: String,
    pub status: TransactionStatus,
    pub message: Option<String>,
    pub ledger_transaction_id: Option<String>,
}

impl From<&Transaction> for SettlementOutcome {
    fn from(tx: &Transaction) -> Self {
        Self {
            transaction_id: tx.id.clone(),
            status: tx.status,
            message: tx.status_message.clone(),
            ledger_transaction_id: tx.ledger_transaction_id.clone(),
        }
    }
}

/// Loads a transaction of the given kind; any other kind counts as not found.
pub(crate) async fn load(
    store: &dyn TransactionStore,
    id: &str,
    kind: TransactionKind,
) -> Result<Transaction> {
    match store.get(id).await? {
        Some(tx) if tx.kind == kind => Ok(tx),
        _ => Err(SettlementError::NotFound(id.to_string())),
    }
}

/// Persists `tx` provided nobody changed the record away from `expected` since it was loaded.
pub(crate) async fn commit(
    store: &dyn TransactionStore,
    expected: TransactionStatus,
    tx: Transaction,
) -> Result<SettlementOutcome> {
    let outcome = SettlementOutcome::from(&tx);
    store.compare_and_swap(expected, tx).await?;
    Ok(outcome)
}

/// Moves `tx` to `error` with `message`, persists it and hands back `cause` for the caller.
pub(crate) async fn record_failure(
    store: &dyn TransactionStore,
    mut tx: Transaction,
    message: String,
    cause: SettlementError,
) -> SettlementError {
    let expected = tx.status;
    if let Err(err) = tx.fail(message) {
        return err;
    }
    let id = tx.id.clone();
    match store.compare_and_swap(expected, tx).await {
        Ok(()) => cause,
        Err(err) => {
            error!(transaction_id = %id, cause = %cause, error = %err, "failed to record transaction failure");
            err.into()
        }
    }
}
