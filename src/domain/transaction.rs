use crate::error::{Result, SettlementError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Deposit => f.write_str("deposit"),
            TransactionKind::Withdrawal => f.write_str("withdrawal"),
        }
    }
}

/// Lifecycle state of a [`Transaction`].
///
/// The allowed moves between states are encoded in [`TransactionStatus::can_transition_to`];
/// every mutation of a transaction's status goes through [`Transaction::transition`].
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Created, interactive flow not finished yet.
    Incomplete,
    /// Withdrawal waiting for the user's on-chain payment.
    PendingUserTransferStart,
    /// Deposit waiting for the operator to confirm the user's fiat payment.
    PendingUserTransferComplete,
    /// The anchor holds the prerequisite payment and owes the other leg.
    PendingAnchor,
    /// A deposit payment has been handed to the ledger; its outcome is not recorded yet.
    PendingStellar,
    Completed,
    Error,
}

impl TransactionStatus {
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (Incomplete, PendingUserTransferStart)
                | (Incomplete, PendingUserTransferComplete)
                | (Incomplete, Error)
                | (PendingUserTransferComplete, PendingAnchor)
                | (PendingUserTransferComplete, PendingStellar)
                | (PendingUserTransferComplete, Error)
                | (PendingUserTransferStart, PendingAnchor)
                | (PendingUserTransferStart, Error)
                | (PendingAnchor, PendingStellar)
                | (PendingAnchor, Completed)
                | (PendingAnchor, Error)
                | (PendingStellar, Completed)
                | (PendingStellar, Error)
                | (Error, PendingUserTransferStart)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == TransactionStatus::Completed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Incomplete => "incomplete",
            TransactionStatus::PendingUserTransferStart => "pending_user_transfer_start",
            TransactionStatus::PendingUserTransferComplete => "pending_user_transfer_complete",
            TransactionStatus::PendingAnchor => "pending_anchor",
            TransactionStatus::PendingStellar => "pending_stellar",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Error => "error",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fiat/token exchange attempt. Never deleted; this is the audit record.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub id: String,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub status_message: Option<String>,
    /// Code of the anchored token moved on the ledger.
    pub asset_code: String,
    pub amount_in: Option<Decimal>,
    pub amount_out: Option<Decimal>,
    pub amount_fee: Option<Decimal>,
    /// Destination of deposits, source of withdrawals.
    pub user_ledger_account: String,
    /// Where the user must pay a withdrawal into.
    pub receiving_anchor_account: Option<String>,
    pub to_bank_details: Option<String>,
    pub external_transaction_id: Option<String>,
    pub ledger_transaction_id: Option<String>,
    pub memo: Option<String>,
    pub memo_type: Option<String>,
    pub on_change_callback: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn new(
        kind: TransactionKind,
        user_ledger_account: impl Into<String>,
        asset_code: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            status: TransactionStatus::Incomplete,
            status_message: None,
            asset_code: asset_code.into(),
            amount_in: None,
            amount_out: None,
            amount_fee: None,
            user_ledger_account: user_ledger_account.into(),
            receiving_anchor_account: None,
            to_bank_details: None,
            external_transaction_id: None,
            ledger_transaction_id: None,
            memo: None,
            memo_type: None,
            on_change_callback: None,
            started_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Moves the transaction to `next`, refusing any move the state machine does not allow.
    pub fn transition(&mut self, next: TransactionStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(SettlementError::InvalidState {
                id: self.id.clone(),
                status: self.status,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Moves the transaction to `error` and records why.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        self.transition(TransactionStatus::Error)?;
        self.status_message = Some(message.into());
        Ok(())
    }
}
