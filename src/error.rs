use crate::domain::transaction::TransactionStatus;
use rust_decimal::Decimal;
use thiserror::Error;

/// Failures raised by a [`TransactionStore`](crate::domain::ports::TransactionStore) backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("transaction {0} already exists")]
    Duplicate(String),
    #[error("transaction {0} does not exist")]
    Missing(String),
    #[error("transaction {id} was modified concurrently (expected status {expected}, found {found})")]
    Conflict {
        id: String,
        expected: TransactionStatus,
        found: TransactionStatus,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage backend error: {0}")]
    Backend(String),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for StoreError {
    fn from(err: rocksdb::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Failures raised by a [`LedgerClient`](crate::domain::ports::LedgerClient).
///
/// Messages never carry key material; adapters only ever format account ids,
/// hashes and ledger result codes into them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
    #[error("ledger account {0} not found")]
    AccountNotFound(String),
    #[error("ledger transaction {0} not found")]
    NotFound(String),
    #[error("ledger rejected payment: {0}")]
    Rejected(String),
    #[error("payment submission outcome unknown: {0}")]
    SubmissionUnconfirmed(String),
    #[error("{0:?} is not a ledger transaction hash")]
    InvalidHash(String),
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Errors returned by the settlement operations.
#[derive(Error, Debug)]
pub enum SettlementError {
    #[error("transaction {0} not found")]
    NotFound(String),
    #[error("transaction {id} is in status {status}, which does not permit this operation")]
    InvalidState { id: String, status: TransactionStatus },
    #[error("insufficient hot wallet balance: required {required}, available {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },
    #[error("payment verification failed for transaction {id} (ledger transaction {ledger_tx})")]
    VerificationFailed { id: String, ledger_tx: String },
    #[error("invalid transaction terms: {0}")]
    InvalidTerms(String),
    #[error("transaction {0} was modified by a concurrent settlement operation")]
    Conflict(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for SettlementError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { id, .. } => SettlementError::Conflict(id),
            StoreError::Missing(id) => SettlementError::NotFound(id),
            other => SettlementError::Store(other),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required configuration variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

pub type Result<T, E = SettlementError> = std::result::Result<T, E>;
