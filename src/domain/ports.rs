use super::ledger::{LedgerAsset, LedgerOperation, LedgerTransaction, PaymentRequest};
use super::transaction::{Transaction, TransactionStatus};
use crate::error::{LedgerError, StoreError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Durable record store for settlement transactions.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Stores a new record; fails with [`StoreError::Duplicate`] if the id is taken.
    async fn insert(&self, tx: Transaction) -> Result<(), StoreError>;
    async fn get(&self, id: &str) -> Result<Option<Transaction>, StoreError>;
    /// Replaces the stored record only if its status still equals `expected`.
    async fn compare_and_swap(
        &self,
        expected: TransactionStatus,
        tx: Transaction,
    ) -> Result<(), StoreError>;
    async fn all(&self) -> Result<Vec<Transaction>, StoreError>;
}

/// Read and write access to the blockchain ledger.
///
/// Implementations perform no retries of their own.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Balance of `asset` held by `account`; zero when the account holds no such line.
    async fn account_balance(&self, account: &str, asset: &LedgerAsset)
    -> Result<Decimal, LedgerError>;
    async fn transaction(&self, hash: &str) -> Result<LedgerTransaction, LedgerError>;
    async fn transaction_operations(&self, hash: &str)
    -> Result<Vec<LedgerOperation>, LedgerError>;
    /// Builds, signs and submits a hot wallet payment, returning the ledger hash.
    async fn submit_payment(&self, request: &PaymentRequest) -> Result<String, LedgerError>;
}

pub type SharedTransactionStore = Arc<dyn TransactionStore>;
pub type SharedLedgerClient = Arc<dyn LedgerClient>;
