use crate::domain::ledger::{
    LedgerAsset, LedgerOperation, LedgerTransaction, OperationAsset, PaymentRequest,
};
use crate::domain::ports::{LedgerClient, TransactionStore};
use crate::domain::transaction::{Transaction, TransactionStatus};
use crate::error::{LedgerError, StoreError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for settlement transactions.
///
/// Uses `Arc<RwLock<HashMap<String, Transaction>>>` to allow shared concurrent access.
/// Nothing survives the process; meant for tests and dry runs.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    transactions: Arc<RwLock<HashMap<String, Transaction>>>,
}

impl InMemoryTransactionStore {
    /// Creates a new, empty in-memory transaction store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn insert(&self, tx: Transaction) -> Result<(), StoreError> {
        let mut transactions = self.transactions.write().await;
        if transactions.contains_key(&tx.id) {
            return Err(StoreError::Duplicate(tx.id));
        }
        transactions.insert(tx.id.clone(), tx);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Transaction>, StoreError> {
        let transactions = self.transactions.read().await;
        Ok(transactions.get(id).cloned())
    }

    async fn compare_and_swap(
        &self,
        expected: TransactionStatus,
        tx: Transaction,
    ) -> Result<(), StoreError> {
        let mut transactions = self.transactions.write().await;
        let current = transactions
            .get(&tx.id)
            .ok_or_else(|| StoreError::Missing(tx.id.clone()))?;
        if current.status != expected {
            return Err(StoreError::Conflict {
                id: tx.id.clone(),
                expected,
                found: current.status,
            });
        }
        transactions.insert(tx.id.clone(), tx);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Transaction>, StoreError> {
        let transactions = self.transactions.read().await;
        let mut all: Vec<_> = transactions.values().cloned().collect();
        all.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        Ok(all)
    }
}

#[derive(Default)]
struct LedgerState {
    accounts: HashSet<String>,
    balances: HashMap<(String, LedgerAsset), Decimal>,
    transactions: HashMap<String, (LedgerTransaction, Vec<LedgerOperation>)>,
    submissions: Vec<PaymentRequest>,
    next_submission_error: Option<LedgerError>,
    unavailable: bool,
    submission_delay: Option<Duration>,
    sequence: u64,
}

/// A deterministic ledger that lives entirely in memory.
///
/// Payments submitted through it move balances from the configured source
/// account and are recorded as ledger transactions, so a deposit disbursed
/// here can be looked up again like a real one.
#[derive(Clone)]
pub struct InMemoryLedger {
    source_account: String,
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    /// Creates a ledger whose payments are sent from `source_account`.
    pub fn new(source_account: impl Into<String>) -> Self {
        let source_account = source_account.into();
        let mut state = LedgerState::default();
        state.accounts.insert(source_account.clone());
        Self {
            source_account,
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub async fn create_account(&self, account: &str) {
        self.state.write().await.accounts.insert(account.to_string());
    }

    pub async fn set_balance(&self, account: &str, asset: &LedgerAsset, amount: Decimal) {
        let mut state = self.state.write().await;
        state.accounts.insert(account.to_string());
        state
            .balances
            .insert((account.to_string(), asset.clone()), amount);
    }

    pub async fn balance(&self, account: &str, asset: &LedgerAsset) -> Decimal {
        let state = self.state.read().await;
        state
            .balances
            .get(&(account.to_string(), asset.clone()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Makes a transaction and its operations visible to lookups.
    pub async fn record_transaction(&self, tx: LedgerTransaction, operations: Vec<LedgerOperation>) {
        let mut state = self.state.write().await;
        state.transactions.insert(tx.hash.clone(), (tx, operations));
    }

    /// The next `submit_payment` call fails with `error` without moving funds.
    pub async fn fail_next_submission(&self, error: LedgerError) {
        self.state.write().await.next_submission_error = Some(error);
    }

    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }

    /// Holds every later `submit_payment` call for `delay` before it touches any state.
    pub async fn set_submission_delay(&self, delay: Duration) {
        self.state.write().await.submission_delay = Some(delay);
    }

    /// Every payment accepted so far, in submission order.
    pub async fn submissions(&self) -> Vec<PaymentRequest> {
        self.state.read().await.submissions.clone()
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn account_balance(
        &self,
        account: &str,
        asset: &LedgerAsset,
    ) -> Result<Decimal, LedgerError> {
        let state = self.state.read().await;
        if state.unavailable {
            return Err(LedgerError::Unavailable("in-memory ledger offline".to_string()));
        }
        if !state.accounts.contains(account) {
            return Err(LedgerError::AccountNotFound(account.to_string()));
        }
        Ok(state
            .balances
            .get(&(account.to_string(), asset.clone()))
            .copied()
            .unwrap_or(Decimal::ZERO))
    }

    async fn transaction(&self, hash: &str) -> Result<LedgerTransaction, LedgerError> {
        let state = self.state.read().await;
        if state.unavailable {
            return Err(LedgerError::Unavailable("in-memory ledger offline".to_string()));
        }
        state
            .transactions
            .get(hash)
            .map(|(tx, _)| tx.clone())
            .ok_or_else(|| LedgerError::NotFound(hash.to_string()))
    }

    async fn transaction_operations(
        &self,
        hash: &str,
    ) -> Result<Vec<LedgerOperation>, LedgerError> {
        let state = self.state.read().await;
        if state.unavailable {
            return Err(LedgerError::Unavailable("in-memory ledger offline".to_string()));
        }
        state
            .transactions
            .get(hash)
            .map(|(_, ops)| ops.clone())
            .ok_or_else(|| LedgerError::NotFound(hash.to_string()))
    }

    async fn submit_payment(&self, request: &PaymentRequest) -> Result<String, LedgerError> {
        let delay = self.state.read().await.submission_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.write().await;
        if state.unavailable {
            return Err(LedgerError::Unavailable("in-memory ledger offline".to_string()));
        }
        if let Some(err) = state.next_submission_error.take() {
            return Err(err);
        }

        let source_key = (self.source_account.clone(), request.asset.clone());
        let available = state.balances.get(&source_key).copied().unwrap_or_default();
        if available < request.amount {
            return Err(LedgerError::Rejected("op_underfunded".to_string()));
        }
        state.balances.insert(source_key, available - request.amount);
        *state
            .balances
            .entry((request.destination.clone(), request.asset.clone()))
            .or_default() += request.amount;
        state.accounts.insert(request.destination.clone());

        state.sequence += 1;
        let hash = format!("{:064x}", state.sequence);
        let ledger_tx = LedgerTransaction {
            hash: hash.clone(),
            successful: true,
            source_account: self.source_account.clone(),
            memo: Some(request.memo.clone()),
        };
        let operation = LedgerOperation::Payment {
            id: format!("{}-1", state.sequence),
            from: self.source_account.clone(),
            to: request.destination.clone(),
            asset: OperationAsset::Credit {
                code: request.asset.code.clone(),
                issuer: request.asset.issuer.clone(),
            },
            amount: request.amount,
        };
        state
            .transactions
            .insert(hash.clone(), (ledger_tx, vec![operation]));
        state.submissions.push(request.clone());
        Ok(hash)
    }
}
