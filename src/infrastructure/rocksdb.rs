use crate::domain::ports::TransactionStore;
use crate::domain::transaction::{Transaction, TransactionStatus};
use crate::error::StoreError;
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing transaction records.
pub const CF_TRANSACTIONS: &str = "transactions";

/// A persistent store implementation using RocksDB.
///
/// Records are stored as JSON under their id in a dedicated column family.
/// RocksDB's directory lock keeps other processes out, so the in-process
/// `write_lock` is enough to make read-compare-write atomic.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the "transactions" column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_transactions = ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_transactions])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn read(&self, id: &str) -> Result<Option<Transaction>, StoreError> {
        let cf = self.cf()?;
        match self.db.get_pinned_cf(&cf, id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write(&self, tx: &Transaction) -> Result<(), StoreError> {
        let cf = self.cf()?;
        let value = serde_json::to_vec(tx)?;
        self.db.put_cf(&cf, tx.id.as_bytes(), value)?;
        Ok(())
    }

    fn cf(&self) -> Result<&rocksdb::ColumnFamily, StoreError> {
        self.db
            .cf_handle(CF_TRANSACTIONS)
            .ok_or_else(|| StoreError::Backend("transactions column family not found".to_string()))
    }
}

#[async_trait]
impl TransactionStore for RocksDBStore {
    async fn insert(&self, tx: Transaction) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        if self.read(&tx.id)?.is_some() {
            return Err(StoreError::Duplicate(tx.id));
        }
        self.write(&tx)
    }

    async fn get(&self, id: &str) -> Result<Option<Transaction>, StoreError> {
        self.read(id)
    }

    async fn compare_and_swap(
        &self,
        expected: TransactionStatus,
        tx: Transaction,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let current = self
            .read(&tx.id)?
            .ok_or_else(|| StoreError::Missing(tx.id.clone()))?;
        if current.status != expected {
            return Err(StoreError::Conflict {
                id: tx.id,
                expected,
                found: current.status,
            });
        }
        self.write(&tx)
    }

    async fn all(&self) -> Result<Vec<Transaction>, StoreError> {
        let cf = self.cf()?;
        let mut transactions = Vec::new();
        for item in self.db.iterator_cf(&cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            transactions.push(serde_json::from_slice::<Transaction>(&value)?);
        }
        transactions.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        Ok(transactions)
    }
}
