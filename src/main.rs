use anchor_settlement::application::service::SettlementService;
use anchor_settlement::config::AnchorConfig;
use anchor_settlement::domain::ports::{SharedLedgerClient, SharedTransactionStore};
use anchor_settlement::infrastructure::horizon::HorizonLedger;
use anchor_settlement::infrastructure::in_memory::InMemoryTransactionStore;
use anchor_settlement::infrastructure::offline::OfflineLedger;
#[cfg(feature = "storage-rocksdb")]
use anchor_settlement::infrastructure::rocksdb::RocksDBStore;
use anchor_settlement::interfaces::cli::{self, Cli};
use anchor_settlement::telemetry;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use std::sync::Arc;

fn open_store(db_path: Option<PathBuf>) -> Result<SharedTransactionStore> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => Ok(Arc::new(RocksDBStore::open(path).into_diagnostic()?)),
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Arc::new(InMemoryTransactionStore::new()))
        }
        None => Ok(Arc::new(InMemoryTransactionStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();
    let cli = Cli::parse();

    let store = open_store(cli.db_path)?;
    let config = AnchorConfig::from_env().into_diagnostic()?;
    let ledger: SharedLedgerClient = if cli.command.needs_ledger() {
        Arc::new(HorizonLedger::new(&config).into_diagnostic()?)
    } else {
        Arc::new(OfflineLedger)
    };
    let service = SettlementService::new(&config, store, ledger);

    let output = cli::execute(&service, cli.command).await?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
