use crate::application::intake::{DepositTerms, WithdrawalTerms};
use crate::application::lifecycle::SettlementOutcome;
use crate::application::service::SettlementService;
use crate::domain::transaction::{Transaction, TransactionKind};
use crate::error::SettlementError;
use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result, miette};
use rust_decimal::Decimal;
use std::fmt::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "anchorctl", author, version, about = "Operate anchor deposit and withdrawal settlement", long_about = None)]
pub struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum KindArg {
    Deposit,
    Withdrawal,
}

impl From<KindArg> for TransactionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Deposit => TransactionKind::Deposit,
            KindArg::Withdrawal => TransactionKind::Withdrawal,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a new transaction in `incomplete`
    Create {
        kind: KindArg,
        /// The user's ledger account
        account: String,
        #[arg(long)]
        callback: Option<String>,
    },
    /// Record the terms agreed for a deposit
    RecordDeposit {
        id: String,
        #[arg(long)]
        amount_in: Decimal,
        #[arg(long)]
        amount_out: Decimal,
        #[arg(long)]
        memo: Option<String>,
        #[arg(long)]
        memo_type: Option<String>,
        /// Reference of the fiat receipt
        #[arg(long)]
        external_id: Option<String>,
    },
    /// Record the terms agreed for a withdrawal
    RecordWithdrawal {
        id: String,
        #[arg(long)]
        amount_in: Decimal,
        #[arg(long)]
        amount_fee: Decimal,
        #[arg(long)]
        bank_details: Option<String>,
        #[arg(long)]
        memo: Option<String>,
        #[arg(long)]
        memo_type: Option<String>,
    },
    /// Disburse the anchored token for a funded deposit
    CompleteDeposit { id: String },
    /// Verify the user's payment for a withdrawal
    VerifyWithdrawal { id: String, ledger_tx: String },
    /// Return a failed withdrawal to pending_user_transfer_start
    Reopen { id: String },
    /// Record the fiat payout of a verified withdrawal
    ConfirmPayout { id: String, payout_ref: String },
    /// Print one transaction as JSON
    Show { id: String },
    /// List all transactions
    List,
}

impl Command {
    /// Whether the command reads from or pays on the ledger.
    pub fn needs_ledger(&self) -> bool {
        matches!(
            self,
            Command::CompleteDeposit { .. } | Command::VerifyWithdrawal { .. }
        )
    }
}

/// Runs `command` against `service` and returns what should be printed.
pub async fn execute(service: &SettlementService, command: Command) -> Result<String> {
    match command {
        Command::Create {
            kind,
            account,
            callback,
        } => {
            let tx = service
                .create(kind.into(), &account, callback)
                .await
                .into_diagnostic()?;
            Ok(format!("{} {}", tx.id, tx.status))
        }
        Command::RecordDeposit {
            id,
            amount_in,
            amount_out,
            memo,
            memo_type,
            external_id,
        } => {
            let terms = DepositTerms {
                amount_in: Some(amount_in),
                amount_out: Some(amount_out),
                memo,
                memo_type,
                external_transaction_id: external_id,
                on_change_callback: None,
            };
            let result = service.record_deposit_terms(&id, terms).await;
            report(service, &id, result).await
        }
        Command::RecordWithdrawal {
            id,
            amount_in,
            amount_fee,
            bank_details,
            memo,
            memo_type,
        } => {
            let terms = WithdrawalTerms {
                amount_in: Some(amount_in),
                amount_fee: Some(amount_fee),
                to_bank_details: bank_details,
                memo,
                memo_type,
                on_change_callback: None,
            };
            let result = service.record_withdrawal_terms(&id, terms).await;
            report(service, &id, result).await
        }
        Command::CompleteDeposit { id } => {
            let result = service.complete_deposit(&id).await;
            report(service, &id, result).await
        }
        Command::VerifyWithdrawal { id, ledger_tx } => {
            let result = service.verify_and_advance(&id, &ledger_tx).await;
            report(service, &id, result).await
        }
        Command::Reopen { id } => {
            let result = service.reopen(&id).await;
            report(service, &id, result).await
        }
        Command::ConfirmPayout { id, payout_ref } => {
            let result = service.confirm_payout(&id, &payout_ref).await;
            report(service, &id, result).await
        }
        Command::Show { id } => {
            let tx = service.transaction(&id).await.into_diagnostic()?;
            serde_json::to_string_pretty(&tx).into_diagnostic()
        }
        Command::List => {
            let transactions = service.transactions().await.into_diagnostic()?;
            let mut out = String::new();
            for tx in &transactions {
                let _ = writeln!(out, "{}", summary(tx));
            }
            Ok(out.trim_end().to_string())
        }
    }
}

/// Formats an outcome, or on failure names the status the transaction was left in.
async fn report(
    service: &SettlementService,
    id: &str,
    result: Result<SettlementOutcome, SettlementError>,
) -> Result<String> {
    match result {
        Ok(outcome) => Ok(match outcome.message {
            Some(message) => format!("{} {}: {message}", outcome.transaction_id, outcome.status),
            None => format!("{} {}", outcome.transaction_id, outcome.status),
        }),
        Err(err) => match service.transaction(id).await {
            Ok(tx) => Err(miette!("{err} (transaction is now {})", summary(&tx))),
            Err(_) => Err(miette!("{err}")),
        },
    }
}

fn summary(tx: &Transaction) -> String {
    let mut line = format!("{} {} {}", tx.id, tx.kind, tx.status);
    if let Some(message) = &tx.status_message {
        let _ = write!(line, ": {message}");
    }
    line
}
