//! Ledger-side records as the settlement core sees them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-native (issued) asset, identified by its code and issuer account.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Hash)]
pub struct LedgerAsset {
    pub code: String,
    pub issuer: String,
}

impl LedgerAsset {
    pub fn new(code: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            issuer: issuer.into(),
        }
    }
}

impl fmt::Display for LedgerAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.code, self.issuer)
    }
}

/// Asset moved by a ledger operation.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub enum OperationAsset {
    Native,
    Credit { code: String, issuer: String },
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct LedgerTransaction {
    pub hash: String,
    pub successful: bool,
    pub source_account: String,
    pub memo: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub enum LedgerOperation {
    Payment {
        id: String,
        from: String,
        to: String,
        asset: OperationAsset,
        amount: Decimal,
    },
    /// Any operation type the settlement path does not inspect.
    Other { id: String, kind: String },
}

impl LedgerOperation {
    pub fn id(&self) -> &str {
        match self {
            LedgerOperation::Payment { id, .. } | LedgerOperation::Other { id, .. } => id,
        }
    }
}

/// A single-operation custodial payment out of the hot wallet.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentRequest {
    pub destination: String,
    pub asset: LedgerAsset,
    pub amount: Decimal,
    pub memo: String,
}
