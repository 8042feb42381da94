use crate::domain::ledger::{LedgerAsset, LedgerOperation, OperationAsset};
use crate::domain::ports::SharedLedgerClient;
use crate::error::LedgerError;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

/// Slack allowed below the expected amount, absorbing upstream rounding (0.01).
pub const AMOUNT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// The payment a ledger transaction must contain.
#[derive(Debug, Clone)]
pub struct PaymentExpectation<'a> {
    pub destination: &'a str,
    pub asset: &'a LedgerAsset,
    pub min_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    Verified { operation_id: String, amount: Decimal },
    NotFound,
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Verified { .. })
    }
}

/// Checks whether a ledger transaction carries a qualifying payment. Read-only.
#[derive(Clone)]
pub struct PaymentVerifier {
    ledger: SharedLedgerClient,
}

impl PaymentVerifier {
    pub fn new(ledger: SharedLedgerClient) -> Self {
        Self { ledger }
    }

    /// Fetches the operations of `ledger_ref` and scans them for the expected payment.
    ///
    /// A missing payment is `Ok(Verification::NotFound)`; only a failed ledger
    /// query is an error.
    pub async fn verify(
        &self,
        ledger_ref: &str,
        expectation: &PaymentExpectation<'_>,
    ) -> Result<Verification, LedgerError> {
        let operations = self.ledger.transaction_operations(ledger_ref).await?;
        Ok(find_payment(ledger_ref, &operations, expectation))
    }
}

/// Returns the first operation satisfying `expectation`.
pub fn find_payment(
    ledger_ref: &str,
    operations: &[LedgerOperation],
    expectation: &PaymentExpectation<'_>,
) -> Verification {
    for op in operations {
        let LedgerOperation::Payment {
            id,
            to,
            asset,
            amount,
            ..
        } = op
        else {
            debug!(ledger_tx = ledger_ref, operation = op.id(), "skipping non-payment operation");
            continue;
        };

        if to != expectation.destination {
            warn!(ledger_tx = ledger_ref, operation = %id, expected = expectation.destination, got = %to, "payment destination mismatch");
            continue;
        }

        let (code, issuer) = match asset {
            OperationAsset::Native => {
                warn!(ledger_tx = ledger_ref, operation = %id, "native payment, not the anchored asset");
                continue;
            }
            OperationAsset::Credit { code, issuer } => (code, issuer),
        };

        if *code != expectation.asset.code {
            warn!(ledger_tx = ledger_ref, operation = %id, expected = %expectation.asset.code, got = %code, "asset code mismatch");
            continue;
        }
        if *issuer != expectation.asset.issuer {
            warn!(ledger_tx = ledger_ref, operation = %id, expected = %expectation.asset.issuer, got = %issuer, "asset issuer mismatch");
            continue;
        }
        if *amount < expectation.min_amount - AMOUNT_TOLERANCE {
            warn!(ledger_tx = ledger_ref, operation = %id, expected = %expectation.min_amount, got = %amount, "payment amount too low");
            continue;
        }

        info!(ledger_tx = ledger_ref, operation = %id, amount = %amount, destination = expectation.destination, "payment verified");
        return Verification::Verified {
            operation_id: id.clone(),
            amount: *amount,
        };
    }

    warn!(ledger_tx = ledger_ref, "no matching payment found");
    Verification::NotFound
}
