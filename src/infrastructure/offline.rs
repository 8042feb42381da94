//! A [`LedgerClient`] for commands that only touch the transaction store.

use crate::domain::ledger::{LedgerAsset, LedgerOperation, LedgerTransaction, PaymentRequest};
use crate::domain::ports::LedgerClient;
use crate::error::LedgerError;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Refuses every ledger call. Keeps store-only commands free of Horizon and the signing key.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineLedger;

fn offline() -> LedgerError {
    LedgerError::Unavailable("no ledger connection for this command".to_string())
}

#[async_trait]
impl LedgerClient for OfflineLedger {
    async fn account_balance(
        &self,
        _account: &str,
        _asset: &LedgerAsset,
    ) -> Result<Decimal, LedgerError> {
        Err(offline())
    }

    async fn transaction(&self, _hash: &str) -> Result<LedgerTransaction, LedgerError> {
        Err(offline())
    }

    async fn transaction_operations(
        &self,
        _hash: &str,
    ) -> Result<Vec<LedgerOperation>, LedgerError> {
        Err(offline())
    }

    async fn submit_payment(&self, _request: &PaymentRequest) -> Result<String, LedgerError> {
        Err(offline())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_call_is_unavailable() {
        let ledger = OfflineLedger;
        assert!(matches!(
            ledger.transaction("abc").await,
            Err(LedgerError::Unavailable(_))
        ));
        assert!(matches!(
            ledger
                .account_balance("GHOT", &LedgerAsset::new("USDC", "GISSUER"))
                .await,
            Err(LedgerError::Unavailable(_))
        ));
    }
}
