use crate::error::SettlementError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A strictly positive token or currency amount.
///
/// Terms recorded from the interactive flow go through this type so a zero or
/// negative amount never reaches the settlement path.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, SettlementError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(SettlementError::InvalidTerms(format!(
                "amount must be positive, got {value}"
            )))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Subtracts a fee, which may be zero but never exceed the amount.
    pub fn less_fee(&self, fee: Decimal) -> Result<Decimal, SettlementError> {
        if fee < Decimal::ZERO || fee > self.0 {
            return Err(SettlementError::InvalidTerms(format!(
                "fee {fee} must be between 0 and {}",
                self.0
            )));
        }
        Ok(self.0 - fee)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = SettlementError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}
