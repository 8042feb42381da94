//! Application layer containing the settlement logic.
//!
//! `SettlementService` is the entry point. Deposits and withdrawals each get
//! their own component; all of them load, check and persist transactions
//! through the helpers in `lifecycle` while holding the transaction's lock.

pub mod deposit;
pub mod intake;
pub mod lifecycle;
pub mod locks;
pub mod service;
pub mod verifier;
pub mod withdrawal;
