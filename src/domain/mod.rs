//! Domain types and the ports the settlement core depends on.

pub mod amount;
pub mod ledger;
pub mod ports;
pub mod transaction;
