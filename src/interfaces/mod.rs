//! Operator-facing surfaces.

pub mod cli;
