//! Wallet ledger: per-user balances, charge/debit/transfer under atomic
//! conditional mutation, an append-only history, and best-effort
//! notifications.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
