//! Application layer orchestrating the domain ports.
//!
//! `BalanceEngine` is the single entry point for state changes;
//! `SummaryService` is its read-only counterpart.

pub mod engine;
pub mod summary;
