//! Collaborator ports consumed by the application layer.
//!
//! The wallet store is the only mutable shared resource in the system and
//! the sole serialization point for same-wallet operations: every mutation
//! goes through a single atomic conditional call, never through a separate
//! read-compute-write sequence.

use super::history::{HistoryRecord, LocationId};
use super::notification::NotificationEvent;
use super::user::{User, UserId};
use super::wallet::{Amount, Balance, Wallet, WalletId};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub type WalletStoreRef = Arc<dyn WalletStore>;
pub type HistoryLedgerRef = Arc<dyn HistoryLedger>;
pub type NotifierRef = Arc<dyn Notifier>;
pub type UserDirectoryRef = Arc<dyn UserDirectory>;
pub type LocationDirectoryRef = Arc<dyn LocationDirectory>;

/// Store-level failure of an atomic mutation. The engine maps these onto
/// the domain taxonomy; adapters never speak domain language.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    #[error("precondition failed")]
    Insufficient,
    #[error("resulting balance not representable")]
    Overflow,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Signed balance mutation, expressed in validated positive amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delta {
    Credit(Amount),
    Debit(Amount),
}

impl Delta {
    pub fn signed(self) -> i64 {
        match self {
            Self::Credit(a) => a.as_delta(),
            Self::Debit(a) => -a.as_delta(),
        }
    }
}

/// Condition that must hold at the instant of mutation, not merely at an
/// earlier read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    None,
    BalanceAtLeast(Amount),
}

impl Precondition {
    pub fn holds(self, balance: Balance) -> bool {
        match self {
            Self::None => true,
            Self::BalanceAtLeast(min) => balance.value() >= min.value(),
        }
    }
}

/// Durable key-value store of wallet records.
///
/// `apply_delta` and `apply_transfer` are the only mutation paths and must
/// be indivisible with respect to all other mutators of the touched
/// records. Implementations enforce `balance >= 0` regardless of the
/// supplied precondition.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Creates a wallet record; `Conflict` if the id is already present.
    async fn create(&self, wallet: Wallet) -> std::result::Result<(), StoreError>;

    async fn get(&self, wallet_id: &WalletId) -> std::result::Result<Wallet, StoreError>;

    /// Resolves the wallet owned by `user_id`.
    async fn wallet_for_user(&self, user_id: &UserId)
    -> std::result::Result<Wallet, StoreError>;

    /// Atomically applies `delta` iff `precondition` holds against the
    /// balance at the instant of mutation. Returns the committed balance.
    async fn apply_delta(
        &self,
        wallet_id: &WalletId,
        delta: Delta,
        precondition: Precondition,
    ) -> std::result::Result<Balance, StoreError>;

    /// Atomically debits `amount` from one record and credits it to the
    /// other, all-or-nothing. `precondition` is evaluated against the
    /// source balance. Returns both committed balances, source first.
    async fn apply_transfer(
        &self,
        from: &WalletId,
        to: &WalletId,
        amount: Amount,
        precondition: Precondition,
    ) -> std::result::Result<(Balance, Balance), StoreError>;
}

/// Append-only audit trail of applied operations.
#[async_trait]
pub trait HistoryLedger: Send + Sync {
    async fn append(&self, record: HistoryRecord) -> Result<()>;

    /// All rows for a wallet, newest first; a fresh query per call.
    async fn list_by_wallet(&self, wallet_id: &WalletId) -> Result<Vec<HistoryRecord>>;
}

/// Fire-and-forget dispatch of operation outcomes. Delivery failure must
/// never block or reverse the balance mutation that produced the event.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn emit(&self, event: NotificationEvent) -> Result<()>;
}

/// Directory of registered users; the registration target and the
/// read-only source of display names.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn create(&self, user: User) -> std::result::Result<(), StoreError>;
    async fn get(&self, user_id: &UserId) -> Result<Option<User>>;
}

/// Maps location ids to human-readable names; may know nothing about an id.
#[async_trait]
pub trait LocationDirectory: Send + Sync {
    async fn name_of(&self, location_id: &LocationId) -> Result<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_sign() {
        let amount = Amount::new(25).unwrap();
        assert_eq!(Delta::Credit(amount).signed(), 25);
        assert_eq!(Delta::Debit(amount).signed(), -25);
    }

    #[test]
    fn precondition_holds_at_boundary() {
        let min = Amount::new(100).unwrap();
        let p = Precondition::BalanceAtLeast(min);
        assert!(p.holds(Balance::new(100).unwrap()));
        assert!(!p.holds(Balance::new(99).unwrap()));
        assert!(Precondition::None.holds(Balance::ZERO));
    }
}
