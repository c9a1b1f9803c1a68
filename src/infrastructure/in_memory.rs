//! In-memory adapters for the domain ports.
//!
//! The wallet store keeps every record behind one `RwLock`; holding the
//! write guard across the read-check-write of a conditional mutation makes
//! each call indivisible with respect to all other mutators, which is the
//! atomicity contract the engine relies on.

use crate::domain::history::{HistoryRecord, LocationId};
use crate::domain::notification::NotificationEvent;
use crate::domain::ports::{
    Delta, HistoryLedger, LocationDirectory, Notifier, Precondition, StoreError, UserDirectory,
    WalletStore,
};
use crate::domain::user::{User, UserId};
use crate::domain::wallet::{Amount, Balance, Wallet, WalletId};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct WalletState {
    wallets: HashMap<WalletId, Wallet>,
    by_user: HashMap<UserId, WalletId>,
}

/// Thread-safe in-memory wallet store.
#[derive(Default, Clone)]
pub struct InMemoryWalletStore {
    state: Arc<RwLock<WalletState>>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn apply_checked(
    balance: Balance,
    delta: i64,
    precondition: Precondition,
) -> std::result::Result<Balance, StoreError> {
    if !precondition.holds(balance) {
        return Err(StoreError::Insufficient);
    }
    balance.checked_apply(delta).ok_or(if delta < 0 {
        StoreError::Insufficient
    } else {
        StoreError::Overflow
    })
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn create(&self, wallet: Wallet) -> std::result::Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.wallets.contains_key(&wallet.id) || state.by_user.contains_key(&wallet.user_id)
        {
            return Err(StoreError::Conflict);
        }
        state.by_user.insert(wallet.user_id.clone(), wallet.id.clone());
        state.wallets.insert(wallet.id.clone(), wallet);
        Ok(())
    }

    async fn get(&self, wallet_id: &WalletId) -> std::result::Result<Wallet, StoreError> {
        let state = self.state.read().await;
        state.wallets.get(wallet_id).cloned().ok_or(StoreError::NotFound)
    }

    async fn wallet_for_user(
        &self,
        user_id: &UserId,
    ) -> std::result::Result<Wallet, StoreError> {
        let state = self.state.read().await;
        let wallet_id = state.by_user.get(user_id).ok_or(StoreError::NotFound)?;
        state.wallets.get(wallet_id).cloned().ok_or(StoreError::NotFound)
    }

    async fn apply_delta(
        &self,
        wallet_id: &WalletId,
        delta: Delta,
        precondition: Precondition,
    ) -> std::result::Result<Balance, StoreError> {
        let mut state = self.state.write().await;
        let wallet = state.wallets.get_mut(wallet_id).ok_or(StoreError::NotFound)?;
        let next = apply_checked(wallet.balance, delta.signed(), precondition)?;
        wallet.balance = next;
        Ok(next)
    }

    async fn apply_transfer(
        &self,
        from: &WalletId,
        to: &WalletId,
        amount: Amount,
        precondition: Precondition,
    ) -> std::result::Result<(Balance, Balance), StoreError> {
        let mut state = self.state.write().await;

        let from_balance = state.wallets.get(from).ok_or(StoreError::NotFound)?.balance;
        let to_balance = state.wallets.get(to).ok_or(StoreError::NotFound)?.balance;

        // Both sides are validated before either is written; the write
        // guard is held throughout, so no observer sees one side applied.
        let new_from = apply_checked(from_balance, -amount.as_delta(), precondition)?;
        let new_to = apply_checked(to_balance, amount.as_delta(), Precondition::None)?;

        state
            .wallets
            .get_mut(from)
            .ok_or(StoreError::NotFound)?
            .balance = new_from;
        state.wallets.get_mut(to).ok_or(StoreError::NotFound)?.balance = new_to;

        Ok((new_from, new_to))
    }
}

/// Append-only in-memory ledger, ordered by timestamp (insertion order
/// breaks ties) and listed newest first.
#[derive(Default)]
pub struct InMemoryHistoryLedger {
    rows: RwLock<Vec<(u64, HistoryRecord)>>,
}

impl InMemoryHistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryLedger for InMemoryHistoryLedger {
    async fn append(&self, record: HistoryRecord) -> Result<()> {
        let mut rows = self.rows.write().await;
        let seq = rows.len() as u64;
        rows.push((seq, record));
        Ok(())
    }

    async fn list_by_wallet(&self, wallet_id: &WalletId) -> Result<Vec<HistoryRecord>> {
        let rows = self.rows.read().await;
        let mut matching: Vec<&(u64, HistoryRecord)> = rows
            .iter()
            .filter(|(_, r)| &r.wallet_id == wallet_id)
            .collect();
        matching.sort_by(|(sa, ra), (sb, rb)| {
            rb.timestamp.cmp(&ra.timestamp).then(sb.cmp(sa))
        });
        Ok(matching.into_iter().map(|(_, r)| r.clone()).collect())
    }
}

/// Notifier that records every event; the test double for delivery.
#[derive(Default)]
pub struct RecordingNotifier {
    events: RwLock<Vec<NotificationEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<NotificationEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn emit(&self, event: NotificationEvent) -> Result<()> {
        self.events.write().await.push(event);
        Ok(())
    }
}

/// Notifier that hands events to the log stream; the default sink when no
/// downstream dispatcher is wired up.
#[derive(Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn emit(&self, event: NotificationEvent) -> Result<()> {
        let payload = serde_json::to_string(&event)
            .map_err(|e| crate::error::WalletError::Internal(Box::new(e)))?;
        debug!(user = %event.user_id, tx = %event.transaction_id, %payload, "notification emitted");
        Ok(())
    }
}

/// Thread-safe in-memory user directory.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn create(&self, user: User) -> std::result::Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(StoreError::Conflict);
        }
        users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn get(&self, user_id: &UserId) -> Result<Option<User>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }
}

/// Location directory backed by a fixed table, loaded once at startup.
#[derive(Default)]
pub struct StaticLocationDirectory {
    names: HashMap<String, String>,
}

impl StaticLocationDirectory {
    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            names: entries.into_iter().collect(),
        }
    }
}

#[async_trait]
impl LocationDirectory for StaticLocationDirectory {
    async fn name_of(&self, location_id: &LocationId) -> Result<Option<String>> {
        Ok(self.names.get(location_id.as_str()).cloned())
    }
}
