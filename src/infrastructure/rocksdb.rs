//! Persistent adapter backed by RocksDB (feature `storage-rocksdb`).
//!
//! RocksDB has no conditional update of its own, so the store serializes
//! all mutations behind one mutex and commits each mutation as a single
//! `WriteBatch`: the batch makes the transfer pair all-or-nothing on disk,
//! the mutex makes the read-check-write indivisible within the process
//! (RocksDB is single-process by construction).

use crate::domain::history::HistoryRecord;
use crate::domain::ports::{
    Delta, HistoryLedger, Precondition, StoreError, WalletStore,
};
use crate::domain::user::UserId;
use crate::domain::wallet::{Amount, Balance, Wallet, WalletId};
use crate::error::{Result, WalletError};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Column family for wallet records, keyed by wallet id.
pub const CF_WALLETS: &str = "wallets";
/// Column family mapping user id to wallet id.
pub const CF_WALLETS_BY_USER: &str = "wallets_by_user";
/// Column family for history rows, keyed by wallet id + sequence.
pub const CF_HISTORY: &str = "history";

/// Persistent store implementing both the wallet store and the history
/// ledger, in separate column families. `Clone` shares the underlying
/// `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    mutation_lock: Arc<Mutex<()>>,
    history_seq: Arc<AtomicU64>,
}

impl RocksDbStore {
    /// Opens or creates the database at `path`, ensuring the column
    /// families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = vec![
            ColumnFamilyDescriptor::new(CF_WALLETS, Options::default()),
            ColumnFamilyDescriptor::new(CF_WALLETS_BY_USER, Options::default()),
            ColumnFamilyDescriptor::new(CF_HISTORY, Options::default()),
        ];
        let db = DB::open_cf_descriptors(&opts, path, cfs)
            .map_err(|e| WalletError::StoreUnavailable(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            mutation_lock: Arc::new(Mutex::new(())),
            history_seq: Arc::new(AtomicU64::new(0)),
        })
    }

    fn cf(&self, name: &str) -> std::result::Result<&rocksdb::ColumnFamily, StoreError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Unavailable(format!("column family {name} not found")))
    }

    fn read_wallet(
        &self,
        wallet_id: &WalletId,
    ) -> std::result::Result<Wallet, StoreError> {
        let cf = self.cf(CF_WALLETS)?;
        let bytes = self
            .db
            .get_cf(cf, wallet_id.as_str().as_bytes())
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .ok_or(StoreError::NotFound)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Unavailable(format!("corrupt wallet record: {e}")))
    }

    fn put_wallet(
        &self,
        batch: &mut WriteBatch,
        wallet: &Wallet,
    ) -> std::result::Result<(), StoreError> {
        let cf = self.cf(CF_WALLETS)?;
        let value = serde_json::to_vec(wallet)
            .map_err(|e| StoreError::Unavailable(format!("serialization error: {e}")))?;
        batch.put_cf(cf, wallet.id.as_str().as_bytes(), value);
        Ok(())
    }

    fn commit(&self, batch: WriteBatch) -> std::result::Result<(), StoreError> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn history_key(&self, wallet_id: &WalletId) -> Vec<u8> {
        // Unique, wallet-prefixed key. Listing sorts by the row timestamp,
        // so the key only needs to be unique and prefix-scannable.
        let seq = self.history_seq.fetch_add(1, Ordering::Relaxed);
        let nanos = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(i64::MAX) as u64;
        let mut key = Vec::with_capacity(wallet_id.as_str().len() + 17);
        key.extend_from_slice(wallet_id.as_str().as_bytes());
        key.push(0);
        key.extend_from_slice(&nanos.to_be_bytes());
        key.extend_from_slice(&seq.to_be_bytes());
        key
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
impl WalletStore for RocksDbStore {
    async fn create(&self, wallet: Wallet) -> std::result::Result<(), StoreError> {
        let _guard = self.mutation_lock.lock().await;

        let index_cf = self.cf(CF_WALLETS_BY_USER)?;
        let wallets_cf = self.cf(CF_WALLETS)?;
        let exists = self
            .db
            .get_pinned_cf(wallets_cf, wallet.id.as_str().as_bytes())
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .is_some()
            || self
                .db
                .get_pinned_cf(index_cf, wallet.user_id.as_str().as_bytes())
                .map_err(|e| StoreError::Unavailable(e.to_string()))?
                .is_some();
        if exists {
            return Err(StoreError::Conflict);
        }

        let mut batch = WriteBatch::default();
        self.put_wallet(&mut batch, &wallet)?;
        batch.put_cf(
            index_cf,
            wallet.user_id.as_str().as_bytes(),
            wallet.id.as_str().as_bytes(),
        );
        self.commit(batch)
    }

    async fn get(&self, wallet_id: &WalletId) -> std::result::Result<Wallet, StoreError> {
        self.read_wallet(wallet_id)
    }

    async fn wallet_for_user(
        &self,
        user_id: &UserId,
    ) -> std::result::Result<Wallet, StoreError> {
        let index_cf = self.cf(CF_WALLETS_BY_USER)?;
        let bytes = self
            .db
            .get_cf(index_cf, user_id.as_str().as_bytes())
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .ok_or(StoreError::NotFound)?;
        let wallet_id = WalletId::new(String::from_utf8(bytes).map_err(|e| {
            StoreError::Unavailable(format!("corrupt wallet index entry: {e}"))
        })?);
        self.read_wallet(&wallet_id)
    }

    async fn apply_delta(
        &self,
        wallet_id: &WalletId,
        delta: Delta,
        precondition: Precondition,
    ) -> std::result::Result<Balance, StoreError> {
        let _guard = self.mutation_lock.lock().await;

        let mut wallet = self.read_wallet(wallet_id)?;
        wallet.balance = apply_checked(wallet.balance, delta.signed(), precondition)?;

        let mut batch = WriteBatch::default();
        self.put_wallet(&mut batch, &wallet)?;
        self.commit(batch)?;
        Ok(wallet.balance)
    }

    async fn apply_transfer(
        &self,
        from: &WalletId,
        to: &WalletId,
        amount: Amount,
        precondition: Precondition,
    ) -> std::result::Result<(Balance, Balance), StoreError> {
        let _guard = self.mutation_lock.lock().await;

        let mut from_wallet = self.read_wallet(from)?;
        let mut to_wallet = self.read_wallet(to)?;
        from_wallet.balance =
            apply_checked(from_wallet.balance, -amount.as_delta(), precondition)?;
        to_wallet.balance =
            apply_checked(to_wallet.balance, amount.as_delta(), Precondition::None)?;

        // One batch: the debit and the credit land together or not at all.
        let mut batch = WriteBatch::default();
        self.put_wallet(&mut batch, &from_wallet)?;
        self.put_wallet(&mut batch, &to_wallet)?;
        self.commit(batch)?;
        Ok((from_wallet.balance, to_wallet.balance))
    }
}

#[async_trait]
impl HistoryLedger for RocksDbStore {
    async fn append(&self, record: HistoryRecord) -> Result<()> {
        let cf = self
            .cf(CF_HISTORY)
            .map_err(|e| WalletError::StoreUnavailable(e.to_string()))?;
        let key = self.history_key(&record.wallet_id);
        let value =
            serde_json::to_vec(&record).map_err(|e| WalletError::Internal(Box::new(e)))?;
        self.db
            .put_cf(cf, key, value)
            .map_err(|e| WalletError::StoreUnavailable(e.to_string()))?;
        Ok(())
    }

    async fn list_by_wallet(&self, wallet_id: &WalletId) -> Result<Vec<HistoryRecord>> {
        let cf = self
            .cf(CF_HISTORY)
            .map_err(|e| WalletError::StoreUnavailable(e.to_string()))?;

        let mut prefix = Vec::with_capacity(wallet_id.as_str().len() + 1);
        prefix.extend_from_slice(wallet_id.as_str().as_bytes());
        prefix.push(0);

        let mut rows = Vec::new();
        let iter = self.db.iterator_cf(
            cf,
            rocksdb::IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );
        for item in iter {
            let (key, value) =
                item.map_err(|e| WalletError::StoreUnavailable(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            let record: HistoryRecord = serde_json::from_slice(&value)
                .map_err(|e| WalletError::Internal(Box::new(e)))?;
            rows.push(record);
        }
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(rows)
    }
}
