//! Read-only reporting over the wallet store and the history ledger.

use crate::domain::history::{HistoryRecord, TransactionId};
use crate::domain::ports::{
    HistoryLedgerRef, LocationDirectoryRef, StoreError, UserDirectoryRef, WalletStoreRef,
};
use crate::domain::user::UserId;
use crate::domain::wallet::{Amount, Balance};
use crate::error::{Result, WalletError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Sentinel bucket for location ids the directory cannot resolve.
pub const UNKNOWN_LOCATION: &str = "unknown";

/// Aggregated view of one user's wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub user_name: String,
    pub current_amount: Balance,
    pub total_charge_amount: u64,
    pub total_use_amount: u64,
    pub times_per_location: HashMap<String, u64>,
}

/// One payment-history row with the location name resolved, in the wire
/// shape of the history API: credits carry `chargeAmount`, debits carry
/// `useAmount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub transaction_id: TransactionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Pure read composition of user directory, wallet store, history ledger
/// and location directory. No mutation.
pub struct SummaryService {
    wallets: WalletStoreRef,
    history: HistoryLedgerRef,
    users: UserDirectoryRef,
    locations: LocationDirectoryRef,
}

impl SummaryService {
    pub fn new(
        wallets: WalletStoreRef,
        history: HistoryLedgerRef,
        users: UserDirectoryRef,
        locations: LocationDirectoryRef,
    ) -> Self {
        Self {
            wallets,
            history,
            users,
            locations,
        }
    }

    /// Folds the user's ledger rows into totals and per-location counts.
    ///
    /// Rows without a location are excluded from the counts but included
    /// in the totals; rows whose location the directory does not know
    /// count under the `"unknown"` bucket.
    pub async fn user_summary(&self, user_id: &UserId) -> Result<UserSummary> {
        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| WalletError::UserNotFound(user_id.to_string()))?;
        let wallet = self
            .wallets
            .wallet_for_user(user_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => WalletError::WalletNotFound(user_id.to_string()),
                StoreError::Unavailable(msg) => WalletError::StoreUnavailable(msg),
                other => WalletError::Internal(Box::new(other)),
            })?;
        let rows = self.history.list_by_wallet(&wallet.id).await?;

        let mut total_charge_amount = 0u64;
        let mut total_use_amount = 0u64;
        let mut times_per_location: HashMap<String, u64> = HashMap::new();
        for row in &rows {
            if row.kind.is_credit() {
                total_charge_amount += row.amount.value();
            } else {
                total_use_amount += row.amount.value();
            }
            if let Some(location_id) = &row.location_id {
                let name = self
                    .locations
                    .name_of(location_id)
                    .await?
                    .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());
                *times_per_location.entry(name).or_insert(0) += 1;
            }
        }

        Ok(UserSummary {
            user_name: user.name,
            current_amount: wallet.balance,
            total_charge_amount,
            total_use_amount,
            times_per_location,
        })
    }

    /// The user's ledger rows newest first, with location names resolved.
    pub async fn payment_history(&self, user_id: &UserId) -> Result<Vec<HistoryEntry>> {
        let wallet = self
            .wallets
            .wallet_for_user(user_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => WalletError::WalletNotFound(user_id.to_string()),
                StoreError::Unavailable(msg) => WalletError::StoreUnavailable(msg),
                other => WalletError::Internal(Box::new(other)),
            })?;
        let rows = self.history.list_by_wallet(&wallet.id).await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(self.entry_for(row).await?);
        }
        Ok(entries)
    }

    async fn entry_for(&self, row: HistoryRecord) -> Result<HistoryEntry> {
        let location_name = match &row.location_id {
            Some(location_id) => Some(
                self.locations
                    .name_of(location_id)
                    .await?
                    .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
            ),
            None => None,
        };
        let (charge_amount, use_amount) = if row.kind.is_credit() {
            (Some(row.amount), None)
        } else {
            (None, Some(row.amount))
        };
        Ok(HistoryEntry {
            transaction_id: row.transaction_id,
            charge_amount,
            use_amount,
            location_name,
            timestamp: row.timestamp,
        })
    }
}
