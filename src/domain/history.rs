use super::user::UserId;
use super::wallet::{Amount, WalletId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-supplied correlation id. Audit only: the engine never uses it as
/// a dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationId(String);

impl LocationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The side of an operation a history row records.
///
/// A transfer produces two rows: `TransferOut` on the source wallet and
/// `TransferIn` on the destination wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    Charge,
    Debit,
    TransferOut,
    TransferIn,
}

impl OperationKind {
    /// Whether the row counts toward money flowing into the wallet.
    pub fn is_credit(self) -> bool {
        matches!(self, Self::Charge | Self::TransferIn)
    }
}

/// One append-only ledger row, one per affected wallet per operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub wallet_id: WalletId,
    pub user_id: UserId,
    pub transaction_id: TransactionId,
    pub kind: OperationKind,
    pub amount: Amount,
    pub location_id: Option<LocationId>,
    pub timestamp: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn new(
        wallet_id: WalletId,
        user_id: UserId,
        transaction_id: TransactionId,
        kind: OperationKind,
        amount: Amount,
        location_id: Option<LocationId>,
    ) -> Self {
        Self {
            wallet_id,
            user_id,
            transaction_id,
            kind,
            amount,
            location_id,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_sides() {
        assert!(OperationKind::Charge.is_credit());
        assert!(OperationKind::TransferIn.is_credit());
        assert!(!OperationKind::Debit.is_credit());
        assert!(!OperationKind::TransferOut.is_credit());
    }

    #[test]
    fn kind_serializes_kebab_case() {
        let s = serde_json::to_string(&OperationKind::TransferOut).unwrap();
        assert_eq!(s, "\"transfer-out\"");
    }
}
