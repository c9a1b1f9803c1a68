use crate::error::WalletError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque wallet identifier, the primary key of the wallet store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletId(String);

impl WalletId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A non-negative balance in the smallest currency unit.
///
/// Capped at `i64::MAX` so any signed delta against it is representable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Balance(u64);

impl Balance {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(i64::MAX as u64);

    pub fn new(value: u64) -> Result<Self, WalletError> {
        if value > Self::MAX.0 {
            return Err(WalletError::Validation(
                "balance exceeds the representable maximum".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// Applies a signed delta, refusing results outside `[0, MAX]`.
    pub fn checked_apply(self, delta: i64) -> Option<Self> {
        let next = self.0.checked_add_signed(delta)?;
        (next <= Self::MAX.0).then_some(Self(next))
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A strictly positive operation amount in the smallest currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount(u64);

impl Amount {
    pub fn new(value: u64) -> Result<Self, WalletError> {
        if value == 0 {
            return Err(WalletError::Validation(
                "amount must be positive".to_string(),
            ));
        }
        if value > Balance::MAX.value() {
            return Err(WalletError::Validation(
                "amount exceeds the representable maximum".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// The amount as a signed delta; always representable by construction.
    pub fn as_delta(self) -> i64 {
        self.0 as i64
    }
}

impl TryFrom<u64> for Amount {
    type Error = WalletError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-user balance record, the unit of atomic mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: WalletId,
    pub user_id: super::user::UserId,
    pub balance: Balance,
}

impl Wallet {
    /// A fresh zero-balance wallet for a newly registered user. The wallet
    /// id is derived from the user id: the engine enforces one wallet per
    /// user, so the mapping is stable.
    pub fn for_user(user_id: super::user::UserId) -> Self {
        let id = WalletId::new(format!("wallet:{}", user_id.as_str()));
        Self {
            id,
            user_id,
            balance: Balance::ZERO,
        }
    }
}
