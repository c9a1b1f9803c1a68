use super::history::TransactionId;
use super::user::UserId;
use super::wallet::{Amount, Balance};
use serde::{Deserialize, Serialize};

/// Operation-outcome event handed to the notifier, one per affected wallet.
///
/// Serialized in the camelCase wire shape downstream consumers expect:
/// charges and transfer-ins carry `chargeAmount`, debits and transfer-outs
/// carry `useAmount`, and `totalAmount` is always the wallet's own
/// post-operation balance as committed by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub transaction_id: TransactionId,
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_amount: Option<Amount>,
    pub total_amount: Balance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_to: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_from: Option<UserId>,
}

impl NotificationEvent {
    pub fn charge(
        transaction_id: TransactionId,
        user_id: UserId,
        amount: Amount,
        total_amount: Balance,
    ) -> Self {
        Self {
            transaction_id,
            user_id,
            charge_amount: Some(amount),
            use_amount: None,
            total_amount,
            transfer_to: None,
            transfer_from: None,
        }
    }

    pub fn debit(
        transaction_id: TransactionId,
        user_id: UserId,
        amount: Amount,
        total_amount: Balance,
    ) -> Self {
        Self {
            transaction_id,
            user_id,
            charge_amount: None,
            use_amount: Some(amount),
            total_amount,
            transfer_to: None,
            transfer_from: None,
        }
    }

    pub fn transfer_out(
        transaction_id: TransactionId,
        user_id: UserId,
        amount: Amount,
        total_amount: Balance,
        to: UserId,
    ) -> Self {
        Self {
            transaction_id,
            user_id,
            charge_amount: None,
            use_amount: Some(amount),
            total_amount,
            transfer_to: Some(to),
            transfer_from: None,
        }
    }

    pub fn transfer_in(
        transaction_id: TransactionId,
        user_id: UserId,
        amount: Amount,
        total_amount: Balance,
        from: UserId,
    ) -> Self {
        Self {
            transaction_id,
            user_id,
            charge_amount: Some(amount),
            use_amount: None,
            total_amount,
            transfer_to: None,
            transfer_from: Some(from),
        }
    }
}
