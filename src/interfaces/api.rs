//! Request/response shaping around the engine and the summary service.
//!
//! The wire shapes mirror the wallet API this ledger serves: camelCase
//! fields, `{status: "accepted"}` with the committed balance on success,
//! `{status: "rejected", reason, message}` with a stable reason code on
//! rejection.

use crate::application::engine::BalanceEngine;
use crate::application::summary::{HistoryEntry, SummaryService, UserSummary};
use crate::domain::history::{LocationId, TransactionId};
use crate::domain::user::{User, UserId};
use crate::domain::wallet::Amount;
use crate::error::{Result, WalletError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum OperationRequest {
    CreateUser {
        id: String,
        name: String,
    },
    ChargeWallet {
        user_id: String,
        charge_amount: u64,
        location_id: Option<String>,
        transaction_id: String,
    },
    DebitWallet {
        user_id: String,
        use_amount: u64,
        location_id: Option<String>,
        transaction_id: String,
    },
    TransferWallet {
        from_user_id: String,
        to_user_id: String,
        transfer_amount: u64,
        location_id: Option<String>,
        transaction_id: String,
    },
    GetUserSummary {
        user_id: String,
    },
    GetPaymentHistory {
        user_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OperationResponse {
    Created {
        result: &'static str,
    },
    #[serde(rename_all = "camelCase")]
    Accepted {
        status: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        total_amount: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        from_amount: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        to_amount: Option<u64>,
    },
    Rejected {
        status: &'static str,
        reason: &'static str,
        message: String,
    },
    Summary(UserSummary),
    History(Vec<HistoryEntry>),
}

impl OperationResponse {
    fn accepted(total_amount: u64) -> Self {
        Self::Accepted {
            status: "accepted",
            total_amount: Some(total_amount),
            from_amount: None,
            to_amount: None,
        }
    }

    fn accepted_transfer(from_amount: u64, to_amount: u64) -> Self {
        Self::Accepted {
            status: "accepted",
            total_amount: None,
            from_amount: Some(from_amount),
            to_amount: Some(to_amount),
        }
    }

    fn rejected(error: &WalletError) -> Self {
        Self::Rejected {
            status: "rejected",
            reason: error.reason_code(),
            message: error.to_string(),
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Dispatches operation requests to the engine and the summary service,
/// translating domain errors into typed rejections.
pub struct Api {
    engine: BalanceEngine,
    summary: SummaryService,
}

impl Api {
    pub fn new(engine: BalanceEngine, summary: SummaryService) -> Self {
        Self { engine, summary }
    }

    pub async fn dispatch(&self, request: OperationRequest) -> OperationResponse {
        match self.handle(request).await {
            Ok(response) => response,
            Err(error) => OperationResponse::rejected(&error),
        }
    }

    pub async fn user_summary(&self, user_id: &str) -> Result<UserSummary> {
        self.summary.user_summary(&UserId::new(user_id)).await
    }

    async fn handle(&self, request: OperationRequest) -> Result<OperationResponse> {
        match request {
            OperationRequest::CreateUser { id, name } => {
                self.engine.register_user(User::new(id, name)).await?;
                Ok(OperationResponse::Created { result: "ok" })
            }
            OperationRequest::ChargeWallet {
                user_id,
                charge_amount,
                location_id,
                transaction_id,
            } => {
                let balance = self
                    .engine
                    .charge(
                        &UserId::new(user_id),
                        Amount::new(charge_amount)?,
                        location_id.map(LocationId::new),
                        TransactionId::new(transaction_id),
                    )
                    .await?;
                Ok(OperationResponse::accepted(balance.value()))
            }
            OperationRequest::DebitWallet {
                user_id,
                use_amount,
                location_id,
                transaction_id,
            } => {
                let balance = self
                    .engine
                    .debit(
                        &UserId::new(user_id),
                        Amount::new(use_amount)?,
                        location_id.map(LocationId::new),
                        TransactionId::new(transaction_id),
                    )
                    .await?;
                Ok(OperationResponse::accepted(balance.value()))
            }
            OperationRequest::TransferWallet {
                from_user_id,
                to_user_id,
                transfer_amount,
                location_id,
                transaction_id,
            } => {
                let (from_balance, to_balance) = self
                    .engine
                    .transfer(
                        &UserId::new(from_user_id),
                        &UserId::new(to_user_id),
                        Amount::new(transfer_amount)?,
                        location_id.map(LocationId::new),
                        TransactionId::new(transaction_id),
                    )
                    .await?;
                Ok(OperationResponse::accepted_transfer(
                    from_balance.value(),
                    to_balance.value(),
                ))
            }
            OperationRequest::GetUserSummary { user_id } => {
                let summary = self.summary.user_summary(&UserId::new(user_id)).await?;
                Ok(OperationResponse::Summary(summary))
            }
            OperationRequest::GetPaymentHistory { user_id } => {
                let history = self
                    .summary
                    .payment_history(&UserId::new(user_id))
                    .await?;
                Ok(OperationResponse::History(history))
            }
        }
    }
}
