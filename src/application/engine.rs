use crate::domain::history::{HistoryRecord, LocationId, OperationKind, TransactionId};
use crate::domain::notification::NotificationEvent;
use crate::domain::ports::{
    Delta, HistoryLedgerRef, NotifierRef, Precondition, StoreError, UserDirectoryRef,
    WalletStoreRef,
};
use crate::domain::user::{User, UserId};
use crate::domain::wallet::{Amount, Balance, Wallet};
use crate::error::{Result, WalletError};
use tracing::{info, warn};

/// The balance-mutation and transfer engine.
///
/// Each operation validates its request, performs exactly one atomic
/// conditional mutation against the wallet store, and only then appends
/// history and emits notifications. The store call is the sole
/// serialization point: the engine holds no lock of its own, so operations
/// on different wallets proceed fully in parallel and multiple engine
/// instances may share one store.
pub struct BalanceEngine {
    wallets: WalletStoreRef,
    history: HistoryLedgerRef,
    notifier: NotifierRef,
    users: UserDirectoryRef,
}

impl BalanceEngine {
    pub fn new(
        wallets: WalletStoreRef,
        history: HistoryLedgerRef,
        notifier: NotifierRef,
        users: UserDirectoryRef,
    ) -> Self {
        Self {
            wallets,
            history,
            notifier,
            users,
        }
    }

    /// Registers a user and creates its wallet as one logical step.
    ///
    /// If the wallet creation fails after the directory entry was written,
    /// the inconsistency is logged and detectable: every operation on the
    /// user keeps failing with `WalletNotFound` until registration is
    /// retried.
    pub async fn register_user(&self, user: User) -> Result<()> {
        let user_id = user.id.clone();
        self.users.create(user).await.map_err(|e| match e {
            StoreError::Conflict => {
                WalletError::Validation(format!("user {user_id} already exists"))
            }
            other => map_store(other, &user_id),
        })?;

        if let Err(e) = self.wallets.create(Wallet::for_user(user_id.clone())).await {
            match e {
                // The wallet can already exist if a previous registration
                // wrote it before the directory entry was retried.
                StoreError::Conflict => {}
                other => {
                    warn!(user = %user_id, error = %other, "registration left a user without a wallet");
                    return Err(map_store(other, &user_id));
                }
            }
        }

        info!(user = %user_id, "user registered");
        Ok(())
    }

    /// Credits `amount` to the user's wallet. No precondition beyond the
    /// wallet existing.
    pub async fn charge(
        &self,
        user_id: &UserId,
        amount: Amount,
        location_id: Option<LocationId>,
        transaction_id: TransactionId,
    ) -> Result<Balance> {
        let wallet = self.wallet_of(user_id).await?;

        let balance = self
            .wallets
            .apply_delta(&wallet.id, Delta::Credit(amount), Precondition::None)
            .await
            .map_err(|e| map_store(e, user_id))?;

        info!(user = %user_id, tx = %transaction_id, amount = %amount, balance = %balance, "charge applied");

        let record = HistoryRecord::new(
            wallet.id,
            user_id.clone(),
            transaction_id.clone(),
            OperationKind::Charge,
            amount,
            location_id,
        );
        let event =
            NotificationEvent::charge(transaction_id, user_id.clone(), amount, balance);
        self.record_and_notify(vec![record], vec![event]).await;

        Ok(balance)
    }

    /// Debits `amount` from the user's wallet iff the balance covers it at
    /// the instant of mutation. On `InsufficientFunds` nothing is written.
    pub async fn debit(
        &self,
        user_id: &UserId,
        amount: Amount,
        location_id: Option<LocationId>,
        transaction_id: TransactionId,
    ) -> Result<Balance> {
        let wallet = self.wallet_of(user_id).await?;

        let balance = self
            .wallets
            .apply_delta(
                &wallet.id,
                Delta::Debit(amount),
                Precondition::BalanceAtLeast(amount),
            )
            .await
            .map_err(|e| map_store(e, user_id))?;

        info!(user = %user_id, tx = %transaction_id, amount = %amount, balance = %balance, "debit applied");

        let record = HistoryRecord::new(
            wallet.id,
            user_id.clone(),
            transaction_id.clone(),
            OperationKind::Debit,
            amount,
            location_id,
        );
        let event = NotificationEvent::debit(transaction_id, user_id.clone(), amount, balance);
        self.record_and_notify(vec![record], vec![event]).await;

        Ok(balance)
    }

    /// Moves `amount` between two users' wallets as one all-or-nothing
    /// unit. Returns the committed balances, source first; each side's
    /// history row and event carry that wallet's own resulting balance.
    pub async fn transfer(
        &self,
        from_user: &UserId,
        to_user: &UserId,
        amount: Amount,
        location_id: Option<LocationId>,
        transaction_id: TransactionId,
    ) -> Result<(Balance, Balance)> {
        if from_user == to_user {
            return Err(WalletError::Validation(
                "cannot transfer to the same user".to_string(),
            ));
        }

        let from_wallet = self.wallet_of(from_user).await?;
        let to_wallet = self.wallet_of(to_user).await?;

        let (from_balance, to_balance) = self
            .wallets
            .apply_transfer(
                &from_wallet.id,
                &to_wallet.id,
                amount,
                Precondition::BalanceAtLeast(amount),
            )
            .await
            .map_err(|e| map_store(e, from_user))?;

        info!(
            from = %from_user,
            to = %to_user,
            tx = %transaction_id,
            amount = %amount,
            from_balance = %from_balance,
            to_balance = %to_balance,
            "transfer applied"
        );

        let records = vec![
            HistoryRecord::new(
                from_wallet.id,
                from_user.clone(),
                transaction_id.clone(),
                OperationKind::TransferOut,
                amount,
                location_id.clone(),
            ),
            HistoryRecord::new(
                to_wallet.id,
                to_user.clone(),
                transaction_id.clone(),
                OperationKind::TransferIn,
                amount,
                location_id,
            ),
        ];
        let events = vec![
            NotificationEvent::transfer_out(
                transaction_id.clone(),
                from_user.clone(),
                amount,
                from_balance,
                to_user.clone(),
            ),
            NotificationEvent::transfer_in(
                transaction_id,
                to_user.clone(),
                amount,
                to_balance,
                from_user.clone(),
            ),
        ];
        self.record_and_notify(records, events).await;

        Ok((from_balance, to_balance))
    }

    async fn wallet_of(&self, user_id: &UserId) -> Result<Wallet> {
        self.wallets
            .wallet_for_user(user_id)
            .await
            .map_err(|e| map_store(e, user_id))
    }

    /// Post-commit follow-ups. History appends and notifications run
    /// concurrently and are awaited before the operation is reported
    /// complete, but a failure here must not roll back the committed
    /// mutation: it is logged as a partial write and left to out-of-band
    /// repair.
    async fn record_and_notify(
        &self,
        records: Vec<HistoryRecord>,
        events: Vec<NotificationEvent>,
    ) {
        let appends = async {
            for record in records {
                if let Err(e) = self.history.append(record.clone()).await {
                    warn!(
                        wallet = %record.wallet_id,
                        tx = %record.transaction_id,
                        error = %e,
                        "partial write: history append failed after committed mutation"
                    );
                }
            }
        };
        let emits = async {
            for event in events {
                if let Err(e) = self.notifier.emit(event.clone()).await {
                    warn!(
                        user = %event.user_id,
                        tx = %event.transaction_id,
                        error = %e,
                        "partial write: notification failed after committed mutation"
                    );
                }
            }
        };
        tokio::join!(appends, emits);
    }
}

/// Maps store-level failures onto the domain taxonomy. The engine never
/// substitutes a client-computed balance for what the store committed.
fn map_store(err: StoreError, user_id: &UserId) -> WalletError {
    match err {
        StoreError::NotFound => WalletError::WalletNotFound(user_id.to_string()),
        StoreError::Insufficient => WalletError::InsufficientFunds(user_id.to_string()),
        StoreError::Overflow => WalletError::Validation(format!(
            "operation would push the balance of user {user_id} past the representable maximum"
        )),
        StoreError::Conflict => WalletError::Validation(format!(
            "record for user {user_id} already exists"
        )),
        StoreError::Unavailable(msg) => WalletError::StoreUnavailable(msg),
    }
}
