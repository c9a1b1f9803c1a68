//! Concurrency properties of the balance engine against the in-memory
//! store: no lost updates, no negative balances, all-or-nothing transfers.

use std::sync::Arc;
use wallet_ledger::application::engine::BalanceEngine;
use wallet_ledger::domain::history::TransactionId;
use wallet_ledger::domain::notification::NotificationEvent;
use wallet_ledger::domain::ports::{Notifier, WalletStore};
use wallet_ledger::domain::user::{User, UserId};
use wallet_ledger::domain::wallet::Amount;
use wallet_ledger::error::{Result, WalletError};
use wallet_ledger::infrastructure::in_memory::{
    InMemoryHistoryLedger, InMemoryUserDirectory, InMemoryWalletStore, RecordingNotifier,
};

async fn engine_with_users(users: &[&str]) -> (Arc<BalanceEngine>, Arc<InMemoryWalletStore>) {
    let wallets = Arc::new(InMemoryWalletStore::new());
    let engine = Arc::new(BalanceEngine::new(
        wallets.clone(),
        Arc::new(InMemoryHistoryLedger::new()),
        Arc::new(RecordingNotifier::new()),
        Arc::new(InMemoryUserDirectory::new()),
    ));
    for user in users {
        engine.register_user(User::new(*user, *user)).await.unwrap();
    }
    (engine, wallets)
}

fn amount(v: u64) -> Amount {
    Amount::new(v).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_unit_charges_are_never_lost() {
    let (engine, wallets) = engine_with_users(&["u1"]).await;
    let user = UserId::new("u1");
    engine
        .charge(&user, amount(7), None, TransactionId::new("seed"))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..100 {
        let engine = engine.clone();
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            engine
                .charge(&user, amount(1), None, TransactionId::new(format!("t{i}")))
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let wallet = wallets.wallet_for_user(&user).await.unwrap();
    assert_eq!(wallet.balance.value(), 107);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_debits_never_overdraw() {
    let (engine, wallets) = engine_with_users(&["u1"]).await;
    let user = UserId::new("u1");
    engine
        .charge(&user, amount(100), None, TransactionId::new("seed"))
        .await
        .unwrap();

    // 50 debits of 10 against a balance of 100: exactly 10 can succeed.
    let mut handles = Vec::new();
    for i in 0..50 {
        let engine = engine.clone();
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            engine
                .debit(&user, amount(10), None, TransactionId::new(format!("d{i}")))
                .await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(WalletError::InsufficientFunds(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(accepted, 10);
    let wallet = wallets.wallet_for_user(&user).await.unwrap();
    assert_eq!(wallet.balance.value(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_transfers_conserve_total() {
    let (engine, wallets) = engine_with_users(&["a", "b", "c"]).await;
    let users: Vec<UserId> = ["a", "b", "c"].iter().map(|u| UserId::new(*u)).collect();
    for (i, user) in users.iter().enumerate() {
        engine
            .charge(
                user,
                amount(1_000),
                None,
                TransactionId::new(format!("seed{i}")),
            )
            .await
            .unwrap();
    }

    // Transfers around the ring in both directions; rejections are fine,
    // partial application is not.
    let mut handles = Vec::new();
    for i in 0..120 {
        let engine = engine.clone();
        let from = users[i % 3].clone();
        let to = users[(i + 1) % 3].clone();
        handles.push(tokio::spawn(async move {
            let _ = engine
                .transfer(
                    &from,
                    &to,
                    amount(17),
                    None,
                    TransactionId::new(format!("x{i}")),
                )
                .await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut total = 0;
    for user in &users {
        let wallet = wallets.wallet_for_user(user).await.unwrap();
        total += wallet.balance.value();
    }
    assert_eq!(total, 3_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn randomized_mix_preserves_invariants() {
    use rand::Rng;

    let (engine, wallets) = engine_with_users(&["a", "b"]).await;
    let a = UserId::new("a");
    let b = UserId::new("b");
    engine
        .charge(&a, amount(500), None, TransactionId::new("seed-a"))
        .await
        .unwrap();
    engine
        .charge(&b, amount(500), None, TransactionId::new("seed-b"))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..200 {
        let engine = engine.clone();
        let (from, to) = if i % 2 == 0 {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };
        let pick = rand::thread_rng().gen_range(0..3u8);
        let value = rand::thread_rng().gen_range(1..50u64);
        handles.push(tokio::spawn(async move {
            let tx = TransactionId::new(format!("r{i}"));
            let result = match pick {
                0 => engine.charge(&from, amount(value), None, tx).await.map(|_| ()),
                1 => engine.debit(&from, amount(value), None, tx).await.map(|_| ()),
                _ => engine
                    .transfer(&from, &to, amount(value), None, tx)
                    .await
                    .map(|_| ()),
            };
            match result {
                Ok(()) | Err(WalletError::InsufficientFunds(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Whatever interleaving happened, no wallet went negative (the type
    // cannot represent it, but the committed values must also be sane).
    for user in [&a, &b] {
        let wallet = wallets.wallet_for_user(user).await.unwrap();
        assert!(wallet.balance.value() <= i64::MAX as u64);
    }
}

struct FailingNotifier;

#[async_trait::async_trait]
impl Notifier for FailingNotifier {
    async fn emit(&self, _event: NotificationEvent) -> Result<()> {
        Err(WalletError::StoreUnavailable("queue down".to_string()))
    }
}

#[tokio::test]
async fn notifier_failure_does_not_reverse_the_mutation() {
    let wallets = Arc::new(InMemoryWalletStore::new());
    let engine = BalanceEngine::new(
        wallets.clone(),
        Arc::new(InMemoryHistoryLedger::new()),
        Arc::new(FailingNotifier),
        Arc::new(InMemoryUserDirectory::new()),
    );
    engine.register_user(User::new("u1", "Alice")).await.unwrap();

    let user = UserId::new("u1");
    let balance = engine
        .charge(&user, amount(100), None, TransactionId::new("t1"))
        .await
        .unwrap();
    assert_eq!(balance.value(), 100);

    let wallet = wallets.wallet_for_user(&user).await.unwrap();
    assert_eq!(wallet.balance.value(), 100);
}
