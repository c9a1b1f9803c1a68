use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use wallet_ledger::application::engine::BalanceEngine;
use wallet_ledger::application::summary::SummaryService;
use wallet_ledger::domain::ports::{
    HistoryLedgerRef, LocationDirectoryRef, NotifierRef, UserDirectoryRef, WalletStoreRef,
};
use wallet_ledger::interfaces::api::{Api, OperationRequest};
use wallet_ledger::interfaces::csv::op_reader::OperationReader;
#[cfg(feature = "storage-rocksdb")]
use wallet_ledger::infrastructure::rocksdb::RocksDbStore;
use wallet_ledger::infrastructure::in_memory::{
    InMemoryHistoryLedger, InMemoryUserDirectory, InMemoryWalletStore, LogNotifier,
    StaticLocationDirectory,
};
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input operations CSV file
    /// (columns: op,user,counterparty,amount,location,tx,name)
    input: PathBuf,

    /// JSON file mapping location ids to display names
    #[arg(long)]
    locations: Option<PathBuf>,

    /// Path to a persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

fn load_locations(path: Option<&PathBuf>) -> Result<LocationDirectoryRef> {
    let names: HashMap<String, String> = match path {
        Some(path) => {
            let file = File::open(path).into_diagnostic()?;
            serde_json::from_reader(file).into_diagnostic()?
        }
        None => HashMap::new(),
    };
    Ok(Arc::new(StaticLocationDirectory::from_entries(names)))
}

fn open_stores(db_path: Option<PathBuf>) -> Result<(WalletStoreRef, HistoryLedgerRef)> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = RocksDbStore::open(path).into_diagnostic()?;
            Ok((Arc::new(store.clone()), Arc::new(store)))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => miette::bail!(
            "--db-path requires the storage-rocksdb feature; rebuild with --features storage-rocksdb"
        ),
        None => Ok((
            Arc::new(InMemoryWalletStore::new()),
            Arc::new(InMemoryHistoryLedger::new()),
        )),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("warn".parse().into_diagnostic()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let (wallets, history) = open_stores(cli.db_path)?;
    let users: UserDirectoryRef = Arc::new(InMemoryUserDirectory::new());
    let notifier: NotifierRef = Arc::new(LogNotifier);
    let locations = load_locations(cli.locations.as_ref())?;

    let engine = BalanceEngine::new(
        wallets.clone(),
        history.clone(),
        notifier,
        users.clone(),
    );
    let summary = SummaryService::new(wallets, history, users, locations);
    let api = Api::new(engine, summary);

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = OperationReader::new(file);

    let mut user_ids = Vec::new();
    for request in reader.operations() {
        match request {
            Ok(request) => {
                if let OperationRequest::CreateUser { id, .. } = &request {
                    user_ids.push(id.clone());
                }
                let response = api.dispatch(request).await;
                if response.is_rejection() {
                    let body = serde_json::to_string(&response).into_diagnostic()?;
                    warn!(%body, "operation rejected");
                }
            }
            Err(e) => {
                warn!(error = %e, "skipping unreadable operation row");
            }
        }
    }

    // Final state: one JSON line per registered user.
    for user_id in user_ids {
        let summary = api.user_summary(&user_id).await.into_diagnostic()?;
        let mut line = serde_json::to_value(&summary).into_diagnostic()?;
        line["userId"] = serde_json::Value::String(user_id);
        println!("{line}");
    }

    Ok(())
}
