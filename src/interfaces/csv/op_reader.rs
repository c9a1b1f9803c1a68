use crate::error::{Result, WalletError};
use crate::interfaces::api::OperationRequest;
use serde::Deserialize;
use std::io::Read;

/// One raw CSV row. Columns that do not apply to an operation stay empty;
/// validation happens in the conversion to `OperationRequest`.
#[derive(Debug, Deserialize)]
struct OpRow {
    op: String,
    user: Option<String>,
    counterparty: Option<String>,
    amount: Option<u64>,
    location: Option<String>,
    tx: Option<String>,
    name: Option<String>,
}

fn require(field: Option<String>, op: &str, name: &str) -> Result<String> {
    field.filter(|v| !v.is_empty()).ok_or_else(|| {
        WalletError::Validation(format!("{op}: missing required column {name}"))
    })
}

fn require_amount(amount: Option<u64>, op: &str) -> Result<u64> {
    amount.ok_or_else(|| WalletError::Validation(format!("{op}: missing required column amount")))
}

impl TryFrom<OpRow> for OperationRequest {
    type Error = WalletError;

    fn try_from(row: OpRow) -> Result<Self> {
        let location_id = row.location.filter(|l| !l.is_empty());
        match row.op.as_str() {
            "create_user" => Ok(Self::CreateUser {
                id: require(row.user, "create_user", "user")?,
                name: require(row.name, "create_user", "name")?,
            }),
            "charge_wallet" => Ok(Self::ChargeWallet {
                user_id: require(row.user, "charge_wallet", "user")?,
                charge_amount: require_amount(row.amount, "charge_wallet")?,
                location_id,
                transaction_id: require(row.tx, "charge_wallet", "tx")?,
            }),
            "debit_wallet" => Ok(Self::DebitWallet {
                user_id: require(row.user, "debit_wallet", "user")?,
                use_amount: require_amount(row.amount, "debit_wallet")?,
                location_id,
                transaction_id: require(row.tx, "debit_wallet", "tx")?,
            }),
            "transfer_wallet" => Ok(Self::TransferWallet {
                from_user_id: require(row.user, "transfer_wallet", "user")?,
                to_user_id: require(row.counterparty, "transfer_wallet", "counterparty")?,
                transfer_amount: require_amount(row.amount, "transfer_wallet")?,
                location_id,
                transaction_id: require(row.tx, "transfer_wallet", "tx")?,
            }),
            "get_user_summary" => Ok(Self::GetUserSummary {
                user_id: require(row.user, "get_user_summary", "user")?,
            }),
            "get_payment_history" => Ok(Self::GetPaymentHistory {
                user_id: require(row.user, "get_payment_history", "user")?,
            }),
            other => Err(WalletError::Validation(format!(
                "unknown operation: {other}"
            ))),
        }
    }
}

/// Reads operation requests from a CSV source.
///
/// Wraps `csv::Reader`, trimming whitespace and tolerating rows that omit
/// trailing columns, and yields requests lazily so large files stream.
pub struct OperationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OperationReader<R> {
    /// Creates a new `OperationReader` from any `Read` source.
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// An iterator that lazily reads and converts operation rows.
    pub fn operations(self) -> impl Iterator<Item = Result<OperationRequest>> {
        self.reader.into_deserialize().map(|result| {
            result
                .map_err(WalletError::from)
                .and_then(|row: OpRow| OperationRequest::try_from(row))
        })
    }
}
