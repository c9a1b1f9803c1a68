use thiserror::Error;

pub type Result<T> = std::result::Result<T, WalletError>;

/// Domain error taxonomy surfaced by the engine and the API layer.
///
/// Rejections (`Validation`, `UserNotFound`, `WalletNotFound`,
/// `InsufficientFunds`) are returned synchronously with no state change.
/// `StoreUnavailable` is retryable; the atomic store call guarantees no
/// partial effect happened before it surfaced.
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("user {0} not found")]
    UserNotFound(String),
    #[error("no wallet for user {0}")]
    WalletNotFound(String),
    #[error("there was not enough money in the wallet of user {0}")]
    InsufficientFunds(String),
    #[error("wallet store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

impl WalletError {
    /// Stable machine-readable reason code used in API rejections.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::UserNotFound(_) => "user_not_found",
            Self::WalletNotFound(_) => "wallet_not_found",
            Self::InsufficientFunds(_) => "insufficient_funds",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Csv(_) | Self::Io(_) | Self::Internal(_) => "internal_error",
        }
    }

    /// Rejections are caller mistakes answered without touching state;
    /// everything else is a fault in the system or its backends.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::UserNotFound(_)
                | Self::WalletNotFound(_)
                | Self::InsufficientFunds(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_codes_are_stable() {
        assert_eq!(
            WalletError::InsufficientFunds("u1".into()).reason_code(),
            "insufficient_funds"
        );
        assert_eq!(
            WalletError::WalletNotFound("u1".into()).reason_code(),
            "wallet_not_found"
        );
        assert_eq!(
            WalletError::Validation("bad".into()).reason_code(),
            "validation_error"
        );
    }

    #[test]
    fn rejections_vs_faults() {
        assert!(WalletError::InsufficientFunds("u1".into()).is_rejection());
        assert!(WalletError::Validation("x".into()).is_rejection());
        assert!(!WalletError::StoreUnavailable("down".into()).is_rejection());
    }
}
