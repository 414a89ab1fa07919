pub use sqlx::Error as SqlxError;
use thiserror::Error;

use crate::schema::{TransactionStatus, TransactionType};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Admin role required")]
    Unauthorized,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("Expected a {expected} transaction, found {}", .actual.as_str())]
    WrongType {
        expected: &'static str,
        actual: TransactionType,
    },
    #[error("Transaction already processed (status: {})", .0.as_str())]
    AlreadyProcessed(TransactionStatus),
    #[error("{0}")]
    Validation(String),
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: i64, requested: i64 },
    #[error("Storage unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

impl LedgerError {
    /// Wrong type or already processed.
    pub fn is_invalid_state(&self) -> bool {
        matches!(
            self,
            LedgerError::WrongType { .. } | LedgerError::AlreadyProcessed(_)
        )
    }
}
