use std::fmt;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use common::LedgerError;
use serde_json::json;

/// Ledger failures rendered as `{success: false, error}` responses.
#[derive(Debug)]
pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError(err)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            LedgerError::Unauthorized | LedgerError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
            LedgerError::WrongType { .. } | LedgerError::AlreadyProcessed(_) => {
                StatusCode::CONFLICT
            }
            LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
            LedgerError::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LedgerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match &self.0 {
            // storage details stay in the log
            LedgerError::Unavailable(e) => {
                log::error!("Storage failure: {}", e);
                "Service temporarily unavailable. Please try again later.".to_string()
            }
            other => other.to_string(),
        };
        error_body(self.status_code(), &message)
    }
}

/// The `{success: false, error}` body shared by every failing route.
pub fn error_body(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(json!({
        "success": false,
        "error": message,
    }))
}
