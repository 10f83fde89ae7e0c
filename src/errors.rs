use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use std::fmt;

/// Errors surfaced by the record store and the visit aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitError {
    /// Malformed or out-of-range request fields.
    InvalidInput(String),
    /// No record exists for the requested URL.
    NotFound(String),
    /// The persistence layer could not be reached or timed out.
    StorageUnavailable(String),
    /// A concurrent write to the same URL was detected. Retried by the aggregator.
    ConcurrencyConflict(String),
}

pub type Result<T> = std::result::Result<T, VisitError>;

impl VisitError {
    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        VisitError::InvalidInput(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        VisitError::NotFound(msg.into())
    }

    pub fn storage_unavailable<T: Into<String>>(msg: T) -> Self {
        VisitError::StorageUnavailable(msg.into())
    }

    pub fn concurrency_conflict<T: Into<String>>(msg: T) -> Self {
        VisitError::ConcurrencyConflict(msg.into())
    }

    /// Stable short code, logged alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            VisitError::InvalidInput(_) => "E001",
            VisitError::NotFound(_) => "E002",
            VisitError::StorageUnavailable(_) => "E003",
            VisitError::ConcurrencyConflict(_) => "E004",
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            VisitError::InvalidInput(_) => "Invalid Input",
            VisitError::NotFound(_) => "Not Found",
            VisitError::StorageUnavailable(_) => "Storage Unavailable",
            VisitError::ConcurrencyConflict(_) => "Concurrency Conflict",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            VisitError::InvalidInput(msg)
            | VisitError::NotFound(msg)
            | VisitError::StorageUnavailable(msg)
            | VisitError::ConcurrencyConflict(msg) => msg,
        }
    }
}

impl fmt::Display for VisitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type(), self.message())
    }
}

impl std::error::Error for VisitError {}

impl From<mongodb::error::Error> for VisitError {
    fn from(err: mongodb::error::Error) -> Self {
        VisitError::StorageUnavailable(format!("Database error: {}", err))
    }
}

impl ResponseError for VisitError {
    fn status_code(&self) -> StatusCode {
        match self {
            VisitError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            VisitError::NotFound(_) => StatusCode::NOT_FOUND,
            VisitError::StorageUnavailable(_) | VisitError::ConcurrencyConflict(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.message()
        }))
    }
}
