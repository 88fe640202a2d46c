//! # Engine Errors
//!
//! One error type for every engine operation, plus the serializable
//! projection handed to callers.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Marquee                                │
//! │                                                                         │
//! │  ValidationError ──► CoreError ──┐                                      │
//! │                                  ├──► EngineError ──► ApiError          │
//! │  sqlx::Error ──► DbError ────────┘        │            { code,          │
//! │                                           │              message }      │
//! │  toml / io ──► Config ────────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Business failures keep their structured context (`CoreError`). Storage
//! failures are surfaced unchanged after the atomic unit rolled back.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use marquee_core::{CoreError, ErrorCode, ValidationError};
use marquee_db::DbError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Business rule violation (seat taken, balance short, ...).
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Stable machine-readable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::Core(e) => e.code(),
            EngineError::Database(_) => ErrorCode::DatabaseError,
            EngineError::Config(_) => ErrorCode::ConfigError,
        }
    }

    /// The wrapped business error, if any.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            EngineError::Core(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for EngineError {
    fn from(err: toml::ser::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// API Error
// =============================================================================

/// What a caller (HTTP handler, CLI) receives when an operation fails.
///
/// ## Serialization
/// ```json
/// {
///   "code": "SEAT_NOT_AVAILABLE",
///   "message": "Seats not available for showing show-1: F7"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Core(e) => ApiError::new(e.code(), e.to_string()),
            EngineError::Database(DbError::NotFound { entity, id }) => ApiError::new(
                ErrorCode::DatabaseError,
                format!("{} not found: {}", entity, id),
            ),
            EngineError::Database(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database operation failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            EngineError::Config(e) => ApiError::new(ErrorCode::ConfigError, e),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_core::Money;

    #[test]
    fn test_business_error_keeps_code_and_message() {
        let err: EngineError = CoreError::InsufficientBalance {
            member_id: "m-1".to_string(),
            available: Money::from_cents(10000),
            requested: Money::from_cents(60000),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::InsufficientBalance);

        let api = ApiError::from(err);
        assert_eq!(api.code, ErrorCode::InsufficientBalance);
        assert!(api.message.contains("available 100.00"));
    }

    #[test]
    fn test_database_error_is_generic() {
        let api = ApiError::from(EngineError::Database(DbError::QueryFailed(
            "disk I/O error".to_string(),
        )));
        assert_eq!(api.code, ErrorCode::DatabaseError);
        assert_eq!(api.message, "Database operation failed");
    }

    #[test]
    fn test_validation_maps_to_validation_code() {
        let err: EngineError = ValidationError::Required {
            field: "verification_code".to_string(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[test]
    fn test_api_error_json_shape() {
        let api = ApiError::new(ErrorCode::CannotCancel, "too late");
        let json = serde_json::to_value(&api).unwrap();
        assert_eq!(json["code"], "CANNOT_CANCEL");
        assert_eq!(json["message"], "too late");
        assert_eq!(api.to_string(), "[CannotCancel] too late");
    }
}
