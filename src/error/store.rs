use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("Store is uninitialized: no schema version recorded")]
    StoreUninitialized,

    #[error("Database schema version {found} is newer than supported version {expected}")]
    SchemaAhead { found: i64, expected: i64 },

    #[error("Schema migration to version {version} failed: {source}")]
    Migration {
        version: i64,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to record schema version {version}, step rolled back: {source}")]
    LedgerWrite {
        version: i64,
        #[source]
        source: sqlx::Error,
    },

    #[error("Admin tokens must be exactly 64 characters, got {length}")]
    InvalidTokenFormat { length: usize },

    #[error("Invalid module: {0}")]
    InvalidModule(String),

    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl StoreError {
    /// Caller-correctable input errors, as opposed to infrastructure failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidTokenFormat { .. } | StoreError::InvalidModule(_)
        )
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            StoreError::InvalidTokenFormat { .. } => (
                StatusCode::BAD_REQUEST,
                ApiErrorObject {
                    code: "INVALID_TOKEN".to_string(),
                    message: self.to_string(),
                },
            ),

            StoreError::InvalidModule(_) => (
                StatusCode::BAD_REQUEST,
                ApiErrorObject {
                    code: "INVALID_MODULE".to_string(),
                    message: self.to_string(),
                },
            ),

            StoreError::StoreUninitialized
            | StoreError::SchemaAhead { .. }
            | StoreError::Migration { .. }
            | StoreError::LedgerWrite { .. }
            | StoreError::InvalidInterval(_)
            | StoreError::JsonError(_)
            | StoreError::DatabaseError(_) => {
                tracing::error!(error = %self, "store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorObject {
                        code: "INTERNAL_ERROR".to_string(),
                        message: "An internal server error occurred.".to_string(),
                    },
                )
            }
        };
        (status, Json(ApiErrorBody { inner: error_body })).into_response()
    }
}

/// Standardized API error response payload.
#[derive(Serialize)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    #[serde(rename = "error")]
    pub inner: ApiErrorObject,
}
