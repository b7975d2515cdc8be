use crate::domain::values::FieldError;
use crate::transport::http::types::ApiResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Validation/coercion failed")]
    InvalidFields(Vec<FieldError>),

    #[error("{field} {id} does not exist in {table}")]
    InvalidReference {
        field: String,
        table: String,
        id: i64,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("Method {0} is not allowed on this route")]
    MethodNotAllowed(String),

    #[error("Invalid username or password")]
    Unauthorized,

    #[error("{0}")]
    Conflict(String),

    #[error("Internal server error")]
    Store(#[source] sqlx::Error),

    #[error("Internal server error")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::InvalidFields(_)
            | AppError::InvalidReference { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Reclassifies constraint violations raised by Postgres. Everything else stays a store error.
    pub fn from_db(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or("unnamed").to_string();
            match db_err.code().as_deref() {
                Some("23505") => {
                    return AppError::Conflict(format!(
                        "Duplicate value violates unique constraint '{}'",
                        constraint
                    ))
                }
                Some("23503") => {
                    return AppError::Conflict(format!(
                        "Foreign key constraint '{}' violated (record is referenced or references a missing record)",
                        constraint
                    ))
                }
                Some("23514") => {
                    return AppError::Validation(format!(
                        "Value violates check constraint '{}'",
                        constraint
                    ))
                }
                Some("23502") => return AppError::validation(db_err.message().to_string()),
                Some("22003") => return AppError::validation("Numeric value out of range"),
                _ => {}
            }
        }
        AppError::Store(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::from_db(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            AppError::Store(e) => tracing::error!(error = %e, "store error"),
            AppError::Internal(msg) => tracing::error!(error = %msg, "internal error"),
            _ => tracing::debug!(status = status.as_u16(), error = %self, "request rejected"),
        }

        let data = match &self {
            AppError::InvalidFields(errors) => Some(serde_json::json!({ "errors": errors })),
            _ => None,
        };

        (
            status,
            Json(ApiResponse {
                success: false,
                data,
                error: Some(self.to_string()),
            }),
        )
            .into_response()
    }
}
