use actix_web::{HttpResponse, error::ResponseError, http::StatusCode};
use serde::Serialize;
use sqlx::error::Error as SqlxError;
use std::error::Error as StdError;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    /// The database cannot be reached at all (pool acquisition / connect failure).
    DatabaseUnavailable(String),
    Database(String),
    Internal(String),
    NotFound(String),
    BadRequest(String),
    Validation(String),
    Configuration(String),
    /// Upstream LLM provider unreachable, HTTP error, or unexpected envelope.
    External(String),
    /// LLM output failed JSON extraction or schema validation.
    AnalysisRejected(AnalysisRejection),
    Serialization(String),
}

/// Payload for 422 responses from the analysis pipeline: the client gets the
/// human-readable violations plus a short preview of what the model actually said.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRejection {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_preview: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<String>,
}

impl AnalysisRejection {
    pub fn new(error: impl Into<String>, raw: &str, validation_errors: Vec<String>) -> Self {
        Self {
            error: error.into(),
            raw_preview: Some(raw.chars().take(300).collect()),
            validation_errors,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DatabaseUnavailable(e) => write!(f, "Database unavailable: {}", e),
            AppError::Database(e) => write!(f, "Database error: {}", e),
            AppError::Internal(e) => write!(f, "Internal error: {}", e),
            AppError::NotFound(e) => write!(f, "Not found: {}", e),
            AppError::BadRequest(e) => write!(f, "Bad request: {}", e),
            AppError::Validation(e) => write!(f, "Validation error: {}", e),
            AppError::Configuration(e) => write!(f, "Configuration error: {}", e),
            AppError::External(e) => write!(f, "External service error: {}", e),
            AppError::AnalysisRejected(r) => write!(f, "Analysis rejected: {}", r.error),
            AppError::Serialization(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl StdError for AppError {}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::AnalysisRejected(rejection) => {
                HttpResponse::build(self.status_code()).json(rejection)
            }
            _ => HttpResponse::build(self.status_code()).json(ErrorResponse {
                error: self.to_string(),
            }),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::External(_) => StatusCode::BAD_GATEWAY,
            AppError::AnalysisRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SqlxError> for AppError {
    fn from(error: SqlxError) -> Self {
        match error {
            SqlxError::RowNotFound => AppError::NotFound("Record not found".to_string()),
            SqlxError::PoolTimedOut | SqlxError::PoolClosed => {
                AppError::DatabaseUnavailable(error.to_string())
            }
            SqlxError::Io(_) | SqlxError::Tls(_) => {
                AppError::DatabaseUnavailable(error.to_string())
            }
            _ => AppError::Database(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::Serialization(format!("JSON error: {}", error))
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_contract() {
        assert_eq!(
            AppError::DatabaseUnavailable("down".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::External("llm".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::AnalysisRejected(AnalysisRejection::new("bad", "{}", vec![])).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::NotFound("job".into()).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn rejection_preview_truncates_to_300_chars() {
        let raw = "x".repeat(500);
        let rejection = AnalysisRejection::new("no valid JSON object found", &raw, vec![]);
        assert_eq!(rejection.raw_preview.unwrap().len(), 300);
    }
}
