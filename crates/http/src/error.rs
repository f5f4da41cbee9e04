//! Error handling for the HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

/// Standard error body for all HTTP errors, wrapped as `{"error": ErrorBody}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub details: Vec<serde_json::Value>,
    pub trace_id: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation error: {message}")]
    Validation {
        details: Vec<serde_json::Value>,
        code: String,
        message: String,
    },

    #[error("not found: {message}")]
    NotFound { message: String, code: String },

    #[error("bad request: {message}")]
    BadRequest { message: String, code: String },

    /// A store operation failed; the store's message is passed through to the client.
    #[error("store error: {message}")]
    Store { message: String, code: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a validation error
    pub fn validation(details: Vec<serde_json::Value>, message: impl Into<String>) -> Self {
        Self::Validation {
            details,
            code: "validation_error".to_string(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            code: "not_found".to_string(),
        }
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            code: "bad_request".to_string(),
        }
    }

    /// Create a store failure error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            code: "store_error".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Store { .. } | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4();
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        let status = self.status();

        let (error_code, message, details) = match self {
            AppError::Validation {
                details,
                code,
                message,
            } => (code, message, details),
            AppError::NotFound { message, code }
            | AppError::BadRequest { message, code }
            | AppError::Store { message, code } => (code, message, Vec::new()),
            AppError::Internal(e) => {
                tracing::error!(error_id = %error_id, error = ?e, "internal error");
                // Internal details stay in the logs for release builds
                let message = if cfg!(debug_assertions) {
                    format!("{:#}", e)
                } else {
                    "An internal server error occurred".to_string()
                };
                ("internal_error".to_string(), message, Vec::new())
            }
        };

        if status.is_server_error() {
            tracing::error!(
                error_id = %error_id,
                error_code = %error_code,
                status_code = %status.as_u16(),
                message = %message,
                "Request error"
            );
        } else {
            tracing::warn!(
                error_id = %error_id,
                error_code = %error_code,
                status_code = %status.as_u16(),
                "Request error"
            );
        }

        let envelope = ErrorEnvelope {
            error: ErrorBody {
                code: error_code,
                message,
                details,
                trace_id: error_id.to_string(),
                timestamp,
            },
        };

        (status, Json(envelope)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::{json, Value};

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_validation_error() {
        let details = vec![json!({"field": "title", "error": "required"})];
        let error = AppError::validation(details.clone(), "Validation failed");

        match error {
            AppError::Validation {
                details: d,
                code,
                message,
            } => {
                assert_eq!(d, details);
                assert_eq!(code, "validation_error");
                assert_eq!(message, "Validation failed");
            }
            _ => panic!("Expected Validation error"),
        }
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            AppError::not_found("missing").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::bad_request("bad id").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::validation(vec![], "nope").into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::store("write failed").into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_error_mapping() {
        let internal_error = anyhow::anyhow!("Database connection failed");
        let error = AppError::Internal(internal_error);
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_error_response_format() {
        let details = vec![json!({"field": "price", "error": "must be greater than 10"})];
        let response = AppError::validation(details.clone(), "Invalid book").into_response();
        let body = body_json(response).await;

        assert_eq!(body["error"]["code"], "validation_error");
        assert_eq!(body["error"]["message"], "Invalid book");
        assert_eq!(body["error"]["details"], Value::Array(details));
        assert!(Uuid::parse_str(body["error"]["trace_id"].as_str().unwrap()).is_ok());
        let timestamp = body["error"]["timestamp"].as_str().unwrap();
        assert!(OffsetDateTime::parse(timestamp, &Rfc3339).is_ok());
    }

    #[tokio::test]
    async fn store_errors_surface_the_store_message() {
        let response = AppError::store("Saving record failed: disk full").into_response();
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "store_error");
        assert_eq!(body["error"]["message"], "Saving record failed: disk full");
    }
}
