//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::repository::RepositoryError;
use crate::models::Violation;
use crate::services::{EventServiceError, PayloadError};

/// API error response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    /// Human-readable validation messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
    /// Offending payload keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            fields: None,
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = Some(fields);
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Malformed request, optionally naming the offending fields
    BadRequest {
        message: String,
        fields: Option<Vec<String>>,
    },
    /// Well-formed request that breaks a domain rule
    Invalid(Vec<Violation>),
    Unauthorized,
    Forbidden,
    NotFound(String),
    /// Storage temporarily unreachable
    Unavailable(String),
    /// Unexpected failure; the message is logged, never returned
    Internal(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
            fields: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } | AppError::Invalid(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::BadRequest { message, fields } => {
                let body = ApiError::new(message);
                match fields {
                    Some(fields) => body.with_fields(fields),
                    None => body,
                }
            }
            AppError::Invalid(violations) => ApiError::new("Invalid event payload")
                .with_details(violations.iter().map(ToString::to_string).collect()),
            AppError::Unauthorized => ApiError::new("Unauthorized"),
            AppError::Forbidden => ApiError::new("Forbidden"),
            AppError::NotFound(message) => ApiError::new(message),
            AppError::Unavailable(message) => {
                tracing::error!(error = %message, "storage unavailable");
                ApiError::new("Service Unavailable")
            }
            AppError::Internal(message) => {
                tracing::error!(error = %message, "unhandled request failure");
                ApiError::new("Internal Server Error")
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        if err.is_retryable() {
            AppError::Unavailable(err.to_string())
        } else {
            AppError::Internal(err.to_string())
        }
    }
}

impl From<PayloadError> for AppError {
    fn from(err: PayloadError) -> Self {
        AppError::BadRequest {
            message: err.message,
            fields: err.fields,
        }
    }
}

impl From<EventServiceError> for AppError {
    fn from(err: EventServiceError) -> Self {
        match err {
            EventServiceError::ChildNotFound | EventServiceError::EventNotFound => {
                AppError::NotFound(err.to_string())
            }
            EventServiceError::ParentNotFound => AppError::bad_request(err.to_string()),
            EventServiceError::Invalid(violations) => AppError::Invalid(violations),
            EventServiceError::Persistence(message) => {
                tracing::error!(error = %message, "event persistence failed");
                AppError::Internal(message)
            }
            EventServiceError::Repository(e) => e.into(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
