//! Error types for the profile backend.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
///
/// The first four variants carry structured detail so a caller can
/// reconstruct the failed precondition (which field, which limit) without
/// parsing the message.
#[derive(Debug, Error)]
pub enum AppError {
    // === Domain Errors ===
    /// The resource does not exist, or exists but is concealed from the caller.
    #[error("{resource} not found")]
    NotFound {
        /// Kind of resource that was looked up.
        resource: String,
    },

    /// A uniqueness constraint would be violated.
    #[error("{field} '{value}' already exists")]
    Duplicate {
        /// Field that must be unique.
        field: String,
        /// Conflicting value.
        value: String,
    },

    /// A bounded collection is already full.
    #[error("{resource} limit of {limit} exceeded (current: {current})")]
    LimitExceeded {
        /// Kind of bounded resource.
        resource: String,
        /// Maximum number of entries.
        limit: usize,
        /// Number of entries the operation would have produced or found.
        current: usize,
    },

    /// Input failed a validation rule.
    #[error("Validation failed for {field}: {message}")]
    Validation {
        /// Offending field.
        field: String,
        /// Human readable reason.
        message: String,
    },

    // === Client Errors ===
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // === Server Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Redis error: {0}")]
    Redis(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Build a [`AppError::NotFound`].
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Build a [`AppError::Duplicate`].
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Duplicate {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Build a [`AppError::LimitExceeded`].
    pub fn limit_exceeded(resource: impl Into<String>, limit: usize, current: usize) -> Self {
        Self::LimitExceeded {
            resource: resource.into(),
            limit,
            current,
        }
    }

    /// Build a [`AppError::Validation`].
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Duplicate { .. } => StatusCode::CONFLICT,
            Self::LimitExceeded { .. } => StatusCode::BAD_REQUEST,
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,

            // 5xx Server Errors
            Self::Database(_) | Self::Redis(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "RESOURCE_NOT_FOUND",
            Self::Duplicate { .. } => "RESOURCE_DUPLICATE",
            Self::LimitExceeded { .. } => "RESOURCE_LIMIT_EXCEEDED",
            Self::Validation { .. } => "VALIDATION_FAILED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Redis(_) => "REDIS_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Structured detail for the domain variants.
    #[must_use]
    pub fn details(&self) -> Option<Value> {
        match self {
            Self::NotFound { resource } => Some(json!({ "resource": resource })),
            Self::Duplicate { field, value } => Some(json!({ "field": field, "value": value })),
            Self::LimitExceeded {
                resource,
                limit,
                current,
            } => Some(json!({ "resource": resource, "limit": limit, "current": current })),
            Self::Validation { field, message } => {
                Some(json!({ "field": field, "message": message }))
            }
            _ => None,
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        let message = if self.is_server_error() {
            tracing::error!(error = %self, code = code, "Server error occurred");
            "An internal error occurred".to_string()
        } else {
            tracing::debug!(error = %self, code = code, "Client error occurred");
            self.to_string()
        };

        let mut error = json!({
            "code": code,
            "message": message,
        });
        if let (Some(details), Some(obj)) = (self.details(), error.as_object_mut()) {
            obj.insert("details".to_string(), details);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let field = err
            .field_errors()
            .keys()
            .next()
            .map_or_else(|| "request".to_string(), ToString::to_string);
        Self::Validation {
            field,
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_status_codes() {
        assert_eq!(AppError::not_found("User").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::duplicate("username", "alice").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::limit_exceeded("interests", 20, 20).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::validation("expires_at", "must be in the future").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_limit_details() {
        let details = AppError::limit_exceeded("extra_photos", 8, 8).details();
        assert_eq!(
            details,
            Some(json!({ "resource": "extra_photos", "limit": 8, "current": 8 }))
        );
    }

    #[test]
    fn test_plumbing_errors_have_no_details() {
        assert!(AppError::Unauthorized.details().is_none());
        assert!(AppError::Database("boom".into()).is_server_error());
    }
}
