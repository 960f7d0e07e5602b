//! Custom error types for the API service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::{Denial, ResourceKind, error::DatabaseError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// No valid credentials were presented
    #[error("Authentication required")]
    Unauthorized,

    /// Role violation on a resource whose existence is not sensitive
    #[error("{0}")]
    Forbidden(String),

    /// Missing, or not visible to the caller
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("A page with this slug already exists")]
    DuplicateSlug,

    #[error("Archived customizations cannot be changed")]
    CustomizationArchived,

    #[error("Version {0} not found")]
    VersionNotFound(i32),

    #[error("The customization was changed by another request; try again")]
    ConcurrentModification,

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl ApiError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Translate an access-gate denial for a resource of `kind`
    pub fn denied(denial: Denial, kind: ResourceKind) -> Self {
        match denial {
            Denial::Unauthenticated => ApiError::Unauthorized,
            Denial::Forbidden => ApiError::Forbidden(format!(
                "Insufficient privileges for this {}",
                kind_name(kind).to_lowercase()
            )),
            Denial::NotFound => ApiError::NotFound(kind_name(kind)),
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            ApiError::DuplicateSlug => (StatusCode::CONFLICT, "duplicate_slug"),
            ApiError::CustomizationArchived => (StatusCode::CONFLICT, "customization_archived"),
            ApiError::VersionNotFound(_) => (StatusCode::NOT_FOUND, "version_not_found"),
            ApiError::ConcurrentModification => (StatusCode::CONFLICT, "concurrent_modification"),
            ApiError::InternalServerError | ApiError::Database(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }
}

fn kind_name(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Template => "Template",
        ResourceKind::Page => "Page",
        ResourceKind::Section => "Section",
        ResourceKind::Customization => "Customization",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let mut detail = json!({ "code": code, "message": message });
        if let ApiError::Validation { field, .. } = &self {
            detail["field"] = json!(field);
        }

        (status, Json(json!({ "error": detail }))).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
