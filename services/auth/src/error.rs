//! Error types for the authentication service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::{access::UserChangeDenial, error::DatabaseError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Forbidden(String),

    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("A user with this email already exists")]
    DuplicateEmail,

    #[error("An active invite already exists for this email")]
    ActiveInviteExists,

    #[error("Invalid invite token")]
    InvalidToken,

    #[error("Invite has expired")]
    Expired,

    #[error("Invite has already been accepted")]
    AlreadyAccepted,

    #[error("Users cannot modify their own role or status")]
    SelfModificationForbidden,

    #[error("The SUPER_ADMIN role cannot be assigned")]
    SuperAdminAssignmentForbidden,

    #[error("Internal server error")]
    InternalServerError,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl AuthError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AuthError::Validation {
            field,
            message: message.into(),
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AuthError::Unauthorized | AuthError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "unauthenticated")
            }
            AuthError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AuthError::SelfModificationForbidden => {
                (StatusCode::FORBIDDEN, "self_modification_forbidden")
            }
            AuthError::SuperAdminAssignmentForbidden => {
                (StatusCode::FORBIDDEN, "super_admin_assignment_forbidden")
            }
            AuthError::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AuthError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AuthError::DuplicateEmail => (StatusCode::CONFLICT, "duplicate_email"),
            AuthError::ActiveInviteExists => (StatusCode::CONFLICT, "active_invite_exists"),
            AuthError::InvalidToken => (StatusCode::NOT_FOUND, "invalid_token"),
            AuthError::Expired => (StatusCode::GONE, "expired"),
            AuthError::AlreadyAccepted => (StatusCode::CONFLICT, "already_accepted"),
            AuthError::InternalServerError | AuthError::Database(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }
}

impl From<UserChangeDenial> for AuthError {
    fn from(denial: UserChangeDenial) -> Self {
        match denial {
            UserChangeDenial::SelfModification => AuthError::SelfModificationForbidden,
            UserChangeDenial::SuperAdminAssignment => AuthError::SuperAdminAssignmentForbidden,
            UserChangeDenial::Forbidden => AuthError::Forbidden(denial.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let mut detail = json!({ "code": code, "message": message });
        if let AuthError::Validation { field, .. } = &self {
            detail["field"] = json!(field);
        }

        (status, Json(json!({ "error": detail }))).into_response()
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
