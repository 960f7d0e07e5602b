//! Bearer-token authentication for protected routes

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use common::Principal;
use tracing::debug;

use crate::{AppState, error::AuthError};

/// Validate the access token and attach the caller's [`Principal`]
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AuthError::Unauthorized)?;

    let principal = state
        .jwt_service
        .verifier()
        .verify_access(bearer.token())
        .map_err(|e| {
            debug!("Rejected access token: {}", e);
            AuthError::Unauthorized
        })?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// The authenticated caller, as placed by [`auth_middleware`]
pub struct CurrentUser(pub Principal);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .copied()
            .map(CurrentUser)
            .ok_or(AuthError::Unauthorized)
    }
}
