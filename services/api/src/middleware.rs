//! Bearer-token authentication
//!
//! Tokens are issued by the authentication service; this service only
//! verifies them against its public key.

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{HeaderMap, Request, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use common::{Principal, TokenVerifier};
use tracing::debug;

use crate::{error::ApiError, state::AppState};

/// `Ok(None)` without an Authorization header; a header that does not carry
/// a valid access token is rejected
fn bearer_principal(
    verifier: &TokenVerifier,
    headers: &HeaderMap,
) -> Result<Option<Principal>, ApiError> {
    let Some(bearer) = headers.typed_get::<Authorization<Bearer>>() else {
        return Ok(None);
    };

    verifier
        .verify_access(bearer.token())
        .map(Some)
        .map_err(|e| {
            debug!("Rejected access token: {}", e);
            ApiError::Unauthorized
        })
}

/// Require a valid access token and attach the caller's [`Principal`]
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let principal =
        bearer_principal(&state.verifier, req.headers())?.ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Attach the caller's [`Principal`] when a token is presented
pub async fn optional_auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(principal) = bearer_principal(&state.verifier, req.headers())? {
        req.extensions_mut().insert(principal);
    }
    Ok(next.run(req).await)
}

/// The authenticated caller
pub struct CurrentUser(pub Principal);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .copied()
            .map(CurrentUser)
            .ok_or(ApiError::Unauthorized)
    }
}

/// The caller, if one authenticated
pub struct MaybeUser(pub Option<Principal>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<Principal>().copied()))
    }
}
