//! Authentication service routes

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    AppState,
    error::{AuthError, AuthResult},
    middleware::{CurrentUser, auth_middleware},
    models::{
        InviteRequest, InviteResponse, InviteVerification, LoginRequest, RegisterRequest,
        SetActiveRequest, SetupPasswordRequest, UpdateRoleRequest, User, UserResponse,
    },
};

/// Response for token generation
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// User together with a fresh token pair
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserResponse,
    #[serde(flatten)]
    pub tokens: TokenResponse,
}

/// Request carrying a refresh token
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/auth/me", get(me))
        .route("/invites", post(create_invite).get(list_invites))
        .route("/invites/:id", delete(cancel_invite))
        .route("/users", get(list_users))
        .route("/users/:id/role", patch(update_role))
        .route("/users/:id/active", patch(set_active))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh_token))
        .route("/auth/logout", post(logout))
        .route("/invites/verify/:token", get(verify_invite))
        .route("/invites/accept", post(accept_invite))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = common::database::health_check(&state.db_pool).await;
    let redis = state.sessions.health_check().await.unwrap_or(false);
    let status = if database && redis { "ok" } else { "degraded" };

    Json(json!({
        "status": status,
        "service": "auth-service",
        "database": database,
        "redis": redis,
    }))
}

/// Issue a token pair and record the refresh token as the live session
async fn start_session(state: &AppState, user: &User) -> AuthResult<TokenResponse> {
    let pair = state.jwt_service.issue(user).map_err(|e| {
        error!("Failed to generate tokens: {}", e);
        AuthError::InternalServerError
    })?;

    state
        .sessions
        .store(user.id, &pair.refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to store session in Redis: {}", e);
            AuthError::InternalServerError
        })?;

    Ok(TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_service.access_token_expiry(),
    })
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AuthResult<impl IntoResponse> {
    let user = state.accounts.register(payload).await?;
    let tokens = start_session(&state, &user).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: UserResponse::from(&user),
            tokens,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AuthResult<impl IntoResponse> {
    info!("Login attempt for: {}", payload.email);

    let user = state
        .accounts
        .authenticate(&payload.email, &payload.password)
        .await?;
    let tokens = start_session(&state, &user).await?;

    Ok(Json(AuthResponse {
        user: UserResponse::from(&user),
        tokens,
    }))
}

/// Exchange a refresh token for a new pair; the presented token is revoked
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> AuthResult<impl IntoResponse> {
    let claims = state
        .jwt_service
        .validate_refresh(&payload.refresh_token)
        .map_err(|_| AuthError::Unauthorized)?;

    let revoked = state
        .sessions
        .is_revoked(&payload.refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to check token revocation: {}", e);
            AuthError::InternalServerError
        })?;
    if revoked {
        return Err(AuthError::Unauthorized);
    }

    let current = state
        .sessions
        .is_current(claims.sub, &payload.refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to read session from Redis: {}", e);
            AuthError::InternalServerError
        })?;
    if !current {
        return Err(AuthError::Unauthorized);
    }

    // Role and active flag are re-read so changes apply at the next refresh
    let user = state.accounts.active_user(claims.sub).await?;

    state
        .sessions
        .revoke(
            &payload.refresh_token,
            state.jwt_service.remaining_lifetime(&claims),
        )
        .await
        .map_err(|e| {
            error!("Failed to revoke refresh token: {}", e);
            AuthError::InternalServerError
        })?;

    let tokens = start_session(&state, &user).await?;
    Ok(Json(tokens))
}

pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> AuthResult<impl IntoResponse> {
    let claims = state
        .jwt_service
        .validate_refresh(&payload.refresh_token)
        .map_err(|_| AuthError::Unauthorized)?;

    state
        .sessions
        .revoke(
            &payload.refresh_token,
            state.jwt_service.remaining_lifetime(&claims),
        )
        .await
        .map_err(|e| {
            error!("Failed to revoke refresh token: {}", e);
            AuthError::InternalServerError
        })?;

    state.sessions.end(claims.sub).await.map_err(|e| {
        error!("Failed to remove session from Redis: {}", e);
        AuthError::InternalServerError
    })?;

    Ok(Json(json!({ "message": "Logged out successfully" })))
}

pub async fn me(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
) -> AuthResult<impl IntoResponse> {
    let user = state.accounts.active_user(principal.id).await?;
    Ok(Json(UserResponse::from(&user)))
}

pub async fn create_invite(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(payload): Json<InviteRequest>,
) -> AuthResult<impl IntoResponse> {
    let invite = state
        .invites
        .invite(&principal, &payload.email, payload.role)
        .await?;

    Ok((StatusCode::CREATED, Json(InviteResponse::with_token(&invite))))
}

pub async fn list_invites(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
) -> AuthResult<impl IntoResponse> {
    let invites = state.invites.list_pending(&principal).await?;
    let body: Vec<InviteResponse> = invites.iter().map(InviteResponse::from).collect();
    Ok(Json(body))
}

pub async fn cancel_invite(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<Uuid>,
) -> AuthResult<impl IntoResponse> {
    state.invites.cancel(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn verify_invite(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AuthResult<impl IntoResponse> {
    let invite = state.invites.verify(&token).await?;
    Ok(Json(InviteVerification::from(&invite)))
}

/// Accept an invite by setting a password; signs the new account in
pub async fn accept_invite(
    State(state): State<AppState>,
    Json(payload): Json<SetupPasswordRequest>,
) -> AuthResult<impl IntoResponse> {
    let user = state.invites.setup_password(payload).await?;
    let tokens = start_session(&state, &user).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: UserResponse::from(&user),
            tokens,
        }),
    ))
}

pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
) -> AuthResult<impl IntoResponse> {
    let users = state.accounts.list(&principal).await?;
    let body: Vec<UserResponse> = users.iter().map(UserResponse::from).collect();
    Ok(Json(body))
}

pub async fn update_role(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> AuthResult<impl IntoResponse> {
    let user = state
        .accounts
        .update_role(&principal, id, payload.role)
        .await?;
    Ok(Json(UserResponse::from(&user)))
}

pub async fn set_active(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetActiveRequest>,
) -> AuthResult<impl IntoResponse> {
    let user = state
        .accounts
        .set_active(&principal, id, payload.is_active)
        .await?;
    Ok(Json(UserResponse::from(&user)))
}
