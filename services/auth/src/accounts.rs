//! Account management: registration, credential checks and user
//! administration

use std::sync::Arc;

use chrono::Utc;
use common::{
    Principal, Role,
    access::{UserChange, authorize_user_change},
    error::DatabaseError,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AuthError, AuthResult},
    models::{RegisterRequest, User},
    password::{hash_password, verify_password},
    repositories::UserStore,
    validation::{normalize_email, validate_email, validate_name, validate_password},
};

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Self-service sign-up; new accounts always start as USER
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<User> {
        let email = normalize_email(&request.email);
        validate_email(&email).map_err(|m| AuthError::validation("email", m))?;
        validate_password(&request.password).map_err(|m| AuthError::validation("password", m))?;
        validate_name(request.name.as_deref()).map_err(|m| AuthError::validation("name", m))?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        let hash = hash_password(&request.password).map_err(|e| {
            warn!("Password hashing failed: {}", e);
            AuthError::InternalServerError
        })?;
        let user = User::new(email, request.name, hash, Role::User);

        self.users.insert(&user).await.map_err(|e| match e {
            DatabaseError::UniqueViolation(_) => AuthError::DuplicateEmail,
            other => other.into(),
        })?;

        info!("Registered user {}", user.id);
        Ok(user)
    }

    /// Check credentials for login
    pub async fn authenticate(&self, email: &str, password: &str) -> AuthResult<User> {
        let email = normalize_email(email);
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let Some(hash) = user.password_hash.as_deref().filter(|_| user.is_established()) else {
            return Err(AuthError::Forbidden("Password setup required".into()));
        };

        if !verify_password(hash, password) {
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AuthError::Forbidden("Account is disabled".into()));
        }

        Ok(user)
    }

    /// Load an account that may still hold a session
    pub async fn active_user(&self, id: Uuid) -> AuthResult<User> {
        match self.users.find_by_id(id).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(AuthError::Unauthorized),
        }
    }

    pub async fn list(&self, caller: &Principal) -> AuthResult<Vec<User>> {
        if !caller.is_super_admin() {
            return Err(AuthError::Forbidden("Only SUPER_ADMIN may list users".into()));
        }
        Ok(self.users.list().await?)
    }

    pub async fn update_role(
        &self,
        caller: &Principal,
        target_id: Uuid,
        role: Role,
    ) -> AuthResult<User> {
        self.change(caller, target_id, UserChange::Role(role)).await
    }

    pub async fn set_active(
        &self,
        caller: &Principal,
        target_id: Uuid,
        is_active: bool,
    ) -> AuthResult<User> {
        self.change(caller, target_id, UserChange::Active(is_active))
            .await
    }

    async fn change(
        &self,
        caller: &Principal,
        target_id: Uuid,
        change: UserChange,
    ) -> AuthResult<User> {
        authorize_user_change(caller, target_id, change)?;

        let mut user = self
            .users
            .find_by_id(target_id)
            .await?
            .ok_or(AuthError::NotFound("User"))?;

        match change {
            UserChange::Role(role) => user.role = role,
            UserChange::Active(active) => user.is_active = active,
        }
        user.updated_at = Utc::now();
        self.users.update(&user).await?;

        info!("User {} changed {:?} on {}", caller.id, change, target_id);
        Ok(user)
    }
}
