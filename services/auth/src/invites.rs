//! Invite lifecycle: issue, verify, accept (password setup), cancel
//!
//! At most one active (unaccepted, unexpired) invite exists per email.
//! Accepted, expired and cancelled are terminal.

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{Principal, Role, error::DatabaseError};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AuthError, AuthResult},
    models::{Invite, InviteState, SetupPasswordRequest, User},
    password::hash_password,
    repositories::{AccountWrite, InviteStore, UserStore},
    validation::{normalize_email, validate_email, validate_name, validate_password},
};

#[derive(Clone)]
pub struct InviteService {
    users: Arc<dyn UserStore>,
    invites: Arc<dyn InviteStore>,
    ttl: Duration,
}

impl InviteService {
    pub fn new(users: Arc<dyn UserStore>, invites: Arc<dyn InviteStore>, ttl: Duration) -> Self {
        Self {
            users,
            invites,
            ttl,
        }
    }

    pub async fn invite(&self, caller: &Principal, email: &str, role: Role) -> AuthResult<Invite> {
        if !caller.is_admin_or_above() {
            return Err(AuthError::Forbidden("Only administrators may invite users".into()));
        }
        if role == Role::SuperAdmin {
            return Err(AuthError::SuperAdminAssignmentForbidden);
        }
        if !caller.is_super_admin() && role != Role::User {
            return Err(AuthError::Forbidden("ADMIN may only invite USER accounts".into()));
        }

        let email = normalize_email(email);
        validate_email(&email).map_err(|m| AuthError::validation("email", m))?;

        if let Some(user) = self.users.find_by_email(&email).await? {
            if user.is_established() {
                return Err(AuthError::DuplicateEmail);
            }
        }

        if self
            .invites
            .find_active_by_email(&email, Utc::now())
            .await?
            .is_some()
        {
            return Err(AuthError::ActiveInviteExists);
        }

        let invite = Invite::issue(email, role, caller.id, self.ttl);
        self.invites.insert(&invite).await?;

        info!("User {} invited {} as {}", caller.id, invite.email, invite.role);
        Ok(invite)
    }

    /// Resolve a token to its invite, refusing tokens that can no longer be used
    pub async fn verify(&self, token: &str) -> AuthResult<Invite> {
        let invite = self
            .invites
            .find_by_token(token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        match invite.state_at(Utc::now()) {
            InviteState::Pending => Ok(invite),
            InviteState::Accepted => Err(AuthError::AlreadyAccepted),
            InviteState::Expired => Err(AuthError::Expired),
        }
    }

    /// Accept an invite by choosing a password. Creates the account at the
    /// invited role, or completes a placeholder account for the same email.
    pub async fn setup_password(&self, request: SetupPasswordRequest) -> AuthResult<User> {
        let invite = self.verify(&request.token).await?;
        validate_password(&request.password).map_err(|m| AuthError::validation("password", m))?;
        validate_name(request.name.as_deref()).map_err(|m| AuthError::validation("name", m))?;

        let hash = hash_password(&request.password).map_err(|e| {
            warn!("Password hashing failed: {}", e);
            AuthError::InternalServerError
        })?;

        let now = Utc::now();
        let account = match self.users.find_by_email(&invite.email).await? {
            Some(user) if user.is_established() => return Err(AuthError::DuplicateEmail),
            Some(mut user) => {
                user.password_hash = Some(hash);
                user.role = invite.role;
                user.needs_password_setup = false;
                user.is_active = true;
                if request.name.is_some() {
                    user.name = request.name;
                }
                user.updated_at = now;
                AccountWrite::Update(user)
            }
            None => AccountWrite::Insert(User::new(
                invite.email.clone(),
                request.name,
                hash,
                invite.role,
            )),
        };

        let accepted = self
            .invites
            .accept(invite.id, now, &account)
            .await
            .map_err(|e| match e {
                DatabaseError::UniqueViolation(_) => AuthError::DuplicateEmail,
                other => other.into(),
            })?;
        if !accepted {
            return Err(AuthError::AlreadyAccepted);
        }

        let user = account.user().clone();
        info!("Invite {} accepted by user {}", invite.id, user.id);
        Ok(user)
    }

    /// Cancel a pending invite. Only its inviter or SUPER_ADMIN may do so;
    /// anyone else sees it as missing.
    pub async fn cancel(&self, caller: &Principal, invite_id: Uuid) -> AuthResult<()> {
        let invite = self
            .invites
            .find_by_id(invite_id)
            .await?
            .filter(|i| i.invited_by == caller.id || caller.is_super_admin())
            .ok_or(AuthError::NotFound("Invite"))?;

        if invite.accepted_at.is_some() {
            return Err(AuthError::AlreadyAccepted);
        }

        self.invites.delete(invite.id).await?;
        info!("Invite {} cancelled by {}", invite.id, caller.id);
        Ok(())
    }

    /// Pending invites: all of them for SUPER_ADMIN, the caller's own for ADMIN
    pub async fn list_pending(&self, caller: &Principal) -> AuthResult<Vec<Invite>> {
        if !caller.is_admin_or_above() {
            return Err(AuthError::Forbidden("Only administrators may list invites".into()));
        }

        let mut invites = self.invites.list_pending(Utc::now()).await?;
        if !caller.is_super_admin() {
            invites.retain(|i| i.invited_by == caller.id);
        }
        Ok(invites)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::MemoryStore;

    struct Fixture {
        service: InviteService,
        store: Arc<MemoryStore>,
        root: Principal,
        admin: Principal,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let service = InviteService::new(store.clone(), store.clone(), Duration::hours(24));

        let root = User::new("root@example.com".into(), None, "x".into(), Role::SuperAdmin);
        let admin = User::new("admin@example.com".into(), None, "x".into(), Role::Admin);
        UserStore::insert(&*store, &root).await.unwrap();
        UserStore::insert(&*store, &admin).await.unwrap();

        Fixture {
            service,
            store,
            root: Principal::new(root.id, root.role),
            admin: Principal::new(admin.id, admin.role),
        }
    }

    fn setup(token: &str) -> SetupPasswordRequest {
        SetupPasswordRequest {
            token: token.into(),
            password: "Valid-Passw0rd".into(),
            name: Some("Grace".into()),
        }
    }

    async fn expire(store: &MemoryStore, invite: &Invite) {
        let mut expired = invite.clone();
        expired.expires_at = Utc::now() - Duration::minutes(1);
        InviteStore::delete(store, invite.id).await.unwrap();
        InviteStore::insert(store, &expired).await.unwrap();
    }

    #[tokio::test]
    async fn second_active_invite_for_same_email_conflicts() {
        let f = fixture().await;
        f.service.invite(&f.root, "new@example.com", Role::User).await.unwrap();

        let err = f
            .service
            .invite(&f.root, "NEW@example.com", Role::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ActiveInviteExists));
    }

    #[tokio::test]
    async fn reinvite_after_expiry_succeeds() {
        let f = fixture().await;
        let first = f.service.invite(&f.root, "late@example.com", Role::User).await.unwrap();
        expire(&f.store, &first).await;

        let second = f.service.invite(&f.root, "late@example.com", Role::User).await.unwrap();
        assert_ne!(first.token, second.token);
        assert!(matches!(
            f.service.verify(&first.token).await,
            Err(AuthError::Expired)
        ));
    }

    #[tokio::test]
    async fn reinvite_of_established_account_is_duplicate_email() {
        let f = fixture().await;
        let invite = f.service.invite(&f.root, "joined@example.com", Role::User).await.unwrap();
        f.service.setup_password(setup(&invite.token)).await.unwrap();

        assert!(matches!(
            f.service.invite(&f.root, "joined@example.com", Role::User).await,
            Err(AuthError::DuplicateEmail)
        ));
    }

    #[tokio::test]
    async fn accepted_invite_does_not_block_a_new_one() {
        let f = fixture().await;
        let first = f.service.invite(&f.root, "reset@example.com", Role::User).await.unwrap();
        let mut user = f.service.setup_password(setup(&first.token)).await.unwrap();

        // Account sent back to password setup
        user.password_hash = None;
        user.needs_password_setup = true;
        UserStore::update(&*f.store, &user).await.unwrap();

        let second = f.service.invite(&f.root, "reset@example.com", Role::User).await.unwrap();
        assert_ne!(first.token, second.token);
        assert!(matches!(
            f.service.verify(&first.token).await,
            Err(AuthError::AlreadyAccepted)
        ));

        let again = f.service.setup_password(setup(&second.token)).await.unwrap();
        assert_eq!(again.id, user.id);
        assert!(again.is_established());
    }

    #[tokio::test]
    async fn invite_completes_placeholder_account() {
        let f = fixture().await;
        let mut placeholder =
            User::new("pending@example.com".into(), None, String::new(), Role::User);
        placeholder.password_hash = None;
        placeholder.needs_password_setup = true;
        UserStore::insert(&*f.store, &placeholder).await.unwrap();

        let invite = f
            .service
            .invite(&f.root, "pending@example.com", Role::Admin)
            .await
            .unwrap();
        let user = f.service.setup_password(setup(&invite.token)).await.unwrap();

        assert_eq!(user.id, placeholder.id);
        assert_eq!(user.role, Role::Admin);
        assert!(user.is_established());
    }

    #[tokio::test]
    async fn setup_password_creates_account_at_invited_role() {
        let f = fixture().await;
        let invite = f.service.invite(&f.root, "staff@example.com", Role::Admin).await.unwrap();

        let user = f.service.setup_password(setup(&invite.token)).await.unwrap();
        assert_eq!(user.email, "staff@example.com");
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.name.as_deref(), Some("Grace"));

        let stored = InviteStore::find_by_id(&*f.store, invite.id).await.unwrap().unwrap();
        assert!(stored.accepted_at.is_some());

        assert!(matches!(
            f.service.setup_password(setup(&invite.token)).await,
            Err(AuthError::AlreadyAccepted)
        ));
    }

    #[tokio::test]
    async fn weak_password_leaves_invite_pending() {
        let f = fixture().await;
        let invite = f.service.invite(&f.root, "weak@example.com", Role::User).await.unwrap();

        let mut request = setup(&invite.token);
        request.password = "weak".into();
        assert!(matches!(
            f.service.setup_password(request).await,
            Err(AuthError::Validation { field: "password", .. })
        ));
        assert!(f.service.verify(&invite.token).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_token_is_invalid() {
        let f = fixture().await;
        assert!(matches!(
            f.service.verify("nope").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn invite_role_rules() {
        let f = fixture().await;
        assert!(matches!(
            f.service.invite(&f.root, "x@example.com", Role::SuperAdmin).await,
            Err(AuthError::SuperAdminAssignmentForbidden)
        ));
        assert!(matches!(
            f.service.invite(&f.admin, "x@example.com", Role::Admin).await,
            Err(AuthError::Forbidden(_))
        ));
        assert!(f.service.invite(&f.admin, "x@example.com", Role::User).await.is_ok());

        let plain = Principal::new(Uuid::new_v4(), Role::User);
        assert!(matches!(
            f.service.invite(&plain, "y@example.com", Role::User).await,
            Err(AuthError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn cancel_is_limited_to_inviter_or_super_admin() {
        let f = fixture().await;
        let invite = f.service.invite(&f.admin, "c@example.com", Role::User).await.unwrap();

        let other_admin = Principal::new(Uuid::new_v4(), Role::Admin);
        assert!(matches!(
            f.service.cancel(&other_admin, invite.id).await,
            Err(AuthError::NotFound("Invite"))
        ));

        f.service.cancel(&f.root, invite.id).await.unwrap();
        assert!(matches!(
            f.service.verify(&invite.token).await,
            Err(AuthError::InvalidToken)
        ));

        // a cancelled invite frees the email for a new one
        assert!(f.service.invite(&f.admin, "c@example.com", Role::User).await.is_ok());
    }

    #[tokio::test]
    async fn accepted_invites_cannot_be_cancelled() {
        let f = fixture().await;
        let invite = f.service.invite(&f.root, "done@example.com", Role::User).await.unwrap();
        f.service.setup_password(setup(&invite.token)).await.unwrap();

        assert!(matches!(
            f.service.cancel(&f.root, invite.id).await,
            Err(AuthError::AlreadyAccepted)
        ));
    }

    #[tokio::test]
    async fn pending_list_excludes_expired_and_foreign_invites() {
        let f = fixture().await;
        let mine = f.service.invite(&f.admin, "a@example.com", Role::User).await.unwrap();
        f.service.invite(&f.root, "b@example.com", Role::User).await.unwrap();
        let stale = f.service.invite(&f.root, "c@example.com", Role::User).await.unwrap();
        expire(&f.store, &stale).await;

        let admin_view = f.service.list_pending(&f.admin).await.unwrap();
        assert_eq!(admin_view.len(), 1);
        assert_eq!(admin_view[0].id, mine.id);

        let root_view = f.service.list_pending(&f.root).await.unwrap();
        assert_eq!(root_view.len(), 2);
    }
}
