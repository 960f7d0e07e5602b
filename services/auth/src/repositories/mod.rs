//! Persistence for users and invites
//!
//! Services talk to the stores through these traits; the PostgreSQL
//! repositories implement them for production and an in-memory store
//! implements them for tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseResult;
use uuid::Uuid;

use crate::models::{Invite, User};

pub mod invite;
#[cfg(test)]
pub mod memory;
pub mod user;

pub use invite::InviteRepository;
pub use user::UserRepository;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>>;
    async fn insert(&self, user: &User) -> DatabaseResult<()>;
    async fn update(&self, user: &User) -> DatabaseResult<()>;
    async fn list(&self) -> DatabaseResult<Vec<User>>;
}

/// The account written when an invite is accepted
#[derive(Debug, Clone)]
pub enum AccountWrite {
    /// No account existed for the invited email
    Insert(User),
    /// A placeholder account flagged for password setup is completed
    Update(User),
}

impl AccountWrite {
    pub fn user(&self) -> &User {
        match self {
            AccountWrite::Insert(user) | AccountWrite::Update(user) => user,
        }
    }
}

#[async_trait]
pub trait InviteStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Invite>>;
    async fn find_by_token(&self, token: &str) -> DatabaseResult<Option<Invite>>;
    /// The unaccepted, unexpired invite for `email`, if any
    async fn find_active_by_email(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Option<Invite>>;
    async fn insert(&self, invite: &Invite) -> DatabaseResult<()>;
    async fn delete(&self, id: Uuid) -> DatabaseResult<bool>;
    async fn list_pending(&self, now: DateTime<Utc>) -> DatabaseResult<Vec<Invite>>;
    /// Stamp the invite accepted and write the account as one atomic unit.
    /// Returns `false`, writing nothing, if the invite was already accepted.
    async fn accept(
        &self,
        invite_id: Uuid,
        accepted_at: DateTime<Utc>,
        account: &AccountWrite,
    ) -> DatabaseResult<bool>;
}
