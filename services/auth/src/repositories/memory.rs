//! In-memory user and invite store used by service tests

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{DatabaseError, DatabaseResult};
use uuid::Uuid;

use super::{AccountWrite, InviteStore, UserStore};
use crate::models::{Invite, User};

#[derive(Default)]
struct State {
    users: Vec<User>,
    invites: Vec<Invite>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("memory store poisoned")
    }
}

fn insert_unique(users: &mut Vec<User>, user: &User) -> DatabaseResult<()> {
    if users.iter().any(|u| u.email == user.email) {
        return Err(DatabaseError::UniqueViolation("users_email_key".into()));
    }
    users.push(user.clone());
    Ok(())
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, user: &User) -> DatabaseResult<()> {
        insert_unique(&mut self.lock().users, user)
    }

    async fn update(&self, user: &User) -> DatabaseResult<()> {
        let mut state = self.lock();
        if let Some(existing) = state.users.iter_mut().find(|u| u.id == user.id) {
            *existing = user.clone();
        }
        Ok(())
    }

    async fn list(&self) -> DatabaseResult<Vec<User>> {
        Ok(self.lock().users.clone())
    }
}

#[async_trait]
impl InviteStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Invite>> {
        Ok(self.lock().invites.iter().find(|i| i.id == id).cloned())
    }

    async fn find_by_token(&self, token: &str) -> DatabaseResult<Option<Invite>> {
        Ok(self.lock().invites.iter().find(|i| i.token == token).cloned())
    }

    async fn find_active_by_email(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Option<Invite>> {
        Ok(self
            .lock()
            .invites
            .iter()
            .find(|i| i.email == email && i.is_active_at(now))
            .cloned())
    }

    async fn insert(&self, invite: &Invite) -> DatabaseResult<()> {
        self.lock().invites.push(invite.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<bool> {
        let mut state = self.lock();
        let before = state.invites.len();
        state.invites.retain(|i| i.id != id);
        Ok(state.invites.len() != before)
    }

    async fn list_pending(&self, now: DateTime<Utc>) -> DatabaseResult<Vec<Invite>> {
        Ok(self
            .lock()
            .invites
            .iter()
            .filter(|i| i.is_active_at(now))
            .cloned()
            .collect())
    }

    async fn accept(
        &self,
        invite_id: Uuid,
        accepted_at: DateTime<Utc>,
        account: &AccountWrite,
    ) -> DatabaseResult<bool> {
        let mut state = self.lock();
        let Some(index) = state
            .invites
            .iter()
            .position(|i| i.id == invite_id && i.accepted_at.is_none())
        else {
            return Ok(false);
        };

        match account {
            AccountWrite::Insert(user) => insert_unique(&mut state.users, user)?,
            AccountWrite::Update(user) => {
                if let Some(existing) = state.users.iter_mut().find(|u| u.id == user.id) {
                    *existing = user.clone();
                }
            }
        }
        state.invites[index].accepted_at = Some(accepted_at);
        Ok(true)
    }
}
