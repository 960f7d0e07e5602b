//! Invite model
//!
//! An invite is a time-bounded, single-use token that lets its recipient
//! create an account at a pre-assigned role.

use chrono::{DateTime, Duration, Utc};
use common::Role;
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const TOKEN_LENGTH: usize = 48;

#[derive(Debug, Clone)]
pub struct Invite {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub invited_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Where an invite stands at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteState {
    Pending,
    Accepted,
    Expired,
}

impl Invite {
    pub fn issue(email: String, role: Role, invited_by: Uuid, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            role,
            token: generate_token(),
            expires_at: now + ttl,
            accepted_at: None,
            invited_by,
            created_at: now,
        }
    }

    /// Acceptance wins over expiry: an invite accepted in time stays accepted.
    pub fn state_at(&self, now: DateTime<Utc>) -> InviteState {
        if self.accepted_at.is_some() {
            InviteState::Accepted
        } else if now >= self.expires_at {
            InviteState::Expired
        } else {
            InviteState::Pending
        }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) == InviteState::Pending
    }
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct InviteRequest {
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetupPasswordRequest {
    pub token: String,
    pub password: String,
    pub name: Option<String>,
}

/// Invite as shown to administrators. The token is only revealed once, in
/// the response to the invite itself.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteResponse {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub invited_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl InviteResponse {
    pub fn with_token(invite: &Invite) -> Self {
        Self {
            token: Some(invite.token.clone()),
            ..Self::from(invite)
        }
    }
}

impl From<&Invite> for InviteResponse {
    fn from(invite: &Invite) -> Self {
        Self {
            id: invite.id,
            email: invite.email.clone(),
            role: invite.role,
            token: None,
            expires_at: invite.expires_at,
            accepted_at: invite.accepted_at,
            invited_by: invite.invited_by,
            created_at: invite.created_at,
        }
    }
}

/// What the invite link reveals to its recipient before they set a password
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteVerification {
    pub email: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl From<&Invite> for InviteVerification {
    fn from(invite: &Invite) -> Self {
        Self {
            email: invite.email.clone(),
            role: invite.role,
            expires_at: invite.expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invite(ttl: Duration) -> Invite {
        Invite::issue("a@example.com".into(), Role::User, Uuid::new_v4(), ttl)
    }

    #[test]
    fn fresh_invite_is_pending() {
        let invite = invite(Duration::hours(1));
        assert_eq!(invite.state_at(Utc::now()), InviteState::Pending);
        assert_eq!(invite.token.len(), TOKEN_LENGTH);
    }

    #[test]
    fn invite_expires_at_its_deadline() {
        let invite = invite(Duration::hours(1));
        assert_eq!(invite.state_at(invite.expires_at), InviteState::Expired);
    }

    #[test]
    fn accepted_invite_stays_accepted_after_expiry() {
        let mut invite = invite(Duration::hours(1));
        invite.accepted_at = Some(Utc::now());
        let later = invite.expires_at + Duration::days(1);
        assert_eq!(invite.state_at(later), InviteState::Accepted);
        assert!(!invite.is_active_at(later));
    }

    #[test]
    fn tokens_differ_between_invites() {
        assert_ne!(invite(Duration::hours(1)).token, invite(Duration::hours(1)).token);
    }
}
