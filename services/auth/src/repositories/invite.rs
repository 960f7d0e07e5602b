//! Invite repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseResult;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::{AccountWrite, InviteStore};
use crate::models::Invite;
use crate::repositories::user::{insert_user, update_user};

const INVITE_COLUMNS: &str =
    "id, email, role, token, expires_at, accepted_at, invited_by, created_at";

#[derive(Clone)]
pub struct InviteRepository {
    pool: PgPool,
}

impl InviteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn invite_from_row(row: &PgRow) -> Result<Invite, sqlx::Error> {
    let role: String = row.try_get("role")?;
    Ok(Invite {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        role: role.parse().map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        token: row.try_get("token")?,
        expires_at: row.try_get("expires_at")?,
        accepted_at: row.try_get("accepted_at")?,
        invited_by: row.try_get("invited_by")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl InviteStore for InviteRepository {
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Invite>> {
        let row = sqlx::query(&format!("SELECT {INVITE_COLUMNS} FROM invites WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(invite_from_row).transpose()?)
    }

    async fn find_by_token(&self, token: &str) -> DatabaseResult<Option<Invite>> {
        let row = sqlx::query(&format!(
            "SELECT {INVITE_COLUMNS} FROM invites WHERE token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(invite_from_row).transpose()?)
    }

    async fn find_active_by_email(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Option<Invite>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {INVITE_COLUMNS} FROM invites
            WHERE email = $1 AND accepted_at IS NULL AND expires_at > $2
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(email)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(invite_from_row).transpose()?)
    }

    async fn insert(&self, invite: &Invite) -> DatabaseResult<()> {
        info!("Recording invite for {} as {}", invite.email, invite.role);
        sqlx::query(
            r#"
            INSERT INTO invites (id, email, role, token, expires_at, accepted_at, invited_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(invite.id)
        .bind(&invite.email)
        .bind(invite.role.as_str())
        .bind(&invite.token)
        .bind(invite.expires_at)
        .bind(invite.accepted_at)
        .bind(invite.invited_by)
        .bind(invite.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM invites WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_pending(&self, now: DateTime<Utc>) -> DatabaseResult<Vec<Invite>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {INVITE_COLUMNS} FROM invites
            WHERE accepted_at IS NULL AND expires_at > $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(invite_from_row).collect::<Result<_, _>>()?)
    }

    async fn accept(
        &self,
        invite_id: Uuid,
        accepted_at: DateTime<Utc>,
        account: &AccountWrite,
    ) -> DatabaseResult<bool> {
        let mut tx = self.pool.begin().await?;

        let stamped = sqlx::query(
            "UPDATE invites SET accepted_at = $2 WHERE id = $1 AND accepted_at IS NULL",
        )
        .bind(invite_id)
        .bind(accepted_at)
        .execute(&mut *tx)
        .await?;

        if stamped.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        match account {
            AccountWrite::Insert(user) => insert_user(&mut *tx, user).await?,
            AccountWrite::Update(user) => update_user(&mut *tx, user).await?,
        }

        tx.commit().await?;
        Ok(true)
    }
}
