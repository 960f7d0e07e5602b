//! Customization repository for database operations

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow, types::Json};
use uuid::Uuid;

use super::CustomizationStore;
use crate::models::{Customization, CustomizationStatus, FieldChange, VersionEntry};

const CUSTOMIZATION_COLUMNS: &str = "c.id, c.page_id, c.template_id, c.changes, c.status, \
                                     c.version, c.history, c.created_at, c.updated_at";

#[derive(Clone)]
pub struct CustomizationRepository {
    pool: PgPool,
}

impl CustomizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn customization_from_row(row: &PgRow) -> Result<Customization, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let Json(changes): Json<Vec<FieldChange>> = row.try_get("changes")?;
    let Json(history): Json<Vec<VersionEntry>> = row.try_get("history")?;
    Ok(Customization {
        id: row.try_get("id")?,
        page_id: row.try_get("page_id")?,
        template_id: row.try_get("template_id")?,
        changes,
        status: status.parse().map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        version: row.try_get("version")?,
        history,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Shared with page creation, which opens the first customization in its
/// own transaction
pub(super) async fn insert_customization(
    conn: &mut PgConnection,
    customization: &Customization,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO customizations (id, page_id, template_id, changes, status, version,
                                    history, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(customization.id)
    .bind(customization.page_id)
    .bind(customization.template_id)
    .bind(Json(&customization.changes))
    .bind(customization.status.as_str())
    .bind(customization.version)
    .bind(Json(&customization.history))
    .bind(customization.created_at)
    .bind(customization.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl CustomizationStore for CustomizationRepository {
    async fn find(&self, id: Uuid) -> DatabaseResult<Option<Customization>> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMIZATION_COLUMNS} FROM customizations c WHERE c.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(customization_from_row).transpose()?)
    }

    async fn find_active(&self, page_id: Uuid) -> DatabaseResult<Option<Customization>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {CUSTOMIZATION_COLUMNS}
            FROM customizations c
            WHERE c.page_id = $1 AND c.status = 'active'
            "#
        ))
        .bind(page_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(customization_from_row).transpose()?)
    }

    async fn list(
        &self,
        owner_id: Option<Uuid>,
        status: Option<CustomizationStatus>,
    ) -> DatabaseResult<Vec<Customization>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {CUSTOMIZATION_COLUMNS}
            FROM customizations c
            JOIN pages p ON p.id = c.page_id
            WHERE ($1::UUID IS NULL OR p.owner_id = $1)
              AND ($2::TEXT IS NULL OR c.status = $2)
            ORDER BY c.updated_at DESC
            "#
        ))
        .bind(owner_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(customization_from_row)
            .collect::<Result<_, _>>()?)
    }

    async fn insert(&self, customization: &Customization) -> DatabaseResult<()> {
        let mut conn = self.pool.acquire().await.map_err(DatabaseError::Connection)?;
        insert_customization(&mut *conn, customization).await?;
        Ok(())
    }

    async fn update(&self, customization: &Customization) -> DatabaseResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE customizations
            SET changes = $2, status = $3, version = $4, history = $5, updated_at = $6
            WHERE id = $1 AND version = $4 - 1
            "#,
        )
        .bind(customization.id)
        .bind(Json(&customization.changes))
        .bind(customization.status.as_str())
        .bind(customization.version)
        .bind(Json(&customization.history))
        .bind(customization.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
