//! Template repository for database operations

use async_trait::async_trait;
use common::error::DatabaseResult;
use sqlx::{PgPool, Row, postgres::PgRow, types::Json};
use tracing::info;
use uuid::Uuid;

use super::{TemplateFilter, TemplateStore, TemplateVisibility};
use crate::models::{Template, TemplateSection};

const TEMPLATE_COLUMNS: &str = "id, name, category, description, thumbnail, is_public, \
                                owner_id, sections, created_at, updated_at";

/// Template repository
#[derive(Clone)]
pub struct TemplateRepository {
    pool: PgPool,
}

impl TemplateRepository {
    /// Create a new template repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn template_from_row(row: &PgRow) -> Result<Template, sqlx::Error> {
    let Json(sections): Json<Vec<TemplateSection>> = row.try_get("sections")?;
    Ok(Template {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        description: row.try_get("description")?,
        thumbnail: row.try_get("thumbnail")?,
        is_public: row.try_get("is_public")?,
        owner_id: row.try_get("owner_id")?,
        sections,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl TemplateStore for TemplateRepository {
    async fn list(&self, filter: &TemplateFilter) -> DatabaseResult<Vec<Template>> {
        let (all, owner) = match filter.visibility {
            TemplateVisibility::All => (true, None),
            TemplateVisibility::Public => (false, None),
            TemplateVisibility::PublicOrOwnedBy(owner) => (false, Some(owner)),
        };

        let rows = sqlx::query(&format!(
            r#"
            SELECT {TEMPLATE_COLUMNS}
            FROM templates
            WHERE ($1::TEXT IS NULL OR lower(category) = lower($1))
              AND ($2 OR is_public OR owner_id = $3)
            ORDER BY created_at, name
            "#
        ))
        .bind(filter.category.as_deref())
        .bind(all)
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(template_from_row).collect::<Result<_, _>>()?)
    }

    async fn find(&self, id: Uuid) -> DatabaseResult<Option<Template>> {
        let row = sqlx::query(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(template_from_row).transpose()?)
    }

    async fn insert(&self, template: &Template) -> DatabaseResult<()> {
        info!("Creating template {} ({})", template.name, template.id);
        sqlx::query(
            r#"
            INSERT INTO templates (id, name, category, description, thumbnail, is_public,
                                   owner_id, sections, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(template.id)
        .bind(&template.name)
        .bind(&template.category)
        .bind(&template.description)
        .bind(&template.thumbnail)
        .bind(template.is_public)
        .bind(template.owner_id)
        .bind(Json(&template.sections))
        .bind(template.created_at)
        .bind(template.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, template: &Template) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            UPDATE templates
            SET name = $2, category = $3, description = $4, thumbnail = $5,
                is_public = $6, sections = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(template.id)
        .bind(&template.name)
        .bind(&template.category)
        .bind(&template.description)
        .bind(&template.thumbnail)
        .bind(template.is_public)
        .bind(Json(&template.sections))
        .bind(template.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM templates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
