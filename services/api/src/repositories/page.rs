//! Page and section repository for database operations

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow, types::Json};
use tracing::info;
use uuid::Uuid;

use super::{PageStore, customization::insert_customization};
use crate::models::{Customization, FieldMap, Page, Section};

const PAGE_COLUMNS: &str = "id, name, slug, owner_id, template_id, status, is_published, \
                            published_at, seo_title, seo_description, seo_keywords, \
                            created_at, updated_at";

const SECTION_COLUMNS: &str =
    "id, page_id, section_type, name, sort_order, fields, style, created_at, updated_at";

/// Page repository; sections are stored alongside their page
#[derive(Clone)]
pub struct PageRepository {
    pool: PgPool,
}

impl PageRepository {
    /// Create a new page repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn page_from_row(row: &PgRow) -> Result<Page, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(Page {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        owner_id: row.try_get("owner_id")?,
        template_id: row.try_get("template_id")?,
        status: status.parse().map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        is_published: row.try_get("is_published")?,
        published_at: row.try_get("published_at")?,
        seo_title: row.try_get("seo_title")?,
        seo_description: row.try_get("seo_description")?,
        seo_keywords: row.try_get("seo_keywords")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn section_from_row(row: &PgRow) -> Result<Section, sqlx::Error> {
    let Json(fields): Json<FieldMap> = row.try_get("fields")?;
    let style: Option<Json<serde_json::Value>> = row.try_get("style")?;
    Ok(Section {
        id: row.try_get("id")?,
        page_id: row.try_get("page_id")?,
        section_type: row.try_get("section_type")?,
        name: row.try_get("name")?,
        order: row.try_get("sort_order")?,
        fields,
        style: style.map(|Json(v)| v),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn insert_section(conn: &mut PgConnection, section: &Section) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO sections (id, page_id, section_type, name, sort_order, fields, style,
                              created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(section.id)
    .bind(section.page_id)
    .bind(&section.section_type)
    .bind(&section.name)
    .bind(section.order)
    .bind(Json(&section.fields))
    .bind(section.style.as_ref().map(Json))
    .bind(section.created_at)
    .bind(section.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl PageStore for PageRepository {
    async fn list_pages(&self, owner_id: Option<Uuid>) -> DatabaseResult<Vec<Page>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PAGE_COLUMNS}
            FROM pages
            WHERE ($1::UUID IS NULL OR owner_id = $1)
            ORDER BY updated_at DESC
            "#
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(page_from_row).collect::<Result<_, _>>()?)
    }

    async fn find_page(&self, id: Uuid) -> DatabaseResult<Option<Page>> {
        let row = sqlx::query(&format!("SELECT {PAGE_COLUMNS} FROM pages WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(page_from_row).transpose()?)
    }

    async fn slug_exists(
        &self,
        owner_id: Uuid,
        slug: &str,
        excluding: Option<Uuid>,
    ) -> DatabaseResult<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM pages
                WHERE owner_id = $1 AND slug = $2 AND ($3::UUID IS NULL OR id <> $3)
            ) AS taken
            "#,
        )
        .bind(owner_id)
        .bind(slug)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("taken")?)
    }

    async fn insert_page(
        &self,
        page: &Page,
        sections: &[Section],
        customization: &Customization,
    ) -> DatabaseResult<()> {
        info!("Creating page {} for owner {}", page.slug, page.owner_id);
        let mut tx = self.pool.begin().await.map_err(DatabaseError::Connection)?;

        sqlx::query(
            r#"
            INSERT INTO pages (id, name, slug, owner_id, template_id, status, is_published,
                               published_at, seo_title, seo_description, seo_keywords,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(page.id)
        .bind(&page.name)
        .bind(&page.slug)
        .bind(page.owner_id)
        .bind(page.template_id)
        .bind(page.status.as_str())
        .bind(page.is_published)
        .bind(page.published_at)
        .bind(&page.seo_title)
        .bind(&page.seo_description)
        .bind(&page.seo_keywords)
        .bind(page.created_at)
        .bind(page.updated_at)
        .execute(&mut *tx)
        .await?;

        for section in sections {
            insert_section(&mut *tx, section).await?;
        }
        insert_customization(&mut *tx, customization).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn update_page(&self, page: &Page) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            UPDATE pages
            SET name = $2, slug = $3, status = $4, is_published = $5, published_at = $6,
                seo_title = $7, seo_description = $8, seo_keywords = $9, updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(page.id)
        .bind(&page.name)
        .bind(&page.slug)
        .bind(page.status.as_str())
        .bind(page.is_published)
        .bind(page.published_at)
        .bind(&page.seo_title)
        .bind(&page.seo_description)
        .bind(&page.seo_keywords)
        .bind(page.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_page(&self, id: Uuid) -> DatabaseResult<bool> {
        info!("Deleting page {}", id);
        let result = sqlx::query("DELETE FROM pages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_sections(&self, page_id: Uuid) -> DatabaseResult<Vec<Section>> {
        let rows = sqlx::query(&format!(
            "SELECT {SECTION_COLUMNS} FROM sections WHERE page_id = $1 ORDER BY sort_order, seq"
        ))
        .bind(page_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(section_from_row).collect::<Result<_, _>>()?)
    }

    async fn find_section(&self, id: Uuid) -> DatabaseResult<Option<Section>> {
        let row = sqlx::query(&format!(
            "SELECT {SECTION_COLUMNS} FROM sections WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(section_from_row).transpose()?)
    }

    async fn insert_section(&self, section: &Section) -> DatabaseResult<()> {
        let mut conn = self.pool.acquire().await.map_err(DatabaseError::Connection)?;
        insert_section(&mut *conn, section).await?;
        Ok(())
    }

    async fn update_sections(&self, sections: &[Section]) -> DatabaseResult<()> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::Connection)?;

        for section in sections {
            sqlx::query(
                r#"
                UPDATE sections
                SET section_type = $2, name = $3, sort_order = $4, fields = $5, style = $6,
                    updated_at = $7
                WHERE id = $1
                "#,
            )
            .bind(section.id)
            .bind(&section.section_type)
            .bind(&section.name)
            .bind(section.order)
            .bind(Json(&section.fields))
            .bind(section.style.as_ref().map(Json))
            .bind(section.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_section(&self, id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM sections WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn replace_sections(&self, page_id: Uuid, sections: &[Section]) -> DatabaseResult<()> {
        info!("Replacing sections of page {} ({} sections)", page_id, sections.len());
        let mut tx = self.pool.begin().await.map_err(DatabaseError::Connection)?;

        sqlx::query("DELETE FROM sections WHERE page_id = $1")
            .bind(page_id)
            .execute(&mut *tx)
            .await?;

        for section in sections {
            insert_section(&mut *tx, section).await?;
        }

        sqlx::query("UPDATE pages SET updated_at = NOW() WHERE id = $1")
            .bind(page_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
