//! Persistence for templates, pages, sections and customizations
//!
//! Services depend on these traits. The PostgreSQL repositories implement
//! them for production; tests use the in-memory store.

use async_trait::async_trait;
use common::error::DatabaseResult;
use uuid::Uuid;

use crate::models::{Customization, CustomizationStatus, Page, Section, Template};

pub mod customization;
#[cfg(test)]
pub mod memory;
pub mod page;
pub mod template;

pub use customization::CustomizationRepository;
pub use page::PageRepository;
pub use template::TemplateRepository;

/// Which templates a listing may include
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateVisibility {
    All,
    Public,
    /// Public templates plus those owned by the given user
    PublicOrOwnedBy(Uuid),
}

#[derive(Debug, Clone)]
pub struct TemplateFilter {
    pub category: Option<String>,
    pub visibility: TemplateVisibility,
}

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn list(&self, filter: &TemplateFilter) -> DatabaseResult<Vec<Template>>;
    async fn find(&self, id: Uuid) -> DatabaseResult<Option<Template>>;
    async fn insert(&self, template: &Template) -> DatabaseResult<()>;
    async fn update(&self, template: &Template) -> DatabaseResult<()>;
    async fn delete(&self, id: Uuid) -> DatabaseResult<bool>;
}

#[async_trait]
pub trait PageStore: Send + Sync {
    /// Pages newest first; `None` lists every owner's pages
    async fn list_pages(&self, owner_id: Option<Uuid>) -> DatabaseResult<Vec<Page>>;
    async fn find_page(&self, id: Uuid) -> DatabaseResult<Option<Page>>;
    async fn slug_exists(
        &self,
        owner_id: Uuid,
        slug: &str,
        excluding: Option<Uuid>,
    ) -> DatabaseResult<bool>;
    /// Insert a page together with its initial sections and its first
    /// customization, all or nothing
    async fn insert_page(
        &self,
        page: &Page,
        sections: &[Section],
        customization: &Customization,
    ) -> DatabaseResult<()>;
    async fn update_page(&self, page: &Page) -> DatabaseResult<()>;
    /// Delete a page and, by cascade, its sections and customizations
    async fn delete_page(&self, id: Uuid) -> DatabaseResult<bool>;

    /// Sections in render order
    async fn list_sections(&self, page_id: Uuid) -> DatabaseResult<Vec<Section>>;
    async fn find_section(&self, id: Uuid) -> DatabaseResult<Option<Section>>;
    async fn insert_section(&self, section: &Section) -> DatabaseResult<()>;
    async fn update_sections(&self, sections: &[Section]) -> DatabaseResult<()>;
    async fn delete_section(&self, id: Uuid) -> DatabaseResult<bool>;
    /// Replace every section of the page in one transaction
    async fn replace_sections(&self, page_id: Uuid, sections: &[Section]) -> DatabaseResult<()>;
}

#[async_trait]
pub trait CustomizationStore: Send + Sync {
    async fn find(&self, id: Uuid) -> DatabaseResult<Option<Customization>>;
    async fn find_active(&self, page_id: Uuid) -> DatabaseResult<Option<Customization>>;
    /// Customizations of pages owned by `owner_id` (all pages when `None`)
    async fn list(
        &self,
        owner_id: Option<Uuid>,
        status: Option<CustomizationStatus>,
    ) -> DatabaseResult<Vec<Customization>>;
    async fn insert(&self, customization: &Customization) -> DatabaseResult<()>;
    /// Write a customization whose version was bumped by exactly one.
    /// Returns `false`, writing nothing, when the stored record is no longer
    /// at the previous version.
    async fn update(&self, customization: &Customization) -> DatabaseResult<bool>;
}
