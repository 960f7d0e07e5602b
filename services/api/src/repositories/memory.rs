//! In-memory store used by service tests

use std::sync::{
    Mutex, MutexGuard,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use common::error::{DatabaseError, DatabaseResult};
use uuid::Uuid;

use super::{
    CustomizationStore, PageStore, TemplateFilter, TemplateStore, TemplateVisibility,
};
use crate::models::{Customization, CustomizationStatus, Page, Section, Template};

#[derive(Default)]
struct State {
    templates: Vec<Template>,
    pages: Vec<Page>,
    sections: Vec<Section>,
    customizations: Vec<Customization>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    /// Template reads fail as if the database were unreachable
    pub templates_unavailable: AtomicBool,
    /// Bulk section replacement fails after deleting the old sections
    pub fail_replace: AtomicBool,
    /// Page creation fails and nothing of it is kept
    pub fail_insert_page: AtomicBool,
    /// The next customization write loses to one committed just before it
    pub lose_next_update: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("memory store poisoned")
    }

    fn templates_down(&self) -> DatabaseResult<()> {
        if self.templates_unavailable.load(Ordering::SeqCst) {
            return Err(DatabaseError::Configuration("templates unavailable".into()));
        }
        Ok(())
    }
}

fn slug_taken(pages: &[Page], page: &Page) -> bool {
    pages
        .iter()
        .any(|p| p.id != page.id && p.owner_id == page.owner_id && p.slug == page.slug)
}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn list(&self, filter: &TemplateFilter) -> DatabaseResult<Vec<Template>> {
        self.templates_down()?;
        Ok(self
            .lock()
            .templates
            .iter()
            .filter(|t| t.in_category(filter.category.as_deref()))
            .filter(|t| match filter.visibility {
                TemplateVisibility::All => true,
                TemplateVisibility::Public => t.is_public,
                TemplateVisibility::PublicOrOwnedBy(owner) => {
                    t.is_public || t.owner_id == Some(owner)
                }
            })
            .cloned()
            .collect())
    }

    async fn find(&self, id: Uuid) -> DatabaseResult<Option<Template>> {
        self.templates_down()?;
        Ok(self.lock().templates.iter().find(|t| t.id == id).cloned())
    }

    async fn insert(&self, template: &Template) -> DatabaseResult<()> {
        self.lock().templates.push(template.clone());
        Ok(())
    }

    async fn update(&self, template: &Template) -> DatabaseResult<()> {
        let mut state = self.lock();
        if let Some(existing) = state.templates.iter_mut().find(|t| t.id == template.id) {
            *existing = template.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<bool> {
        let mut state = self.lock();
        let before = state.templates.len();
        state.templates.retain(|t| t.id != id);
        Ok(state.templates.len() != before)
    }
}

#[async_trait]
impl PageStore for MemoryStore {
    async fn list_pages(&self, owner_id: Option<Uuid>) -> DatabaseResult<Vec<Page>> {
        let mut pages: Vec<Page> = self
            .lock()
            .pages
            .iter()
            .filter(|p| owner_id.is_none_or(|o| p.owner_id == o))
            .cloned()
            .collect();
        pages.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(pages)
    }

    async fn find_page(&self, id: Uuid) -> DatabaseResult<Option<Page>> {
        Ok(self.lock().pages.iter().find(|p| p.id == id).cloned())
    }

    async fn slug_exists(
        &self,
        owner_id: Uuid,
        slug: &str,
        excluding: Option<Uuid>,
    ) -> DatabaseResult<bool> {
        Ok(self
            .lock()
            .pages
            .iter()
            .any(|p| p.owner_id == owner_id && p.slug == slug && Some(p.id) != excluding))
    }

    async fn insert_page(
        &self,
        page: &Page,
        sections: &[Section],
        customization: &Customization,
    ) -> DatabaseResult<()> {
        let mut state = self.lock();
        if slug_taken(&state.pages, page) {
            return Err(DatabaseError::UniqueViolation("pages_owner_slug_key".into()));
        }
        if self.fail_insert_page.load(Ordering::SeqCst) {
            return Err(DatabaseError::Configuration("insert interrupted".into()));
        }
        state.pages.push(page.clone());
        state.sections.extend(sections.iter().cloned());
        state.customizations.push(customization.clone());
        Ok(())
    }

    async fn update_page(&self, page: &Page) -> DatabaseResult<()> {
        let mut state = self.lock();
        if slug_taken(&state.pages, page) {
            return Err(DatabaseError::UniqueViolation("pages_owner_slug_key".into()));
        }
        if let Some(existing) = state.pages.iter_mut().find(|p| p.id == page.id) {
            *existing = page.clone();
        }
        Ok(())
    }

    async fn delete_page(&self, id: Uuid) -> DatabaseResult<bool> {
        let mut state = self.lock();
        let before = state.pages.len();
        state.pages.retain(|p| p.id != id);
        state.sections.retain(|s| s.page_id != id);
        state.customizations.retain(|c| c.page_id != id);
        Ok(state.pages.len() != before)
    }

    async fn list_sections(&self, page_id: Uuid) -> DatabaseResult<Vec<Section>> {
        let mut sections: Vec<Section> = self
            .lock()
            .sections
            .iter()
            .filter(|s| s.page_id == page_id)
            .cloned()
            .collect();
        crate::models::section::sort_for_render(&mut sections);
        Ok(sections)
    }

    async fn find_section(&self, id: Uuid) -> DatabaseResult<Option<Section>> {
        Ok(self.lock().sections.iter().find(|s| s.id == id).cloned())
    }

    async fn insert_section(&self, section: &Section) -> DatabaseResult<()> {
        self.lock().sections.push(section.clone());
        Ok(())
    }

    async fn update_sections(&self, sections: &[Section]) -> DatabaseResult<()> {
        let mut state = self.lock();
        for section in sections {
            if let Some(existing) = state.sections.iter_mut().find(|s| s.id == section.id) {
                *existing = section.clone();
            }
        }
        Ok(())
    }

    async fn delete_section(&self, id: Uuid) -> DatabaseResult<bool> {
        let mut state = self.lock();
        let before = state.sections.len();
        state.sections.retain(|s| s.id != id);
        Ok(state.sections.len() != before)
    }

    async fn replace_sections(&self, page_id: Uuid, sections: &[Section]) -> DatabaseResult<()> {
        let mut state = self.lock();

        // Work on a copy so a failure leaves the committed sections untouched
        let mut staged: Vec<Section> = state
            .sections
            .iter()
            .filter(|s| s.page_id != page_id)
            .cloned()
            .collect();
        if self.fail_replace.load(Ordering::SeqCst) {
            return Err(DatabaseError::Configuration("replace interrupted".into()));
        }
        staged.extend(sections.iter().cloned());
        state.sections = staged;
        Ok(())
    }
}

#[async_trait]
impl CustomizationStore for MemoryStore {
    async fn find(&self, id: Uuid) -> DatabaseResult<Option<Customization>> {
        Ok(self
            .lock()
            .customizations
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn find_active(&self, page_id: Uuid) -> DatabaseResult<Option<Customization>> {
        Ok(self
            .lock()
            .customizations
            .iter()
            .find(|c| c.page_id == page_id && c.status == CustomizationStatus::Active)
            .cloned())
    }

    async fn list(
        &self,
        owner_id: Option<Uuid>,
        status: Option<CustomizationStatus>,
    ) -> DatabaseResult<Vec<Customization>> {
        let state = self.lock();
        Ok(state
            .customizations
            .iter()
            .filter(|c| status.is_none_or(|s| c.status == s))
            .filter(|c| {
                owner_id.is_none_or(|owner| {
                    state
                        .pages
                        .iter()
                        .any(|p| p.id == c.page_id && p.owner_id == owner)
                })
            })
            .cloned()
            .collect())
    }

    async fn insert(&self, customization: &Customization) -> DatabaseResult<()> {
        let mut state = self.lock();
        let active_exists = state.customizations.iter().any(|c| {
            c.page_id == customization.page_id && c.status == CustomizationStatus::Active
        });
        if active_exists && customization.status == CustomizationStatus::Active {
            return Err(DatabaseError::UniqueViolation(
                "customizations_one_active_per_page".into(),
            ));
        }
        state.customizations.push(customization.clone());
        Ok(())
    }

    async fn update(&self, customization: &Customization) -> DatabaseResult<bool> {
        let mut state = self.lock();
        let Some(existing) = state
            .customizations
            .iter_mut()
            .find(|c| c.id == customization.id)
        else {
            return Ok(false);
        };

        if self.lose_next_update.swap(false, Ordering::SeqCst) {
            existing.commit(vec!["Concurrent edit".to_string()], Utc::now());
        }
        if existing.version != customization.version - 1 {
            return Ok(false);
        }
        *existing = customization.clone();
        Ok(true)
    }
}
