//! Page lifecycle and section mutation
//!
//! Every write re-fetches the page, checks the caller against its owner and
//! then writes. Pages and sections the caller may not touch look missing.

use std::{collections::HashSet, sync::Arc};

use chrono::Utc;
use common::{Action, Principal, ResourceKind, authorize, error::DatabaseError};
use tracing::info;
use uuid::Uuid;

use crate::{
    customizations::CustomizationService,
    error::{ApiError, ApiResult},
    models::{
        CreatePageRequest, Customization, Page, PageStatus, PageWithSections, Section, SectionInput,
        TemplateSection, UpdatePageRequest, UpdateSectionRequest, section::sort_for_render,
    },
    ownership::{resolve_page, resolve_section},
    repositories::PageStore,
    templates::TemplateService,
    validation::{validate_name, validate_section_type, validate_slug},
};

#[derive(Clone)]
pub struct PageService {
    pages: Arc<dyn PageStore>,
    templates: TemplateService,
    customizations: CustomizationService,
}

fn slug_conflict(err: DatabaseError) -> ApiError {
    match err {
        DatabaseError::UniqueViolation(_) => ApiError::DuplicateSlug,
        other => other.into(),
    }
}

fn validate_inputs(inputs: &[SectionInput]) -> ApiResult<()> {
    for input in inputs {
        validate_section_type(&input.section_type)
            .map_err(|m| ApiError::validation("sections", m))?;
    }
    Ok(())
}

/// Build page sections from inputs, defaulting each order to its position
fn build_sections(page_id: Uuid, inputs: Vec<SectionInput>) -> Vec<Section> {
    inputs
        .into_iter()
        .enumerate()
        .map(|(index, input)| {
            let order = input.order.unwrap_or(index as i32);
            Section::new(page_id, input, order)
        })
        .collect()
}

impl PageService {
    pub fn new(
        pages: Arc<dyn PageStore>,
        templates: TemplateService,
        customizations: CustomizationService,
    ) -> Self {
        Self {
            pages,
            templates,
            customizations,
        }
    }

    async fn page(&self, caller: Option<&Principal>, action: Action, id: Uuid) -> ApiResult<Page> {
        resolve_page(self.pages.as_ref(), caller, ResourceKind::Page, action, id).await
    }

    async fn with_sections(&self, page: Page) -> ApiResult<PageWithSections> {
        let sections = self.pages.list_sections(page.id).await?;
        Ok(PageWithSections { page, sections })
    }

    /// The caller's pages; every page for SUPER_ADMIN
    pub async fn list(&self, caller: &Principal) -> ApiResult<Vec<Page>> {
        let owner = (!caller.is_super_admin()).then_some(caller.id);
        Ok(self.pages.list_pages(owner).await?)
    }

    pub async fn get(&self, caller: Option<&Principal>, id: Uuid) -> ApiResult<PageWithSections> {
        let page = self.page(caller, Action::Read, id).await?;
        self.with_sections(page).await
    }

    /// Hosted view of a page; only published pages are visible
    pub async fn get_published(&self, id: Uuid) -> ApiResult<PageWithSections> {
        let page = self
            .pages
            .find_page(id)
            .await?
            .filter(|p| p.status == PageStatus::Published)
            .ok_or(ApiError::NotFound("Page"))?;
        self.with_sections(page).await
    }

    pub async fn create(
        &self,
        caller: &Principal,
        request: CreatePageRequest,
    ) -> ApiResult<PageWithSections> {
        authorize(Some(caller), ResourceKind::Page, Action::Create, None)
            .map_err(|d| ApiError::denied(d, ResourceKind::Page))?;
        validate_name(&request.name).map_err(|m| ApiError::validation("name", m))?;
        validate_slug(&request.slug).map_err(|m| ApiError::validation("slug", m))?;

        if self
            .pages
            .slug_exists(caller.id, &request.slug, None)
            .await?
        {
            return Err(ApiError::DuplicateSlug);
        }

        let blueprint = match request.template_id {
            Some(template_id) => Some(self.templates.sections(Some(caller), template_id).await?),
            None => None,
        };
        let inputs = match (request.sections, blueprint) {
            (Some(inputs), _) => inputs,
            (None, Some(blueprint)) => blueprint.iter().map(TemplateSection::to_input).collect(),
            (None, None) => Vec::new(),
        };
        validate_inputs(&inputs)?;

        let mut page = Page::new(
            caller.id,
            request.name.trim().to_string(),
            request.slug,
            request.template_id,
        );
        page.seo_title = request.seo_title;
        page.seo_description = request.seo_description;
        page.seo_keywords = request.seo_keywords;

        let mut sections = build_sections(page.id, inputs);
        let customization = Customization::open(page.id, page.template_id, page.created_at);
        self.pages
            .insert_page(&page, &sections, &customization)
            .await
            .map_err(slug_conflict)?;

        info!("Page {} ({}) created by {}", page.id, page.slug, caller.id);
        sort_for_render(&mut sections);
        Ok(PageWithSections { page, sections })
    }

    /// Generic update; a status change keeps the publication fields in step
    pub async fn update(
        &self,
        caller: &Principal,
        id: Uuid,
        request: UpdatePageRequest,
    ) -> ApiResult<Page> {
        let mut page = self.page(Some(caller), Action::Update, id).await?;
        let now = Utc::now();

        if let Some(name) = request.name {
            validate_name(&name).map_err(|m| ApiError::validation("name", m))?;
            page.name = name.trim().to_string();
        }
        if let Some(slug) = request.slug {
            validate_slug(&slug).map_err(|m| ApiError::validation("slug", m))?;
            if slug != page.slug && self.pages.slug_exists(page.owner_id, &slug, Some(id)).await? {
                return Err(ApiError::DuplicateSlug);
            }
            page.slug = slug;
        }
        if let Some(status) = request.status {
            page.set_status(status, now);
        }
        if request.seo_title.is_some() {
            page.seo_title = request.seo_title;
        }
        if request.seo_description.is_some() {
            page.seo_description = request.seo_description;
        }
        if request.seo_keywords.is_some() {
            page.seo_keywords = request.seo_keywords;
        }
        page.updated_at = now;

        self.pages.update_page(&page).await.map_err(slug_conflict)?;
        Ok(page)
    }

    pub async fn publish(&self, caller: &Principal, id: Uuid) -> ApiResult<Page> {
        let mut page = self.page(Some(caller), Action::Publish, id).await?;
        page.publish(Utc::now());
        self.pages.update_page(&page).await?;

        info!("Page {} published", page.id);
        Ok(page)
    }

    pub async fn unpublish(&self, caller: &Principal, id: Uuid) -> ApiResult<Page> {
        let mut page = self.page(Some(caller), Action::Publish, id).await?;
        page.unpublish(Utc::now());
        self.pages.update_page(&page).await?;

        info!("Page {} unpublished", page.id);
        Ok(page)
    }

    /// Owner or SUPER_ADMIN; sections and customizations go with the page
    pub async fn delete(&self, caller: &Principal, id: Uuid) -> ApiResult<()> {
        let page = self.page(Some(caller), Action::Delete, id).await?;
        self.pages.delete_page(page.id).await?;

        info!("Page {} deleted by {}", page.id, caller.id);
        Ok(())
    }

    pub async fn list_sections(&self, caller: &Principal, page_id: Uuid) -> ApiResult<Vec<Section>> {
        resolve_page(
            self.pages.as_ref(),
            Some(caller),
            ResourceKind::Section,
            Action::Read,
            page_id,
        )
        .await?;
        Ok(self.pages.list_sections(page_id).await?)
    }

    /// Append a section; without an explicit order it goes after the last one
    pub async fn add_section(
        &self,
        caller: &Principal,
        page_id: Uuid,
        input: SectionInput,
    ) -> ApiResult<Section> {
        let page = resolve_page(
            self.pages.as_ref(),
            Some(caller),
            ResourceKind::Section,
            Action::Create,
            page_id,
        )
        .await?;
        validate_section_type(&input.section_type)
            .map_err(|m| ApiError::validation("type", m))?;

        let order = match input.order {
            Some(order) => order,
            None => match self.pages.list_sections(page.id).await?.iter().map(|s| s.order).max() {
                Some(max) => max.checked_add(1).ok_or_else(|| {
                    ApiError::validation("order", "No order left after the last section")
                })?,
                None => 0,
            },
        };

        let section = Section::new(page.id, input, order);
        self.pages.insert_section(&section).await?;
        Ok(section)
    }

    pub async fn update_section(
        &self,
        caller: &Principal,
        section_id: Uuid,
        request: UpdateSectionRequest,
    ) -> ApiResult<Section> {
        let (before, page) =
            resolve_section(self.pages.as_ref(), caller, Action::Update, section_id).await?;

        let mut after = before.clone();
        if let Some(section_type) = request.section_type {
            validate_section_type(&section_type).map_err(|m| ApiError::validation("type", m))?;
            after.section_type = section_type;
        }
        if let Some(name) = request.name {
            validate_name(&name).map_err(|m| ApiError::validation("name", m))?;
            after.name = name.trim().to_string();
        }
        if let Some(order) = request.order {
            after.order = order;
        }
        if let Some(fields) = request.fields {
            after.fields = fields;
        }
        if request.style.is_some() {
            after.style = request.style;
        }
        after.updated_at = Utc::now();

        self.pages.update_sections(std::slice::from_ref(&after)).await?;
        self.customizations
            .record_section_edit(&page, &before, &after)
            .await?;
        Ok(after)
    }

    pub async fn delete_section(&self, caller: &Principal, section_id: Uuid) -> ApiResult<()> {
        let (section, page) =
            resolve_section(self.pages.as_ref(), caller, Action::Delete, section_id).await?;
        self.pages.delete_section(section.id).await?;
        self.customizations
            .record_section_removed(&page, &section)
            .await
    }

    /// Replace all sections of a page with `inputs`, atomically. Inputs
    /// naming an existing section of this page keep its id.
    pub async fn save_sections(
        &self,
        caller: &Principal,
        page_id: Uuid,
        inputs: Vec<SectionInput>,
    ) -> ApiResult<Vec<Section>> {
        let page = resolve_page(
            self.pages.as_ref(),
            Some(caller),
            ResourceKind::Section,
            Action::Update,
            page_id,
        )
        .await?;
        validate_inputs(&inputs)?;

        let existing = self.pages.list_sections(page.id).await?;
        let mut claimed = HashSet::new();
        let mut sections = Vec::with_capacity(inputs.len());

        for (index, mut input) in inputs.into_iter().enumerate() {
            let previous = input
                .id
                .take()
                .and_then(|id| existing.iter().find(|s| s.id == id))
                .filter(|s| claimed.insert(s.id));
            let order = input.order.unwrap_or(index as i32);

            let mut section = Section::new(page.id, input, order);
            if let Some(previous) = previous {
                section.id = previous.id;
                section.created_at = previous.created_at;
            }
            sections.push(section);
        }

        self.pages.replace_sections(page.id, &sections).await?;
        self.customizations
            .record_replace(&page, &existing, &sections)
            .await?;

        sort_for_render(&mut sections);
        Ok(sections)
    }
}
