//! Owner resolution for page-scoped resources
//!
//! Sections and customizations carry no owner of their own; they are
//! authorized against the page they belong to. A missing resource and one
//! the caller may not see produce the same `NotFound`.

use common::{Action, Denial, Principal, ResourceKind, authorize};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{Page, Section},
    repositories::PageStore,
};

/// Load a page and check `action` on a resource of `kind` hanging off it
pub async fn resolve_page(
    pages: &dyn PageStore,
    caller: Option<&Principal>,
    kind: ResourceKind,
    action: Action,
    page_id: Uuid,
) -> ApiResult<Page> {
    let page = pages
        .find_page(page_id)
        .await?
        .ok_or_else(|| ApiError::denied(Denial::NotFound, kind))?;
    authorize(caller, kind, action, Some(&page.ownership()))
        .map_err(|d| ApiError::denied(d, kind))?;
    Ok(page)
}

/// Load a section with its page, authorized through the page's owner
pub async fn resolve_section(
    pages: &dyn PageStore,
    caller: &Principal,
    action: Action,
    section_id: Uuid,
) -> ApiResult<(Section, Page)> {
    let section = pages
        .find_section(section_id)
        .await?
        .ok_or(ApiError::NotFound("Section"))?;
    let page = resolve_page(
        pages,
        Some(caller),
        ResourceKind::Section,
        action,
        section.page_id,
    )
    .await?;
    Ok((section, page))
}
