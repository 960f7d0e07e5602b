//! API models for stored records and request/response payloads

pub mod customization;
pub mod page;
pub mod section;
pub mod template;

pub use customization::{
    Customization, CustomizationStatus, FieldChange, RestoreRequest, VersionEntry,
};
pub use page::{CreatePageRequest, Page, PageStatus, PageWithSections, UpdatePageRequest};
pub use section::{FieldMap, Section, SectionInput, UpdateSectionRequest};
pub use template::{CreateTemplateRequest, Template, TemplateSection, UpdateTemplateRequest};

/// Raised when a stored enum column holds an unexpected value
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
