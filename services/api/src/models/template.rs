//! Templates: named, categorized blueprints of sections

use chrono::{DateTime, Utc};
use common::Ownership;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{FieldMap, SectionInput};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSection {
    #[serde(rename = "type")]
    pub section_type: String,
    pub name: String,
    pub order: i32,
    #[serde(default)]
    pub fields: FieldMap,
    #[serde(default)]
    pub style: Option<Value>,
}

impl TemplateSection {
    /// The blueprint as input for a page section
    pub fn to_input(&self) -> SectionInput {
        SectionInput {
            id: None,
            section_type: self.section_type.clone(),
            name: Some(self.name.clone()),
            order: Some(self.order),
            fields: Some(self.fields.clone()),
            style: self.style.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub description: String,
    pub thumbnail: Option<String>,
    pub is_public: bool,
    /// `None` for system templates
    pub owner_id: Option<Uuid>,
    pub sections: Vec<TemplateSection>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    pub fn ownership(&self) -> Ownership {
        Ownership {
            owner_id: self.owner_id,
            is_public: self.is_public,
        }
    }

    pub fn in_category(&self, category: Option<&str>) -> bool {
        category.is_none_or(|c| self.category.eq_ignore_ascii_case(c))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub thumbnail: Option<String>,
    pub is_public: Option<bool>,
    #[serde(default)]
    pub sections: Vec<TemplateSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplateRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub is_public: Option<bool>,
    pub sections: Option<Vec<TemplateSection>>,
}
