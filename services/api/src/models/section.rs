//! Ordered content blocks belonging to a page

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Open-ended field id to value map
pub type FieldMap = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: Uuid,
    pub page_id: Uuid,
    #[serde(rename = "type")]
    pub section_type: String,
    pub name: String,
    pub order: i32,
    pub fields: FieldMap,
    pub style: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Section {
    pub fn new(page_id: Uuid, input: SectionInput, order: i32) -> Self {
        let now = Utc::now();
        let name = input
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| input.section_type.clone());
        Self {
            id: Uuid::new_v4(),
            page_id,
            section_type: input.section_type,
            name,
            order,
            fields: input.fields.unwrap_or_default(),
            style: input.style,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Section content supplied when adding or bulk-saving sections
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionInput {
    /// Keeps the identity of an existing section of the same page on bulk save
    pub id: Option<Uuid>,
    #[serde(rename = "type")]
    pub section_type: String,
    pub name: Option<String>,
    pub order: Option<i32>,
    pub fields: Option<FieldMap>,
    pub style: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSectionRequest {
    #[serde(rename = "type")]
    pub section_type: Option<String>,
    pub name: Option<String>,
    pub order: Option<i32>,
    pub fields: Option<FieldMap>,
    pub style: Option<Value>,
}

/// Render order: ascending `order`, ties by position in `sections`
pub fn sort_for_render(sections: &mut [Section]) {
    sections.sort_by_key(|s| s.order);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn name_defaults_to_type() {
        let section = Section::new(
            Uuid::new_v4(),
            SectionInput {
                section_type: "hero".into(),
                ..Default::default()
            },
            0,
        );
        assert_eq!(section.name, "hero");
        assert!(section.fields.is_empty());
    }

    #[test]
    fn input_reads_type_key() {
        let input: SectionInput = serde_json::from_value(json!({
            "type": "pricing",
            "fields": { "title": "Plans" }
        }))
        .unwrap();
        assert_eq!(input.section_type, "pricing");
        assert_eq!(input.fields.unwrap()["title"], "Plans");
    }

    #[test]
    fn equal_orders_keep_insertion_sequence() {
        let page_id = Uuid::new_v4();
        let mk = |t: &str, order| {
            Section::new(
                page_id,
                SectionInput {
                    section_type: t.into(),
                    ..Default::default()
                },
                order,
            )
        };
        let mut sections = vec![mk("a", 2), mk("b", 1), mk("c", 1)];
        sort_for_render(&mut sections);
        let types: Vec<_> = sections.iter().map(|s| s.section_type.as_str()).collect();
        assert_eq!(types, ["b", "c", "a"]);
    }
}
