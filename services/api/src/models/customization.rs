//! Field-level customization record and its version history
//!
//! A customization tracks, per page, which section fields differ from the
//! values they had when first edited. Every mutation bumps `version` and
//! appends a [`VersionEntry`] carrying a full snapshot of `changes`, so any
//! earlier state can be restored by appending it again as a new version.

use std::{collections::BTreeSet, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{FieldMap, UnknownVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomizationStatus {
    Active,
    Archived,
}

impl CustomizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomizationStatus::Active => "active",
            CustomizationStatus::Archived => "archived",
        }
    }
}

impl FromStr for CustomizationStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CustomizationStatus::Active),
            "archived" => Ok(CustomizationStatus::Archived),
            other => Err(UnknownVariant {
                kind: "customization status",
                value: other.to_string(),
            }),
        }
    }
}

/// A present key, even one holding JSON `null`, is `Some`
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// One field that differs from its value before the first recorded edit.
///
/// `None` means the key was absent, which is distinct from a key holding
/// `null`; absent values are left out of the serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub section_id: Uuid,
    pub field_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub original_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub current_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub version: i32,
    pub timestamp: DateTime<Utc>,
    pub changes: Vec<String>,
    pub snapshot: Option<Vec<FieldChange>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customization {
    pub id: Uuid,
    pub page_id: Uuid,
    pub template_id: Option<Uuid>,
    pub changes: Vec<FieldChange>,
    pub status: CustomizationStatus,
    pub version: i32,
    pub history: Vec<VersionEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreRequest {
    pub version: i32,
}

impl Customization {
    /// A fresh active record at version 1 with no changes
    pub fn open(page_id: Uuid, template_id: Option<Uuid>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            page_id,
            template_id,
            changes: Vec::new(),
            status: CustomizationStatus::Active,
            version: 1,
            history: vec![VersionEntry {
                version: 1,
                timestamp: now,
                changes: vec!["Customization started".to_string()],
                snapshot: Some(Vec::new()),
            }],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_archived(&self) -> bool {
        self.status == CustomizationStatus::Archived
    }

    /// Bump the version and append a history entry for the current state
    pub fn commit(&mut self, descriptions: Vec<String>, now: DateTime<Utc>) {
        self.version += 1;
        self.history.push(VersionEntry {
            version: self.version,
            timestamp: now,
            changes: descriptions,
            snapshot: Some(self.changes.clone()),
        });
        self.updated_at = now;
    }

    pub fn snapshot_at(&self, version: i32) -> Option<&Vec<FieldChange>> {
        self.history
            .iter()
            .find(|entry| entry.version == version)
            .and_then(|entry| entry.snapshot.as_ref())
    }

    /// Fold one section's field edit into `changes`.
    ///
    /// The original value of a field is the one seen on its first recorded
    /// edit; a field edited back to that value drops out. Returns a
    /// description per field that actually changed.
    pub fn record_fields(
        &mut self,
        section_id: Uuid,
        section_name: &str,
        before: &FieldMap,
        after: &FieldMap,
    ) -> Vec<String> {
        let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
        let mut descriptions = Vec::new();

        for key in keys {
            let old = before.get(key).cloned();
            let new = after.get(key).cloned();
            if old == new {
                continue;
            }

            let existing = self
                .changes
                .iter()
                .position(|c| c.section_id == section_id && &c.field_id == key);
            match existing {
                Some(index) if self.changes[index].original_value == new => {
                    self.changes.remove(index);
                }
                Some(index) => self.changes[index].current_value = new,
                None => self.changes.push(FieldChange {
                    section_id,
                    field_id: key.clone(),
                    original_value: old,
                    current_value: new,
                }),
            }
            descriptions.push(format!("Updated {key} in {section_name}"));
        }

        descriptions
    }

    /// Drop changes for sections not in `keep`; returns how many were dropped
    pub fn retain_sections(&mut self, keep: &BTreeSet<Uuid>) -> usize {
        let before = self.changes.len();
        self.changes.retain(|c| keep.contains(&c.section_id));
        before - self.changes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn first_edit_keeps_original_value() {
        let mut c = Customization::open(Uuid::new_v4(), None, Utc::now());
        let section = Uuid::new_v4();

        let d = c.record_fields(
            section,
            "Hero",
            &fields(json!({"title": "Hello"})),
            &fields(json!({"title": "Hi"})),
        );
        assert_eq!(d, ["Updated title in Hero"]);
        c.record_fields(
            section,
            "Hero",
            &fields(json!({"title": "Hi"})),
            &fields(json!({"title": "Hey"})),
        );

        assert_eq!(c.changes.len(), 1);
        assert_eq!(c.changes[0].original_value, Some(json!("Hello")));
        assert_eq!(c.changes[0].current_value, Some(json!("Hey")));
    }

    #[test]
    fn reverting_a_field_drops_the_change() {
        let mut c = Customization::open(Uuid::new_v4(), None, Utc::now());
        let section = Uuid::new_v4();
        c.record_fields(
            section,
            "Hero",
            &fields(json!({"title": "Hello"})),
            &fields(json!({"title": "Hi"})),
        );
        c.record_fields(
            section,
            "Hero",
            &fields(json!({"title": "Hi"})),
            &fields(json!({"title": "Hello"})),
        );
        assert!(c.changes.is_empty());
    }

    #[test]
    fn added_and_removed_fields_have_no_value() {
        let mut c = Customization::open(Uuid::new_v4(), None, Utc::now());
        let section = Uuid::new_v4();
        c.record_fields(
            section,
            "Hero",
            &fields(json!({"title": "Hello"})),
            &fields(json!({"subtitle": "New"})),
        );
        let title = c.changes.iter().find(|ch| ch.field_id == "title").unwrap();
        assert_eq!(title.current_value, None);
        let subtitle = c.changes.iter().find(|ch| ch.field_id == "subtitle").unwrap();
        assert_eq!(subtitle.original_value, None);
    }

    #[test]
    fn explicit_null_is_not_an_absent_field() {
        let mut c = Customization::open(Uuid::new_v4(), None, Utc::now());
        let section = Uuid::new_v4();
        c.record_fields(
            section,
            "Hero",
            &fields(json!({"image": null})),
            &fields(json!({})),
        );
        assert_eq!(c.changes.len(), 1);
        assert_eq!(c.changes[0].original_value, Some(Value::Null));
        assert_eq!(c.changes[0].current_value, None);

        // Both states survive the JSON column round trip
        let stored = serde_json::to_value(&c.changes).unwrap();
        assert_eq!(stored[0]["originalValue"], Value::Null);
        assert!(stored[0].get("currentValue").is_none());
        let loaded: Vec<FieldChange> = serde_json::from_value(stored).unwrap();
        assert_eq!(loaded, c.changes);
    }

    #[test]
    fn unchanged_fields_produce_nothing() {
        let mut c = Customization::open(Uuid::new_v4(), None, Utc::now());
        let same = fields(json!({"title": "Hello", "style": {"bold": true}}));
        assert!(c.record_fields(Uuid::new_v4(), "Hero", &same, &same).is_empty());
    }

    #[test]
    fn commit_appends_snapshot_and_bumps_version() {
        let mut c = Customization::open(Uuid::new_v4(), None, Utc::now());
        let section = Uuid::new_v4();
        let descriptions = c.record_fields(
            section,
            "Hero",
            &fields(json!({"title": "a"})),
            &fields(json!({"title": "b"})),
        );
        c.commit(descriptions, Utc::now());

        assert_eq!(c.version, 2);
        assert_eq!(c.history.len(), 2);
        assert_eq!(c.snapshot_at(2), Some(&c.changes));
        assert_eq!(c.snapshot_at(1), Some(&Vec::new()));
        assert!(c.snapshot_at(3).is_none());
    }

    #[test]
    fn retain_sections_drops_removed() {
        let mut c = Customization::open(Uuid::new_v4(), None, Utc::now());
        let kept = Uuid::new_v4();
        let gone = Uuid::new_v4();
        for id in [kept, gone] {
            c.record_fields(
                id,
                "S",
                &fields(json!({"x": 1})),
                &fields(json!({"x": 2})),
            );
        }
        let dropped = c.retain_sections(&BTreeSet::from([kept]));
        assert_eq!(dropped, 1);
        assert_eq!(c.changes.len(), 1);
        assert_eq!(c.changes[0].section_id, kept);
    }
}
