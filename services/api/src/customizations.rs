//! Customization versioning
//!
//! Each page has at most one active customization. Section edits fold into
//! it as field-level changes; every mutation, restores included, appends a
//! new version. Archived customizations are read-only; the next edit to the
//! page opens a fresh one.

use std::{collections::BTreeSet, sync::Arc};

use chrono::Utc;
use common::{Action, Principal, ResourceKind, error::DatabaseError};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{
        Customization, CustomizationStatus, FieldChange, FieldMap, Page, Section, VersionEntry,
    },
    ownership::resolve_page,
    repositories::{CustomizationStore, PageStore},
};

#[derive(Clone)]
pub struct CustomizationService {
    store: Arc<dyn CustomizationStore>,
    pages: Arc<dyn PageStore>,
}

const MAX_COMMIT_ATTEMPTS: usize = 3;

/// Put `key` back to `value`; `None` means the key is absent
fn set_field(fields: &mut FieldMap, key: &str, value: Option<&Value>) {
    match value {
        Some(value) => {
            fields.insert(key.to_string(), value.clone());
        }
        None => {
            fields.remove(key);
        }
    }
}

impl CustomizationService {
    pub fn new(store: Arc<dyn CustomizationStore>, pages: Arc<dyn PageStore>) -> Self {
        Self { store, pages }
    }

    /// Open a fresh active customization for a page that has none
    pub async fn open(&self, page: &Page) -> ApiResult<Customization> {
        let customization = Customization::open(page.id, page.template_id, Utc::now());
        self.store.insert(&customization).await?;
        Ok(customization)
    }

    /// Apply `change` to the page's active customization and commit it as a
    /// new version. `change` returns the history descriptions, or `None`
    /// when there is nothing to record. A write that lost the race against
    /// another one is applied again to the fresh record.
    async fn commit_active<F>(&self, page: &Page, open_missing: bool, mut change: F) -> ApiResult<()>
    where
        F: FnMut(&mut Customization) -> Option<Vec<String>> + Send,
    {
        for _ in 0..MAX_COMMIT_ATTEMPTS {
            let mut customization = match self.store.find_active(page.id).await? {
                Some(customization) => customization,
                None if open_missing => match self.open(page).await {
                    Ok(customization) => customization,
                    // Opened concurrently by another request
                    Err(ApiError::Database(DatabaseError::UniqueViolation(_))) => continue,
                    Err(e) => return Err(e),
                },
                None => return Ok(()),
            };

            let Some(descriptions) = change(&mut customization) else {
                return Ok(());
            };
            customization.commit(descriptions, Utc::now());
            if self.store.update(&customization).await? {
                return Ok(());
            }
            warn!(
                "Customization {} changed while committing version {}; retrying",
                customization.id, customization.version
            );
        }
        Err(ApiError::ConcurrentModification)
    }

    /// Record a single section edit; a no-op when no field changed
    pub async fn record_section_edit(
        &self,
        page: &Page,
        before: &Section,
        after: &Section,
    ) -> ApiResult<()> {
        if before.fields == after.fields {
            return Ok(());
        }

        self.commit_active(page, true, |customization| {
            let descriptions =
                customization.record_fields(after.id, &after.name, &before.fields, &after.fields);
            (!descriptions.is_empty()).then_some(descriptions)
        })
        .await
    }

    /// Forget changes recorded against a deleted section
    pub async fn record_section_removed(&self, page: &Page, section: &Section) -> ApiResult<()> {
        self.commit_active(page, false, |customization| {
            let keep: BTreeSet<Uuid> = customization
                .changes
                .iter()
                .map(|c| c.section_id)
                .filter(|id| *id != section.id)
                .collect();
            (customization.retain_sections(&keep) > 0)
                .then(|| vec![format!("Removed section {}", section.name)])
        })
        .await
    }

    /// Record a bulk replacement of the page's sections
    pub async fn record_replace(
        &self,
        page: &Page,
        before: &[Section],
        after: &[Section],
    ) -> ApiResult<()> {
        self.commit_active(page, true, |customization| {
            let mut descriptions = vec![format!("Replaced sections ({} total)", after.len())];
            for new in after {
                if let Some(old) = before.iter().find(|s| s.id == new.id) {
                    descriptions.extend(customization.record_fields(
                        new.id,
                        &new.name,
                        &old.fields,
                        &new.fields,
                    ));
                }
            }

            let keep: BTreeSet<Uuid> = after.iter().map(|s| s.id).collect();
            customization.retain_sections(&keep);
            Some(descriptions)
        })
        .await
    }

    async fn load(
        &self,
        caller: &Principal,
        action: Action,
        id: Uuid,
    ) -> ApiResult<(Customization, Page)> {
        let customization = self
            .store
            .find(id)
            .await?
            .ok_or(ApiError::NotFound("Customization"))?;
        let page = resolve_page(
            self.pages.as_ref(),
            Some(caller),
            ResourceKind::Customization,
            action,
            customization.page_id,
        )
        .await?;
        Ok((customization, page))
    }

    async fn load_mutable(&self, caller: &Principal, id: Uuid) -> ApiResult<(Customization, Page)> {
        let (customization, page) = self.load(caller, Action::Update, id).await?;
        if customization.is_archived() {
            return Err(ApiError::CustomizationArchived);
        }
        Ok((customization, page))
    }

    pub async fn get(&self, caller: &Principal, id: Uuid) -> ApiResult<Customization> {
        Ok(self.load(caller, Action::Read, id).await?.0)
    }

    /// The active customization of a page
    pub async fn for_page(&self, caller: &Principal, page_id: Uuid) -> ApiResult<Customization> {
        resolve_page(
            self.pages.as_ref(),
            Some(caller),
            ResourceKind::Customization,
            Action::Read,
            page_id,
        )
        .await?;
        self.store
            .find_active(page_id)
            .await?
            .ok_or(ApiError::NotFound("Customization"))
    }

    pub async fn history(&self, caller: &Principal, id: Uuid) -> ApiResult<Vec<VersionEntry>> {
        Ok(self.get(caller, id).await?.history)
    }

    /// Customizations of the caller's pages; every page for SUPER_ADMIN
    pub async fn list(
        &self,
        caller: &Principal,
        status: Option<CustomizationStatus>,
    ) -> ApiResult<Vec<Customization>> {
        let owner = (!caller.is_super_admin()).then_some(caller.id);
        Ok(self.store.list(owner, status).await?)
    }

    /// Bring the customization, and the page's section fields, back to the
    /// state recorded at `target_version`. History is never rewritten: the
    /// restored state is appended as a new version.
    pub async fn restore_version(
        &self,
        caller: &Principal,
        id: Uuid,
        target_version: i32,
    ) -> ApiResult<Customization> {
        let (mut customization, page) = self.load_mutable(caller, id).await?;
        let mut snapshot = customization
            .snapshot_at(target_version)
            .cloned()
            .ok_or(ApiError::VersionNotFound(target_version))?;

        // Changes against sections deleted since then cannot come back
        let sections = self.pages.list_sections(page.id).await?;
        let live: BTreeSet<Uuid> = sections.iter().map(|s| s.id).collect();
        snapshot.retain(|c| live.contains(&c.section_id));

        let updated = apply_snapshot(sections, &customization.changes, &snapshot);

        customization.changes = snapshot;
        customization.commit(vec![format!("Restored version {target_version}")], Utc::now());
        if !self.store.update(&customization).await? {
            return Err(ApiError::ConcurrentModification);
        }
        if !updated.is_empty() {
            self.pages.update_sections(&updated).await?;
        }

        info!(
            "Customization {} restored to version {} as version {}",
            customization.id, target_version, customization.version
        );
        Ok(customization)
    }

    pub async fn archive(&self, caller: &Principal, id: Uuid) -> ApiResult<Customization> {
        let (mut customization, _) = self.load_mutable(caller, id).await?;
        customization.status = CustomizationStatus::Archived;
        customization.commit(vec!["Archived".to_string()], Utc::now());
        if !self.store.update(&customization).await? {
            return Err(ApiError::ConcurrentModification);
        }

        info!("Customization {} archived by {}", customization.id, caller.id);
        Ok(customization)
    }
}

/// Rewrite section fields so that `current` changes become `target` ones.
/// Returns only the sections whose fields changed.
fn apply_snapshot(
    sections: Vec<Section>,
    current: &[FieldChange],
    target: &[FieldChange],
) -> Vec<Section> {
    let now = Utc::now();
    sections
        .into_iter()
        .filter_map(|mut section| {
            let mut fields = section.fields.clone();

            for change in current.iter().filter(|c| c.section_id == section.id) {
                let kept = target
                    .iter()
                    .any(|t| t.section_id == section.id && t.field_id == change.field_id);
                if !kept {
                    set_field(&mut fields, &change.field_id, change.original_value.as_ref());
                }
            }
            for change in target.iter().filter(|c| c.section_id == section.id) {
                set_field(&mut fields, &change.field_id, change.current_value.as_ref());
            }

            if fields == section.fields {
                return None;
            }
            section.fields = fields;
            section.updated_at = now;
            Some(section)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::{models::SectionInput, repositories::memory::MemoryStore};
    use common::Role;
    use serde_json::json;

    struct Fixture {
        service: CustomizationService,
        store: Arc<MemoryStore>,
        owner: Principal,
        page: Page,
        section: Section,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let service = CustomizationService::new(store.clone(), store.clone());
        let owner = Principal::new(Uuid::new_v4(), Role::Admin);

        let page = Page::new(owner.id, "Home".into(), "home".into(), None);
        let section = Section::new(
            page.id,
            SectionInput {
                section_type: "hero".into(),
                name: Some("Hero".into()),
                fields: json!({"title": "Hello"}).as_object().cloned(),
                ..Default::default()
            },
            0,
        );
        store
            .insert_page(
                &page,
                &[section.clone()],
                &Customization::open(page.id, None, Utc::now()),
            )
            .await
            .unwrap();

        Fixture {
            service,
            store,
            owner,
            page,
            section,
        }
    }

    /// Edit the section's title through the store and record it
    async fn edit_title(f: &Fixture, title: &str) {
        let before = f.store.find_section(f.section.id).await.unwrap().unwrap();
        let mut after = before.clone();
        after.fields.insert("title".into(), json!(title));
        f.store.update_sections(&[after.clone()]).await.unwrap();
        f.service
            .record_section_edit(&f.page, &before, &after)
            .await
            .unwrap();
    }

    async fn title(f: &Fixture) -> Value {
        f.store.find_section(f.section.id).await.unwrap().unwrap().fields["title"].clone()
    }

    #[tokio::test]
    async fn each_edit_adds_a_version() {
        let f = fixture().await;
        edit_title(&f, "A").await;
        edit_title(&f, "B").await;

        let c = f.service.for_page(&f.owner, f.page.id).await.unwrap();
        assert_eq!(c.version, 3);
        assert_eq!(c.history.len(), 3);
        assert_eq!(c.changes.len(), 1);
        assert_eq!(c.changes[0].original_value, Some(json!("Hello")));
        assert_eq!(c.changes[0].current_value, Some(json!("B")));
    }

    #[tokio::test]
    async fn restore_appends_new_version_matching_snapshot() {
        let f = fixture().await;
        edit_title(&f, "A").await;
        edit_title(&f, "B").await;
        let before = f.service.for_page(&f.owner, f.page.id).await.unwrap();

        let restored = f
            .service
            .restore_version(&f.owner, before.id, 2)
            .await
            .unwrap();

        assert_eq!(restored.version, 4);
        assert_eq!(restored.changes, *before.snapshot_at(2).unwrap());
        assert_eq!(&restored.history[..3], &before.history[..]);
        assert_eq!(title(&f).await, json!("A"));

        // Restoring the initial version undoes every field change
        let back = f
            .service
            .restore_version(&f.owner, before.id, 1)
            .await
            .unwrap();
        assert_eq!(back.version, 5);
        assert!(back.changes.is_empty());
        assert_eq!(title(&f).await, json!("Hello"));
    }

    #[tokio::test]
    async fn restore_brings_back_an_explicit_null() {
        let f = fixture().await;
        let mut blank = f.store.find_section(f.section.id).await.unwrap().unwrap();
        blank.fields.insert("image".into(), Value::Null);
        f.store.update_sections(&[blank.clone()]).await.unwrap();

        let mut edited = blank.clone();
        edited.fields.insert("image".into(), json!("a.png"));
        f.store.update_sections(&[edited.clone()]).await.unwrap();
        f.service
            .record_section_edit(&f.page, &blank, &edited)
            .await
            .unwrap();

        let c = f.service.for_page(&f.owner, f.page.id).await.unwrap();
        assert_eq!(c.changes[0].original_value, Some(Value::Null));
        f.service.restore_version(&f.owner, c.id, 1).await.unwrap();

        let fields = f.store.find_section(f.section.id).await.unwrap().unwrap().fields;
        assert_eq!(fields.get("image"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn restore_skips_sections_deleted_since() {
        let f = fixture().await;
        edit_title(&f, "Changed").await;
        f.store.delete_section(f.section.id).await.unwrap();
        f.service
            .record_section_removed(&f.page, &f.section)
            .await
            .unwrap();
        let c = f.service.for_page(&f.owner, f.page.id).await.unwrap();
        assert_eq!(c.version, 3);

        let restored = f.service.restore_version(&f.owner, c.id, 2).await.unwrap();
        assert_eq!(restored.version, 4);
        assert!(restored.changes.is_empty());
    }

    #[tokio::test]
    async fn edit_racing_another_write_is_applied_on_top() {
        let f = fixture().await;
        f.store.lose_next_update.store(true, Ordering::SeqCst);
        edit_title(&f, "A").await;

        let c = f.service.for_page(&f.owner, f.page.id).await.unwrap();
        assert_eq!(c.version, 3);
        assert_eq!(c.history.len(), 3);
        assert_eq!(c.history[1].changes, ["Concurrent edit"]);
        assert_eq!(c.history[2].changes, ["Updated title in Hero"]);
        assert_eq!(c.changes[0].current_value, Some(json!("A")));
    }

    #[tokio::test]
    async fn archive_racing_another_write_conflicts() {
        let f = fixture().await;
        let c = f.service.for_page(&f.owner, f.page.id).await.unwrap();
        f.store.lose_next_update.store(true, Ordering::SeqCst);

        assert!(matches!(
            f.service.archive(&f.owner, c.id).await,
            Err(ApiError::ConcurrentModification)
        ));
        let stored = f.service.get(&f.owner, c.id).await.unwrap();
        assert_eq!(stored.status, CustomizationStatus::Active);
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn restore_of_unknown_version_fails() {
        let f = fixture().await;
        let c = f.service.for_page(&f.owner, f.page.id).await.unwrap();
        assert!(matches!(
            f.service.restore_version(&f.owner, c.id, 7).await,
            Err(ApiError::VersionNotFound(7))
        ));
    }

    #[tokio::test]
    async fn archived_customization_is_read_only() {
        let f = fixture().await;
        let c = f.service.for_page(&f.owner, f.page.id).await.unwrap();

        let archived = f.service.archive(&f.owner, c.id).await.unwrap();
        assert_eq!(archived.status, CustomizationStatus::Archived);
        assert_eq!(archived.version, 2);

        assert!(matches!(
            f.service.restore_version(&f.owner, c.id, 1).await,
            Err(ApiError::CustomizationArchived)
        ));
        assert!(matches!(
            f.service.archive(&f.owner, c.id).await,
            Err(ApiError::CustomizationArchived)
        ));

        // The next edit opens a fresh active customization
        edit_title(&f, "Again").await;
        let fresh = f.service.for_page(&f.owner, f.page.id).await.unwrap();
        assert_ne!(fresh.id, c.id);
        assert_eq!(fresh.version, 2);

        let archived_only = f
            .service
            .list(&f.owner, Some(CustomizationStatus::Archived))
            .await
            .unwrap();
        assert_eq!(archived_only.len(), 1);
        assert_eq!(f.service.list(&f.owner, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn other_users_see_not_found() {
        let f = fixture().await;
        let c = f.service.for_page(&f.owner, f.page.id).await.unwrap();
        let stranger = Principal::new(Uuid::new_v4(), Role::Admin);

        assert!(matches!(
            f.service.get(&stranger, c.id).await,
            Err(ApiError::NotFound("Customization"))
        ));
        assert!(matches!(
            f.service.archive(&stranger, c.id).await,
            Err(ApiError::NotFound("Customization"))
        ));
        assert!(f.service.list(&stranger, None).await.unwrap().is_empty());

        let root = Principal::new(Uuid::new_v4(), Role::SuperAdmin);
        assert!(f.service.history(&root, c.id).await.is_ok());
        assert!(matches!(
            f.service.archive(&root, c.id).await,
            Err(ApiError::NotFound("Customization"))
        ));
    }

    #[tokio::test]
    async fn replace_drops_changes_of_removed_sections() {
        let f = fixture().await;
        edit_title(&f, "Changed").await;

        let replacement = Section::new(
            f.page.id,
            SectionInput {
                section_type: "cta".into(),
                ..Default::default()
            },
            0,
        );
        f.service
            .record_replace(&f.page, &[f.section.clone()], &[replacement])
            .await
            .unwrap();

        let c = f.service.for_page(&f.owner, f.page.id).await.unwrap();
        assert!(c.changes.is_empty());
        assert_eq!(c.version, 3);
        assert!(c.history.last().unwrap().changes[0].starts_with("Replaced sections"));
    }

    #[tokio::test]
    async fn removing_a_section_forgets_its_changes() {
        let f = fixture().await;
        edit_title(&f, "Changed").await;
        f.service
            .record_section_removed(&f.page, &f.section)
            .await
            .unwrap();

        let c = f.service.for_page(&f.owner, f.page.id).await.unwrap();
        assert!(c.changes.is_empty());
        assert_eq!(c.version, 3);
    }
}
