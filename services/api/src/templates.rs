//! Template resolution with a built-in fallback catalog
//!
//! Listing and lookup never fail because the store is down: when the store
//! errors or has nothing to offer, the default catalog answers instead.

use std::sync::Arc;

use chrono::Utc;
use common::{Action, Principal, ResourceKind, authorize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    catalog::DefaultCatalog,
    error::{ApiError, ApiResult},
    models::{CreateTemplateRequest, Template, TemplateSection, UpdateTemplateRequest},
    repositories::{TemplateFilter, TemplateStore, TemplateVisibility},
    validation::{validate_name, validate_section_type},
};

#[derive(Clone)]
pub struct TemplateService {
    store: Arc<dyn TemplateStore>,
    catalog: Arc<DefaultCatalog>,
}

fn check(
    caller: Option<&Principal>,
    action: Action,
    template: Option<&Template>,
) -> ApiResult<()> {
    let ownership = template.map(Template::ownership);
    authorize(caller, ResourceKind::Template, action, ownership.as_ref())
        .map_err(|d| ApiError::denied(d, ResourceKind::Template))
}

fn validate_blueprint(sections: &[TemplateSection]) -> ApiResult<()> {
    for section in sections {
        validate_section_type(&section.section_type)
            .map_err(|m| ApiError::validation("sections", m))?;
    }
    Ok(())
}

impl TemplateService {
    pub fn new(store: Arc<dyn TemplateStore>, catalog: Arc<DefaultCatalog>) -> Self {
        Self { store, catalog }
    }

    /// Everything for SUPER_ADMIN, public plus own for other users, public
    /// only for anonymous callers
    pub async fn list(&self, caller: Option<&Principal>, category: Option<&str>) -> Vec<Template> {
        let visibility = match caller {
            Some(p) if p.is_super_admin() => TemplateVisibility::All,
            Some(p) => TemplateVisibility::PublicOrOwnedBy(p.id),
            None => TemplateVisibility::Public,
        };
        let filter = TemplateFilter {
            category: category.map(str::to_string),
            visibility,
        };

        match self.store.list(&filter).await {
            Ok(templates) if !templates.is_empty() => templates,
            Ok(_) => {
                warn!("No stored templates for {:?}; serving default catalog", category);
                self.catalog.list(category)
            }
            Err(e) => {
                warn!("Template store unavailable ({}); serving default catalog", e);
                self.catalog.list(category)
            }
        }
    }

    pub async fn get(&self, caller: Option<&Principal>, id: Uuid) -> ApiResult<Template> {
        match self.store.find(id).await {
            Ok(Some(template)) => {
                check(caller, Action::Read, Some(&template))?;
                Ok(template)
            }
            Ok(None) => self.catalog.find(id).ok_or(ApiError::NotFound("Template")),
            Err(e) => {
                warn!("Template store unavailable ({}); looking up {} in default catalog", e, id);
                self.catalog.find(id).ok_or(ApiError::NotFound("Template"))
            }
        }
    }

    pub async fn sections(
        &self,
        caller: Option<&Principal>,
        id: Uuid,
    ) -> ApiResult<Vec<TemplateSection>> {
        let mut sections = self.get(caller, id).await?.sections;
        sections.sort_by_key(|s| s.order);
        Ok(sections)
    }

    pub async fn create(
        &self,
        caller: &Principal,
        request: CreateTemplateRequest,
    ) -> ApiResult<Template> {
        check(Some(caller), Action::Create, None)?;
        validate_name(&request.name).map_err(|m| ApiError::validation("name", m))?;
        if request.category.trim().is_empty() {
            return Err(ApiError::validation("category", "Category is required"));
        }
        validate_blueprint(&request.sections)?;

        let now = Utc::now();
        let template = Template {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            category: request.category.trim().to_string(),
            description: request.description,
            thumbnail: request.thumbnail,
            is_public: request.is_public.unwrap_or(true),
            owner_id: Some(caller.id),
            sections: request.sections,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(&template).await?;

        info!("Template {} created by {}", template.id, caller.id);
        Ok(template)
    }

    pub async fn update(
        &self,
        caller: &Principal,
        id: Uuid,
        request: UpdateTemplateRequest,
    ) -> ApiResult<Template> {
        let mut template = self
            .store
            .find(id)
            .await?
            .ok_or(ApiError::NotFound("Template"))?;
        check(Some(caller), Action::Update, Some(&template))?;

        if let Some(name) = request.name {
            validate_name(&name).map_err(|m| ApiError::validation("name", m))?;
            template.name = name.trim().to_string();
        }
        if let Some(category) = request.category {
            if category.trim().is_empty() {
                return Err(ApiError::validation("category", "Category is required"));
            }
            template.category = category.trim().to_string();
        }
        if let Some(description) = request.description {
            template.description = description;
        }
        if request.thumbnail.is_some() {
            template.thumbnail = request.thumbnail;
        }
        if let Some(is_public) = request.is_public {
            template.is_public = is_public;
        }
        if let Some(sections) = request.sections {
            validate_blueprint(&sections)?;
            template.sections = sections;
        }
        template.updated_at = Utc::now();

        self.store.update(&template).await?;
        Ok(template)
    }

    pub async fn delete(&self, caller: &Principal, id: Uuid) -> ApiResult<()> {
        let template = self
            .store
            .find(id)
            .await?
            .ok_or(ApiError::NotFound("Template"))?;
        check(Some(caller), Action::Delete, Some(&template))?;

        self.store.delete(id).await?;
        info!("Template {} deleted by {}", id, caller.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::{catalog::STARTUP_TEMPLATE_ID, repositories::memory::MemoryStore};
    use common::Role;

    fn service() -> (TemplateService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = TemplateService::new(store.clone(), Arc::new(DefaultCatalog::new()));
        (service, store)
    }

    fn principal(role: Role) -> Principal {
        Principal::new(Uuid::new_v4(), role)
    }

    fn request(name: &str, category: &str, is_public: bool) -> CreateTemplateRequest {
        CreateTemplateRequest {
            name: name.into(),
            category: category.into(),
            is_public: Some(is_public),
            ..Default::default()
        }
    }

    fn shape(template: &Template) -> Vec<String> {
        let value = serde_json::to_value(template).unwrap();
        let mut keys: Vec<String> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    #[tokio::test]
    async fn empty_store_serves_default_catalog() {
        let (service, _) = service();
        let templates = service.list(None, Some("business")).await;
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].id, STARTUP_TEMPLATE_ID);
    }

    #[tokio::test]
    async fn unavailable_store_serves_default_catalog() {
        let (service, store) = service();
        let root = principal(Role::SuperAdmin);
        service
            .create(&root, request("Stored", "business", true))
            .await
            .unwrap();

        store.templates_unavailable.store(true, Ordering::SeqCst);
        let templates = service.list(Some(&root), None).await;
        assert_eq!(templates.len(), DefaultCatalog::new().list(None).len());

        let fallback = service.get(None, STARTUP_TEMPLATE_ID).await.unwrap();
        assert_eq!(fallback.name, "Startup Landing");
    }

    #[tokio::test]
    async fn fallback_records_have_the_stored_shape() {
        let (service, _) = service();
        let root = principal(Role::SuperAdmin);
        let fallback = service.list(None, None).await.remove(0);

        let stored = service
            .create(&root, request("Stored", "business", true))
            .await
            .unwrap();
        let listed = service.list(None, None).await;
        assert_eq!(listed, vec![stored.clone()]);
        assert_eq!(shape(&fallback), shape(&stored));
    }

    #[tokio::test]
    async fn visibility_follows_role_and_ownership() {
        let (service, store) = service();
        let root = principal(Role::SuperAdmin);
        let public = service
            .create(&root, request("Public", "business", true))
            .await
            .unwrap();
        let private = service
            .create(&root, request("Private", "business", false))
            .await
            .unwrap();

        let anonymous = service.list(None, None).await;
        assert_eq!(anonymous, vec![public.clone()]);

        let all = service.list(Some(&root), None).await;
        assert_eq!(all.len(), 2);

        // Another user's private template is hidden from listing and lookup
        let user = principal(Role::User);
        let mut theirs = private.clone();
        theirs.id = Uuid::new_v4();
        theirs.owner_id = Some(user.id);
        TemplateStore::insert(&*store, &theirs).await.unwrap();
        let for_user = service.list(Some(&user), None).await;
        assert_eq!(for_user.len(), 2);
        assert!(for_user.iter().all(|t| t.id != private.id));

        assert!(matches!(
            service.get(Some(&user), private.id).await,
            Err(ApiError::NotFound("Template"))
        ));
        assert!(service.get(Some(&user), theirs.id).await.is_ok());
    }

    #[tokio::test]
    async fn only_super_admin_manages_templates() {
        let (service, _) = service();
        let admin = principal(Role::Admin);
        assert!(matches!(
            service.create(&admin, request("T", "business", true)).await,
            Err(ApiError::Forbidden(_))
        ));

        let root = principal(Role::SuperAdmin);
        let template = service
            .create(&root, request("T", "business", true))
            .await
            .unwrap();
        assert!(matches!(
            service.delete(&admin, template.id).await,
            Err(ApiError::Forbidden(_))
        ));

        let updated = service
            .update(
                &root,
                template.id,
                UpdateTemplateRequest {
                    name: Some("Renamed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");

        service.delete(&root, template.id).await.unwrap();
        assert!(matches!(
            service.delete(&root, template.id).await,
            Err(ApiError::NotFound("Template"))
        ));
    }

    #[tokio::test]
    async fn blueprint_sections_are_returned_in_order() {
        let (service, _) = service();
        let sections = service.sections(None, STARTUP_TEMPLATE_ID).await.unwrap();
        let orders: Vec<i32> = sections.iter().map(|s| s.order).collect();
        assert_eq!(orders, [0, 1, 2, 3]);
        assert!(matches!(
            service.sections(None, Uuid::new_v4()).await,
            Err(ApiError::NotFound("Template"))
        ));
    }
}
