//! Application state shared across handlers

use common::TokenVerifier;
use sqlx::PgPool;

use crate::{
    ai_spec::AiSpecClient, customizations::CustomizationService, pages::PageService,
    templates::TemplateService,
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub verifier: TokenVerifier,
    pub templates: TemplateService,
    pub pages: PageService,
    pub customizations: CustomizationService,
    pub ai: AiSpecClient,
}
