//! API service routes

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    ai_spec::GenerateSpecRequest,
    error::ApiResult,
    middleware::{CurrentUser, MaybeUser, auth_middleware, optional_auth_middleware},
    models::{
        CreatePageRequest, CreateTemplateRequest, CustomizationStatus, RestoreRequest,
        SectionInput, UpdatePageRequest, UpdateSectionRequest, UpdateTemplateRequest,
    },
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct TemplateQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CustomizationQuery {
    pub status: Option<CustomizationStatus>,
}

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/templates", post(create_template))
        .route("/templates/:id", patch(update_template).delete(delete_template))
        .route("/pages", get(list_pages).post(create_page))
        .route(
            "/pages/:id",
            get(get_page).patch(update_page).delete(delete_page),
        )
        .route("/pages/:id/publish", post(publish_page))
        .route("/pages/:id/unpublish", post(unpublish_page))
        .route(
            "/pages/:id/sections",
            get(list_sections).post(add_section).put(save_sections),
        )
        .route("/pages/:id/customization", get(page_customization))
        .route("/sections/:id", patch(update_section).delete(delete_section))
        .route("/customizations", get(list_customizations))
        .route("/customizations/:id", get(get_customization))
        .route("/customizations/:id/history", get(customization_history))
        .route("/customizations/:id/restore", post(restore_customization))
        .route("/customizations/:id/archive", post(archive_customization))
        .route("/ai/spec", post(generate_spec))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let public_routes = Router::new()
        .route("/templates", get(list_templates))
        .route("/templates/:id", get(get_template))
        .route("/templates/:id/sections", get(template_sections))
        .route("/published/:id", get(published_page))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            optional_auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = common::database::health_check(&state.db_pool).await;
    let status = if database { "ok" } else { "degraded" };

    Json(json!({
        "status": status,
        "service": "api-service",
        "database": database,
    }))
}

pub async fn list_templates(
    State(state): State<AppState>,
    MaybeUser(caller): MaybeUser,
    Query(query): Query<TemplateQuery>,
) -> impl IntoResponse {
    let templates = state
        .templates
        .list(caller.as_ref(), query.category.as_deref())
        .await;
    Json(templates)
}

pub async fn get_template(
    State(state): State<AppState>,
    MaybeUser(caller): MaybeUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let template = state.templates.get(caller.as_ref(), id).await?;
    Ok(Json(template))
}

pub async fn template_sections(
    State(state): State<AppState>,
    MaybeUser(caller): MaybeUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let sections = state.templates.sections(caller.as_ref(), id).await?;
    Ok(Json(sections))
}

pub async fn create_template(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Json(payload): Json<CreateTemplateRequest>,
) -> ApiResult<impl IntoResponse> {
    let template = state.templates.create(&caller, payload).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

pub async fn update_template(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTemplateRequest>,
) -> ApiResult<impl IntoResponse> {
    let template = state.templates.update(&caller, id, payload).await?;
    Ok(Json(template))
}

pub async fn delete_template(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.templates.delete(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_pages(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<impl IntoResponse> {
    let pages = state.pages.list(&caller).await?;
    Ok(Json(pages))
}

pub async fn get_page(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let page = state.pages.get(Some(&caller), id).await?;
    Ok(Json(page))
}

/// Hosted view of a published page; no credentials needed
pub async fn published_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let page = state.pages.get_published(id).await?;
    Ok(Json(page))
}

pub async fn create_page(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Json(payload): Json<CreatePageRequest>,
) -> ApiResult<impl IntoResponse> {
    let page = state.pages.create(&caller, payload).await?;
    Ok((StatusCode::CREATED, Json(page)))
}

pub async fn update_page(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePageRequest>,
) -> ApiResult<impl IntoResponse> {
    let page = state.pages.update(&caller, id, payload).await?;
    Ok(Json(page))
}

pub async fn publish_page(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let page = state.pages.publish(&caller, id).await?;
    Ok(Json(page))
}

pub async fn unpublish_page(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let page = state.pages.unpublish(&caller, id).await?;
    Ok(Json(page))
}

pub async fn delete_page(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.pages.delete(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_sections(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(page_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let sections = state.pages.list_sections(&caller, page_id).await?;
    Ok(Json(sections))
}

pub async fn add_section(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(page_id): Path<Uuid>,
    Json(payload): Json<SectionInput>,
) -> ApiResult<impl IntoResponse> {
    let section = state.pages.add_section(&caller, page_id, payload).await?;
    Ok((StatusCode::CREATED, Json(section)))
}

/// Replace every section of the page in one go
pub async fn save_sections(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(page_id): Path<Uuid>,
    Json(payload): Json<Vec<SectionInput>>,
) -> ApiResult<impl IntoResponse> {
    let sections = state.pages.save_sections(&caller, page_id, payload).await?;
    Ok(Json(sections))
}

pub async fn update_section(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSectionRequest>,
) -> ApiResult<impl IntoResponse> {
    let section = state.pages.update_section(&caller, id, payload).await?;
    Ok(Json(section))
}

pub async fn delete_section(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.pages.delete_section(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn page_customization(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(page_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let customization = state.customizations.for_page(&caller, page_id).await?;
    Ok(Json(customization))
}

pub async fn list_customizations(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Query(query): Query<CustomizationQuery>,
) -> ApiResult<impl IntoResponse> {
    let customizations = state.customizations.list(&caller, query.status).await?;
    Ok(Json(customizations))
}

pub async fn get_customization(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let customization = state.customizations.get(&caller, id).await?;
    Ok(Json(customization))
}

pub async fn customization_history(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let history = state.customizations.history(&caller, id).await?;
    Ok(Json(history))
}

pub async fn restore_customization(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RestoreRequest>,
) -> ApiResult<impl IntoResponse> {
    let customization = state
        .customizations
        .restore_version(&caller, id, payload.version)
        .await?;
    Ok(Json(customization))
}

pub async fn archive_customization(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let customization = state.customizations.archive(&caller, id).await?;
    Ok(Json(customization))
}

pub async fn generate_spec(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Json(payload): Json<GenerateSpecRequest>,
) -> ApiResult<impl IntoResponse> {
    let spec = state.ai.generate_spec(&payload.prompt).await?;
    Ok(Json(spec))
}
