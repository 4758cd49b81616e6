//! Recipe catalog handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::catalog::{RecipeListQuery, RecipeView};
use crate::application::pagination::PageRequest;
use crate::cache::Identity;

use super::catalog_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::middleware::{Authenticated, MaybeAuthenticated};
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

/// Cached listing. Signed-in callers get their own recipes, anonymous
/// callers the public catalog.
pub async fn list_recipes(
    State(state): State<ApiState>,
    MaybeAuthenticated(principal): MaybeAuthenticated,
    Query(params): Query<RecipeListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = Identity::from_user(principal.as_ref().map(|p| p.user_id));
    let query = RecipeListQuery::from(params);

    let body = state
        .catalog
        .list_recipes(identity, &query)
        .await
        .map_err(catalog_to_api)?;

    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}

pub async fn list_my_recipes(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
    Query(params): Query<MyRecipesParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .catalog
        .list_my_recipes(
            principal.user_id,
            params.search.as_deref(),
            PageRequest::new(params.limit, params.offset),
        )
        .await
        .map_err(catalog_to_api)?;

    Ok(Json(page))
}

pub async fn get_recipe(
    State(state): State<ApiState>,
    MaybeAuthenticated(principal): MaybeAuthenticated,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let recipe = state
        .catalog
        .get_recipe(principal.map(|p| p.user_id), id)
        .await
        .map_err(catalog_to_api)?;

    Ok(Json(RecipeView::from(&recipe)))
}

pub async fn create_recipe(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
    Json(payload): Json<RecipeCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let draft = payload.into_draft()?;
    let recipe = state
        .catalog
        .create_recipe(&principal, draft)
        .await
        .map_err(catalog_to_api)?;

    Ok((StatusCode::CREATED, Json(RecipeView::from(&recipe))))
}

pub async fn update_recipe(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecipeUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let patch = payload.into_patch()?;
    let recipe = state
        .catalog
        .update_recipe(principal.user_id, id, patch)
        .await
        .map_err(catalog_to_api)?;

    Ok(Json(RecipeView::from(&recipe)))
}

pub async fn delete_recipe(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .catalog
        .delete_recipe(principal.user_id, id)
        .await
        .map_err(catalog_to_api)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_categories(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .catalog
        .list_categories()
        .await
        .map_err(catalog_to_api)?;

    Ok(Json(categories))
}
