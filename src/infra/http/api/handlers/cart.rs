//! Cart handlers

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use super::cart_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::middleware::Authenticated;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

pub async fn list_cart(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
) -> Result<impl IntoResponse, ApiError> {
    let items = state
        .cart
        .list(principal.user_id)
        .await
        .map_err(cart_to_api)?;

    let items: Vec<CartItemResponse> = items.iter().map(CartItemResponse::from).collect();
    Ok(Json(items))
}

pub async fn add_to_cart(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
    Json(payload): Json<CartAddRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state
        .cart
        .add(principal.user_id, payload.recipe)
        .await
        .map_err(cart_to_api)?;

    Ok((StatusCode::CREATED, Json(CartItemResponse::from(&item))))
}

pub async fn remove_from_cart(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .cart
        .remove(principal.user_id, id)
        .await
        .map_err(cart_to_api)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear_cart(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .cart
        .clear(principal.user_id)
        .await
        .map_err(cart_to_api)?;

    Ok(Json(ClearedResponse { removed }))
}

pub async fn cart_count(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
) -> Result<impl IntoResponse, ApiError> {
    let count = state
        .cart
        .count(principal.user_id)
        .await
        .map_err(cart_to_api)?;

    Ok(Json(CountResponse { count }))
}
