//! Orders, purchases and checkout handlers

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::application::catalog::RecipeView;
use crate::application::orders::OrderDraft;

use super::order_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::middleware::Authenticated;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

/// A single object answers with a single order, an array with an array.
pub async fn place_orders(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
    Json(payload): Json<OrdersPayload>,
) -> Result<Response, ApiError> {
    let (drafts, single) = match payload {
        OrdersPayload::One(order) => (vec![OrderDraft::from(order)], true),
        OrdersPayload::Many(orders) => (orders.into_iter().map(OrderDraft::from).collect(), false),
    };

    let mut placed = state
        .orders
        .place_orders(&principal, drafts)
        .await
        .map_err(order_to_api)?;

    if single {
        let order = placed
            .pop()
            .ok_or_else(|| ApiError::internal("order was not recorded"))?;
        Ok((StatusCode::CREATED, Json(order)).into_response())
    } else {
        Ok((StatusCode::CREATED, Json(placed)).into_response())
    }
}

pub async fn purchased_recipes(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
) -> Result<impl IntoResponse, ApiError> {
    let recipes = state
        .orders
        .purchased_recipes(principal.user_id)
        .await
        .map_err(order_to_api)?;

    let views: Vec<RecipeView> = recipes.iter().map(RecipeView::from).collect();
    Ok(Json(views))
}

pub async fn has_purchased(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
    Path(recipe_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let has_purchased = state
        .orders
        .has_purchased(principal.user_id, recipe_id)
        .await
        .map_err(order_to_api)?;

    Ok(Json(HasPurchasedResponse { has_purchased }))
}

pub async fn create_payment_order(
    State(state): State<ApiState>,
    Authenticated(_principal): Authenticated,
    Json(payload): Json<CreatePaymentOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .orders
        .create_payment_order(payload.amount)
        .await
        .map_err(order_to_api)?;

    Ok(Json(PaymentOrderResponse {
        order_id: order.id,
        amount: order.amount,
        currency: order.currency,
        status: order.status,
    }))
}
