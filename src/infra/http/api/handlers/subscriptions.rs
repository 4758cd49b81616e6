use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::subscription_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::SubscribeRequest;
use crate::infra::http::api::state::ApiState;

pub async fn subscribe(
    State(state): State<ApiState>,
    Json(payload): Json<SubscribeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .subscriptions
        .subscribe(&payload.email)
        .await
        .map_err(subscription_to_api)?;

    Ok((StatusCode::CREATED, Json(record)))
}
