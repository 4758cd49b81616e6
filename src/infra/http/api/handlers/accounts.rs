//! Registration and login

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::accounts::RegisterCommand;

use super::account_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

pub async fn register(
    State(state): State<ApiState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .accounts
        .register(RegisterCommand {
            username: payload.username,
            email: payload.email,
            password: payload.password,
        })
        .await
        .map_err(account_to_api)?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

pub async fn login(
    State(state): State<ApiState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let issued = state
        .accounts
        .login(&payload.username, &payload.password)
        .await
        .map_err(account_to_api)?;

    Ok(Json(TokenResponse {
        token: issued.token,
        token_type: "Bearer",
        expires_at: issued.expires_at,
        user: UserResponse::from(&issued.user),
    }))
}
