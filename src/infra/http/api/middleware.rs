use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{HeaderValue, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::application::accounts::{AuthError, Principal};

use super::error::ApiError;
use super::state::ApiState;

/// Resolve the bearer token, if any, into a [`Principal`] request extension.
///
/// Requests without an `Authorization` header pass through anonymously. A
/// header that is present but unusable is rejected, even on public routes.
pub async fn authenticate(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(header) = request.headers().get(header::AUTHORIZATION) else {
        return next.run(request).await;
    };

    let token = match extract_token(header) {
        Some(value) => value,
        None => return ApiError::unauthorized().into_response(),
    };

    let principal = match state.accounts.authenticate(&token).await {
        Ok(principal) => principal,
        Err(AuthError::Missing) | Err(AuthError::Invalid) => {
            return ApiError::unauthorized().into_response();
        }
        Err(AuthError::Expired) => return ApiError::expired().into_response(),
    };

    request.extensions_mut().insert(principal.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(principal);
    response
}

fn extract_token(header: &HeaderValue) -> Option<String> {
    let raw = header.to_str().ok()?;
    let bearer = raw.strip_prefix("Bearer ")?.trim();
    (!bearer.is_empty()).then(|| bearer.to_string())
}

/// Extractor for handlers that need a signed-in caller.
pub struct Authenticated(pub Principal);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(Self)
            .ok_or_else(ApiError::unauthorized)
    }
}

/// Extractor for handlers that behave differently for anonymous callers.
pub struct MaybeAuthenticated(pub Option<Principal>);

impl<S> FromRequestParts<S> for MaybeAuthenticated
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Principal>().cloned()))
    }
}
