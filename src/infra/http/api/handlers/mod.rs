//! API handlers organized by resource.
//!
//! Error conversions shared across the resource modules live here.

mod accounts;
mod cart;
mod health;
mod orders;
mod recipes;
mod subscriptions;

pub use accounts::*;
pub use cart::*;
pub use health::*;
pub use orders::*;
pub use recipes::*;
pub use subscriptions::*;

use axum::http::StatusCode;

use crate::application::accounts::AccountError;
use crate::application::cart::CartError;
use crate::application::catalog::CatalogError;
use crate::application::orders::OrderError;
use crate::application::payments::PaymentError;
use crate::application::repos::RepoError;
use crate::application::subscriptions::SubscriptionError;
use crate::domain::error::DomainError;

use super::error::{ApiError, codes};

pub(crate) fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Duplicate record",
            Some(constraint),
        ),
        RepoError::NotFound => ApiError::not_found("resource not found"),
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
        RepoError::Integrity { message } => ApiError::new(
            StatusCode::CONFLICT,
            codes::INTEGRITY,
            "Integrity constraint violated",
            Some(message),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        ),
        RepoError::Persistence(msg) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Persistence error",
            Some(msg),
        ),
    }
}

pub(crate) fn domain_to_api(err: DomainError) -> ApiError {
    match err {
        DomainError::Validation { field, message } => {
            ApiError::invalid_input(format!("{field}: {message}"))
        }
        DomainError::NotFound { .. } => ApiError::not_found("resource not found"),
        DomainError::Invariant { message } => ApiError::internal(message),
    }
}

pub(crate) fn account_to_api(err: AccountError) -> ApiError {
    match err {
        AccountError::Domain(err) => domain_to_api(err),
        AccountError::Repo(err) => repo_to_api(err),
        AccountError::UsernameTaken => ApiError::conflict(
            "Username already taken",
            Some("choose a different username".to_string()),
        ),
        AccountError::InvalidCredentials => ApiError::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            "Invalid username or password",
            None,
        ),
        AccountError::Hashing(message) => ApiError::internal(message),
    }
}

pub(crate) fn catalog_to_api(err: CatalogError) -> ApiError {
    match err {
        CatalogError::Domain(err) => domain_to_api(err),
        CatalogError::Repo(err) => repo_to_api(err),
        CatalogError::NotFound => ApiError::not_found("recipe not found"),
        CatalogError::Forbidden => {
            ApiError::forbidden("Only the recipe's creator may change it")
        }
        CatalogError::UnknownCategory(id) => {
            ApiError::invalid_input(format!("category `{id}` does not exist"))
        }
        CatalogError::Encode(message) => ApiError::internal(message),
    }
}

pub(crate) fn cart_to_api(err: CartError) -> ApiError {
    match err {
        CartError::Repo(err) => repo_to_api(err),
        CartError::ItemNotFound => ApiError::not_found("cart item not found"),
        CartError::UnknownRecipe(_) => ApiError::not_found("recipe not found"),
    }
}

pub(crate) fn payment_to_api(err: PaymentError) -> ApiError {
    match err {
        PaymentError::NotConfigured => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::PAYMENT,
            "Payments are not configured",
            None,
        ),
        PaymentError::Rejected { status, message } => ApiError::new(
            StatusCode::BAD_GATEWAY,
            codes::PAYMENT,
            "Payment gateway rejected the order",
            Some(format!("gateway status {status}: {message}")),
        ),
        PaymentError::Transport(message) | PaymentError::Decode(message) => ApiError::new(
            StatusCode::BAD_GATEWAY,
            codes::PAYMENT,
            "Payment gateway unavailable",
            Some(message),
        ),
    }
}

pub(crate) fn order_to_api(err: OrderError) -> ApiError {
    match err {
        OrderError::Domain(err) => domain_to_api(err),
        OrderError::Repo(err) => repo_to_api(err),
        OrderError::Payment(err) => payment_to_api(err),
        OrderError::UnknownRecipe(id) => {
            ApiError::invalid_input(format!("recipe `{id}` does not exist"))
        }
        OrderError::Empty => ApiError::invalid_input("at least one order is required"),
    }
}

pub(crate) fn subscription_to_api(err: SubscriptionError) -> ApiError {
    match err {
        SubscriptionError::Domain(err) => domain_to_api(err),
        SubscriptionError::Repo(err) => repo_to_api(err),
        SubscriptionError::AlreadySubscribed => {
            ApiError::conflict("Email already subscribed", None)
        }
    }
}
