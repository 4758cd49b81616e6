pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};

use crate::infra::http::middleware::{log_responses, set_request_context};

pub fn build_router(state: ApiState) -> Router {
    let auth_state = state.clone();

    Router::new()
        .route("/api/v1/register", post(handlers::register))
        .route("/api/v1/login", post(handlers::login))
        .route(
            "/api/v1/recipes",
            get(handlers::list_recipes).post(handlers::create_recipe),
        )
        .route("/api/v1/my-recipes", get(handlers::list_my_recipes))
        .route(
            "/api/v1/recipes/{id}",
            get(handlers::get_recipe)
                .patch(handlers::update_recipe)
                .delete(handlers::delete_recipe),
        )
        .route("/api/v1/categories", get(handlers::list_categories))
        .route("/api/v1/subscribe", post(handlers::subscribe))
        .route(
            "/api/v1/cart",
            get(handlers::list_cart).post(handlers::add_to_cart),
        )
        .route("/api/v1/cart/clear", delete(handlers::clear_cart))
        .route("/api/v1/cart/count", get(handlers::cart_count))
        .route("/api/v1/cart/{id}", delete(handlers::remove_from_cart))
        .route("/api/v1/orders", post(handlers::place_orders))
        .route("/api/v1/purchased-recipes", get(handlers::purchased_recipes))
        .route(
            "/api/v1/has-purchased/{recipe_id}",
            get(handlers::has_purchased),
        )
        .route(
            "/api/v1/create-payment-order",
            post(handlers::create_payment_order),
        )
        .route("/api/v1/health", get(handlers::health))
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(
            auth_state,
            middleware::authenticate,
        ))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
