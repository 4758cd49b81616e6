use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::catalog::{RecipeListQuery, RecipeView};
use crate::application::orders::OrderDraft;
use crate::application::pagination::PageRequest;
use crate::domain::entities::{CartItemRecord, UserRecord};
use crate::domain::recipes::{
    DEFAULT_PRICE_MINOR, PRICE_MAX_MINOR, RATING_MAX_TENTHS, RecipeDraft, RecipePatch,
};

use super::error::ApiError;

#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<&UserRecord> for UserResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub user: UserResponse,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipeListParams {
    pub category: Option<Uuid>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<RecipeListParams> for RecipeListQuery {
    fn from(params: RecipeListParams) -> Self {
        Self {
            category_id: params.category,
            search: params.search,
            page: PageRequest::new(params.limit, params.offset),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MyRecipesParams {
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RecipeCreateRequest {
    pub title: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub description: String,
    pub category: Uuid,
    #[serde(default)]
    pub preparation_minutes: Option<i32>,
    #[serde(default)]
    pub cooking_minutes: Option<i32>,
    /// Stars out of 5 with one decimal.
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub process: Option<String>,
    /// Major currency units with two decimals.
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub is_public: bool,
}

impl RecipeCreateRequest {
    pub fn into_draft(self) -> Result<RecipeDraft, ApiError> {
        Ok(RecipeDraft {
            title: self.title,
            image_url: self.image_url,
            description: self.description,
            category_id: self.category,
            preparation_minutes: self.preparation_minutes,
            cooking_minutes: self.cooking_minutes,
            rating_tenths: self.rating.map(rating_to_tenths).transpose()?,
            process: self.process.unwrap_or_default(),
            price_minor: match self.price {
                Some(price) => price_to_minor(price)?,
                None => DEFAULT_PRICE_MINOR,
            },
            is_public: self.is_public,
        })
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RecipeUpdateRequest {
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub category: Option<Uuid>,
    pub preparation_minutes: Option<i32>,
    pub cooking_minutes: Option<i32>,
    pub rating: Option<f64>,
    pub process: Option<String>,
    pub price: Option<f64>,
    pub is_public: Option<bool>,
}

impl RecipeUpdateRequest {
    pub fn into_patch(self) -> Result<RecipePatch, ApiError> {
        Ok(RecipePatch {
            title: self.title,
            image_url: self.image_url,
            description: self.description,
            category_id: self.category,
            preparation_minutes: self.preparation_minutes,
            cooking_minutes: self.cooking_minutes,
            rating_tenths: self.rating.map(rating_to_tenths).transpose()?,
            process: self.process,
            price_minor: self.price.map(price_to_minor).transpose()?,
            is_public: self.is_public,
        })
    }
}

fn price_to_minor(price: f64) -> Result<i64, ApiError> {
    let minor = (price * 100.0).round();
    if !minor.is_finite() || minor < 0.0 || minor > PRICE_MAX_MINOR as f64 {
        return Err(ApiError::invalid_input(
            "price must be between 0.00 and 99999.99",
        ));
    }
    Ok(minor as i64)
}

fn rating_to_tenths(rating: f64) -> Result<i16, ApiError> {
    let tenths = (rating * 10.0).round();
    if !tenths.is_finite() || tenths < 0.0 || tenths > f64::from(RATING_MAX_TENTHS) {
        return Err(ApiError::invalid_input("rating must be between 0.0 and 5.0"));
    }
    Ok(tenths as i16)
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CartAddRequest {
    pub recipe: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CartItemResponse {
    pub id: Uuid,
    pub recipe: RecipeView,
}

impl From<&CartItemRecord> for CartItemResponse {
    fn from(item: &CartItemRecord) -> Self {
        Self {
            id: item.id,
            recipe: RecipeView::from(&item.recipe),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct ClearedResponse {
    pub removed: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrderRequest {
    pub recipe: Uuid,
    pub payment_id: String,
}

impl From<OrderRequest> for OrderDraft {
    fn from(request: OrderRequest) -> Self {
        Self {
            recipe_id: request.recipe,
            payment_id: request.payment_id,
        }
    }
}

/// `POST /orders` accepts a single order object or an array of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OrdersPayload {
    Many(Vec<OrderRequest>),
    One(OrderRequest),
}

#[derive(Debug, Serialize)]
pub struct HasPurchasedResponse {
    pub has_purchased: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreatePaymentOrderRequest {
    /// Whole currency units.
    pub amount: i64,
}

#[derive(Debug, Serialize)]
pub struct PaymentOrderResponse {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SubscribeRequest {
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_inputs_round_to_minor_units() {
        assert_eq!(price_to_minor(100.0).unwrap(), 10_000);
        assert_eq!(price_to_minor(19.99).unwrap(), 1_999);
        assert_eq!(price_to_minor(99_999.99).unwrap(), PRICE_MAX_MINOR);
        assert!(price_to_minor(-1.0).is_err());
        assert!(price_to_minor(100_000.0).is_err());
        assert!(price_to_minor(f64::NAN).is_err());
    }

    #[test]
    fn rating_inputs_round_to_tenths() {
        assert_eq!(rating_to_tenths(4.5).unwrap(), 45);
        assert_eq!(rating_to_tenths(0.0).unwrap(), 0);
        assert!(rating_to_tenths(5.1).is_err());
    }

    #[test]
    fn orders_payload_accepts_object_or_array() {
        let recipe = Uuid::new_v4();
        let one: OrdersPayload = serde_json::from_value(serde_json::json!({
            "recipe": recipe,
            "payment_id": "pay_1"
        }))
        .expect("single");
        assert!(matches!(one, OrdersPayload::One(_)));

        let many: OrdersPayload = serde_json::from_value(serde_json::json!([
            { "recipe": recipe, "payment_id": "pay_1" },
            { "recipe": recipe, "payment_id": "pay_2" }
        ]))
        .expect("array");
        match many {
            OrdersPayload::Many(items) => assert_eq!(items.len(), 2),
            OrdersPayload::One(_) => panic!("expected array"),
        }
    }

    #[test]
    fn create_request_defaults_price() {
        let request: RecipeCreateRequest = serde_json::from_value(serde_json::json!({
            "title": "Lemon Tart",
            "description": "Sharp and sweet",
            "category": Uuid::new_v4()
        }))
        .expect("request");
        let draft = request.into_draft().expect("draft");
        assert_eq!(draft.price_minor, DEFAULT_PRICE_MINOR);
        assert!(!draft.is_public);
        assert_eq!(draft.process, "");
    }
}
