//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRecord {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeRecord {
    pub id: Uuid,
    pub title: String,
    pub image_url: Option<String>,
    pub description: String,
    pub category_id: Uuid,
    pub category_name: String,
    pub preparation_minutes: Option<i32>,
    pub cooking_minutes: Option<i32>,
    /// Average rating in tenths of a star (`45` is 4.5).
    pub rating_tenths: Option<i16>,
    pub process: String,
    pub owner_id: Uuid,
    pub owner_username: String,
    /// Price in minor currency units.
    pub price_minor: i64,
    pub is_public: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl RecipeRecord {
    /// Public recipes are visible to anyone; private ones only to their owner.
    pub fn is_visible_to(&self, viewer: Option<Uuid>) -> bool {
        self.is_public || viewer == Some(self.owner_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItemRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub recipe: RecipeRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub recipe_id: Uuid,
    pub payment_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchasedRecipeRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub recipe_id: Uuid,
    pub payment_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionRecord {
    pub id: Uuid,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub subscribed_at: OffsetDateTime,
}
