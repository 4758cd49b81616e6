//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::domain::entities::{
    AccessTokenRecord, CartItemRecord, CategoryRecord, OrderRecord, PurchasedRecipeRecord,
    RecipeRecord, SubscriptionRecord, UserRecord,
};
use crate::domain::recipes::RecipeDraft;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which recipes a listing may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeScope {
    /// Every recipe created by one user, public or not.
    Owner(Uuid),
    /// Recipes flagged public.
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeQueryFilter {
    pub scope: RecipeScope,
    pub category_id: Option<Uuid>,
    /// Case-insensitive substring of the title.
    pub search: Option<String>,
}

impl RecipeQueryFilter {
    pub fn new(scope: RecipeScope) -> Self {
        Self {
            scope,
            category_id: None,
            search: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct CreateTokenParams {
    pub user_id: Uuid,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct CreateOrderParams {
    pub user_id: Uuid,
    pub recipe_id: Uuid,
    pub payment_id: String,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;

    async fn create_token(
        &self,
        params: CreateTokenParams,
    ) -> Result<AccessTokenRecord, RepoError>;

    async fn find_token_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<AccessTokenRecord>, RepoError>;
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError>;

    async fn find_category(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError>;
}

#[async_trait]
pub trait RecipesRepo: Send + Sync {
    /// Newest first.
    async fn list_recipes(
        &self,
        filter: &RecipeQueryFilter,
        page: PageRequest,
    ) -> Result<Vec<RecipeRecord>, RepoError>;

    async fn count_recipes(&self, filter: &RecipeQueryFilter) -> Result<u64, RepoError>;

    async fn find_recipe(&self, id: Uuid) -> Result<Option<RecipeRecord>, RepoError>;

    async fn find_recipes_by_ids(&self, ids: &[Uuid]) -> Result<Vec<RecipeRecord>, RepoError>;
}

#[async_trait]
pub trait RecipesWriteRepo: Send + Sync {
    async fn create_recipe(
        &self,
        owner_id: Uuid,
        draft: RecipeDraft,
    ) -> Result<RecipeRecord, RepoError>;

    async fn update_recipe(&self, id: Uuid, draft: RecipeDraft) -> Result<RecipeRecord, RepoError>;

    async fn delete_recipe(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CartRepo: Send + Sync {
    async fn list_items(&self, user_id: Uuid) -> Result<Vec<CartItemRecord>, RepoError>;

    async fn add_item(&self, user_id: Uuid, recipe_id: Uuid) -> Result<CartItemRecord, RepoError>;

    /// Returns false when no item with that id belongs to the user.
    async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool, RepoError>;

    async fn clear(&self, user_id: Uuid) -> Result<u64, RepoError>;

    async fn count(&self, user_id: Uuid) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait OrdersRepo: Send + Sync {
    async fn create_order(&self, params: CreateOrderParams) -> Result<OrderRecord, RepoError>;

    /// Insert the grant unless one already exists for the pair; the existing
    /// grant, with its original payment id, is returned in that case.
    async fn grant_purchase(
        &self,
        user_id: Uuid,
        recipe_id: Uuid,
        payment_id: &str,
    ) -> Result<PurchasedRecipeRecord, RepoError>;

    async fn list_purchased_recipe_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepoError>;

    async fn has_order(&self, user_id: Uuid, recipe_id: Uuid) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait SubscriptionsRepo: Send + Sync {
    async fn create_subscription(&self, email: &str) -> Result<SubscriptionRecord, RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    /// Round-trip to the backing database.
    async fn ping(&self) -> Result<(), RepoError>;
}
