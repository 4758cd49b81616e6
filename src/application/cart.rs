use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::{CartRepo, RecipesRepo, RepoError};
use crate::domain::entities::CartItemRecord;

#[derive(Debug, Error)]
pub enum CartError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("cart item not found")]
    ItemNotFound,
    #[error("recipe `{0}` does not exist")]
    UnknownRecipe(Uuid),
}

#[derive(Clone)]
pub struct CartService {
    cart: Arc<dyn CartRepo>,
    recipes: Arc<dyn RecipesRepo>,
}

impl CartService {
    pub fn new(cart: Arc<dyn CartRepo>, recipes: Arc<dyn RecipesRepo>) -> Self {
        Self { cart, recipes }
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<CartItemRecord>, CartError> {
        self.cart.list_items(user_id).await.map_err(CartError::from)
    }

    pub async fn add(&self, user_id: Uuid, recipe_id: Uuid) -> Result<CartItemRecord, CartError> {
        let visible = self
            .recipes
            .find_recipe(recipe_id)
            .await?
            .is_some_and(|recipe| recipe.is_visible_to(Some(user_id)));
        if !visible {
            return Err(CartError::UnknownRecipe(recipe_id));
        }
        self.cart
            .add_item(user_id, recipe_id)
            .await
            .map_err(CartError::from)
    }

    /// Only items in the caller's own cart can be removed.
    pub async fn remove(&self, user_id: Uuid, item_id: Uuid) -> Result<(), CartError> {
        if self.cart.remove_item(user_id, item_id).await? {
            Ok(())
        } else {
            Err(CartError::ItemNotFound)
        }
    }

    pub async fn clear(&self, user_id: Uuid) -> Result<u64, CartError> {
        self.cart.clear(user_id).await.map_err(CartError::from)
    }

    pub async fn count(&self, user_id: Uuid) -> Result<u64, CartError> {
        self.cart.count(user_id).await.map_err(CartError::from)
    }
}
