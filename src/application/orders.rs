//! Orders, purchase grants and checkout.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::accounts::Principal;
use crate::application::catalog::format_minor;
use crate::application::notifications::{Notification, Notifier};
use crate::application::payments::{
    PaymentError, PaymentGateway, PaymentOrder, PaymentOrderRequest,
};
use crate::application::repos::{CreateOrderParams, OrdersRepo, RecipesRepo, RepoError};
use crate::domain::entities::{OrderRecord, RecipeRecord};
use crate::domain::error::DomainError;
use crate::domain::orders::validate_payment_id;

const MINOR_UNITS_PER_MAJOR: i64 = 100;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error("recipe `{0}` does not exist")]
    UnknownRecipe(Uuid),
    #[error("no orders supplied")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub recipe_id: Uuid,
    pub payment_id: String,
}

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrdersRepo>,
    recipes: Arc<dyn RecipesRepo>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    currency: String,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrdersRepo>,
        recipes: Arc<dyn RecipesRepo>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            orders,
            recipes,
            gateway,
            notifier,
            currency: currency.into(),
        }
    }

    /// Record one order per draft and grant access to each recipe.
    ///
    /// Every draft is validated before anything is written. Granting is
    /// idempotent: buying a recipe twice keeps the first payment id on the
    /// grant while both orders are recorded.
    pub async fn place_orders(
        &self,
        buyer: &Principal,
        drafts: Vec<OrderDraft>,
    ) -> Result<Vec<OrderRecord>, OrderError> {
        if drafts.is_empty() {
            return Err(OrderError::Empty);
        }

        let mut recipes: HashMap<Uuid, RecipeRecord> = HashMap::new();
        let mut validated = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let payment_id = validate_payment_id(&draft.payment_id)?;
            if !recipes.contains_key(&draft.recipe_id) {
                let recipe = self
                    .recipes
                    .find_recipe(draft.recipe_id)
                    .await?
                    .filter(|recipe| recipe.is_visible_to(Some(buyer.user_id)))
                    .ok_or(OrderError::UnknownRecipe(draft.recipe_id))?;
                recipes.insert(recipe.id, recipe);
            }
            validated.push((draft.recipe_id, payment_id));
        }

        let mut placed = Vec::with_capacity(validated.len());
        for (recipe_id, payment_id) in validated {
            let order = self
                .orders
                .create_order(CreateOrderParams {
                    user_id: buyer.user_id,
                    recipe_id,
                    payment_id: payment_id.clone(),
                })
                .await?;
            self.orders
                .grant_purchase(buyer.user_id, recipe_id, &payment_id)
                .await?;

            if let Some(recipe) = recipes.get(&recipe_id) {
                self.notifier.notify(Notification::Purchase {
                    recipient: buyer.email.clone(),
                    recipe_title: recipe.title.clone(),
                    price: format_minor(recipe.price_minor),
                    payment_id: order.payment_id.clone(),
                });
            }

            info!(
                target = "larder::orders",
                order_id = %order.id,
                recipe_id = %recipe_id,
                buyer = %buyer.username,
                "Order placed"
            );
            placed.push(order);
        }

        Ok(placed)
    }

    pub async fn purchased_recipes(&self, user_id: Uuid) -> Result<Vec<RecipeRecord>, OrderError> {
        let ids = self.orders.list_purchased_recipe_ids(user_id).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let recipes = self.recipes.find_recipes_by_ids(&ids).await?;
        Ok(recipes
            .into_iter()
            .filter(|recipe| recipe.is_visible_to(Some(user_id)))
            .collect())
    }

    pub async fn has_purchased(&self, user_id: Uuid, recipe_id: Uuid) -> Result<bool, OrderError> {
        self.orders
            .has_order(user_id, recipe_id)
            .await
            .map_err(OrderError::from)
    }

    /// Open a captured order at the payment gateway for `amount_major` whole
    /// currency units.
    pub async fn create_payment_order(&self, amount_major: i64) -> Result<PaymentOrder, OrderError> {
        if amount_major <= 0 {
            return Err(DomainError::validation("amount", "must be greater than zero").into());
        }
        let amount = amount_major
            .checked_mul(MINOR_UNITS_PER_MAJOR)
            .ok_or_else(|| DomainError::validation("amount", "is too large"))?;

        let order = self
            .gateway
            .create_order(PaymentOrderRequest {
                amount,
                currency: self.currency.clone(),
                payment_capture: 1,
            })
            .await?;

        info!(
            target = "larder::payments",
            gateway_order_id = %order.id,
            amount,
            currency = %order.currency,
            "Payment order created"
        );
        Ok(order)
    }
}
