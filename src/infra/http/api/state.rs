use std::sync::Arc;

use crate::application::accounts::AccountService;
use crate::application::cart::CartService;
use crate::application::catalog::CatalogService;
use crate::application::orders::OrderService;
use crate::application::repos::HealthRepo;
use crate::application::subscriptions::SubscriptionService;

#[derive(Clone)]
pub struct ApiState {
    pub accounts: Arc<AccountService>,
    pub catalog: Arc<CatalogService>,
    pub cart: Arc<CartService>,
    pub orders: Arc<OrderService>,
    pub subscriptions: Arc<SubscriptionService>,
    pub health: Arc<dyn HealthRepo>,
}
