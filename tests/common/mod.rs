#![allow(dead_code)]

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use argon2::Params;
use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use bytes::Bytes;
use serde_json::Value;
use time::OffsetDateTime;
use time::macros::datetime;
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

use larder::application::accounts::AccountService;
use larder::application::cart::CartService;
use larder::application::catalog::CatalogService;
use larder::application::notifications::RecordingNotifier;
use larder::application::orders::OrderService;
use larder::application::pagination::PageRequest;
use larder::application::payments::{
    PaymentError, PaymentGateway, PaymentOrder, PaymentOrderRequest,
};
use larder::application::repos::{
    CartRepo, CategoriesRepo, CreateOrderParams, CreateTokenParams, CreateUserParams, HealthRepo,
    OrdersRepo, RecipeQueryFilter, RecipeScope, RecipesRepo, RecipesWriteRepo, RepoError,
    SubscriptionsRepo, UsersRepo,
};
use larder::application::subscriptions::SubscriptionService;
use larder::cache::{CacheStore, MemoryStore, ResultCacheGate, StoreError};
use larder::domain::entities::{
    AccessTokenRecord, CartItemRecord, CategoryRecord, OrderRecord, PurchasedRecipeRecord,
    RecipeRecord, SubscriptionRecord, UserRecord,
};
use larder::domain::recipes::RecipeDraft;
use larder::infra::http::{ApiState, build_router};

pub const PASSWORD: &str = "correct-horse-battery";
pub const CURRENCY: &str = "INR";

const EPOCH: OffsetDateTime = datetime!(2026-01-01 00:00 UTC);

#[derive(Default)]
struct Tables {
    users: Vec<UserRecord>,
    tokens: Vec<AccessTokenRecord>,
    categories: Vec<CategoryRecord>,
    recipes: Vec<RecipeRecord>,
    cart: Vec<(Uuid, Uuid, Uuid)>,
    orders: Vec<OrderRecord>,
    purchases: Vec<PurchasedRecipeRecord>,
    subscriptions: Vec<SubscriptionRecord>,
    tick: i64,
}

impl Tables {
    /// Strictly increasing timestamps keep "newest first" deterministic.
    fn next_timestamp(&mut self) -> OffsetDateTime {
        self.tick += 1;
        EPOCH + time::Duration::seconds(self.tick)
    }

    fn category_name(&self, id: Uuid) -> Result<String, RepoError> {
        self.categories
            .iter()
            .find(|category| category.id == id)
            .map(|category| category.name.clone())
            .ok_or_else(|| RepoError::Integrity {
                message: format!("category {id} does not exist"),
            })
    }

    fn username(&self, id: Uuid) -> Result<String, RepoError> {
        self.users
            .iter()
            .find(|user| user.id == id)
            .map(|user| user.username.clone())
            .ok_or_else(|| RepoError::Integrity {
                message: format!("user {id} does not exist"),
            })
    }

    fn recipe(&self, id: Uuid) -> Option<&RecipeRecord> {
        self.recipes.iter().find(|recipe| recipe.id == id)
    }

    fn matching(&self, filter: &RecipeQueryFilter) -> Vec<RecipeRecord> {
        let needle = filter.search.as_ref().map(|s| s.to_lowercase());
        let mut recipes: Vec<RecipeRecord> = self
            .recipes
            .iter()
            .filter(|recipe| match filter.scope {
                RecipeScope::Owner(owner) => recipe.owner_id == owner,
                RecipeScope::Public => recipe.is_public,
            })
            .filter(|recipe| filter.category_id.is_none_or(|id| recipe.category_id == id))
            .filter(|recipe| {
                needle
                    .as_ref()
                    .is_none_or(|needle| recipe.title.to_lowercase().contains(needle))
            })
            .cloned()
            .collect();
        recipes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        recipes
    }
}

/// Every repository trait over one set of in-memory tables.
#[derive(Default)]
pub struct InMemoryRepos {
    tables: Mutex<Tables>,
    list_calls: AtomicUsize,
    unhealthy: AtomicBool,
}

impl InMemoryRepos {
    /// Number of times a listing page was read from storage.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn set_unhealthy(&self) {
        self.unhealthy.store(true, Ordering::SeqCst);
    }

    pub async fn seed_category(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().await.categories.push(CategoryRecord {
            id,
            name: name.to_string(),
        });
        id
    }

    pub async fn expire_tokens(&self) {
        let mut tables = self.tables.lock().await;
        for token in tables.tokens.iter_mut() {
            token.expires_at = EPOCH;
        }
    }
}

#[async_trait]
impl UsersRepo for InMemoryRepos {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if tables
            .users
            .iter()
            .any(|user| user.username == params.username)
        {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        let created_at = tables.next_timestamp();
        let user = UserRecord {
            id: Uuid::new_v4(),
            username: params.username,
            email: params.email,
            password_hash: params.password_hash,
            created_at,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|user| user.id == id).cloned())
    }

    async fn create_token(
        &self,
        params: CreateTokenParams,
    ) -> Result<AccessTokenRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let created_at = tables.next_timestamp();
        let token = AccessTokenRecord {
            id: Uuid::new_v4(),
            user_id: params.user_id,
            prefix: params.prefix,
            hashed_secret: params.hashed_secret,
            expires_at: params.expires_at,
            created_at,
        };
        tables.tokens.push(token.clone());
        Ok(token)
    }

    async fn find_token_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<AccessTokenRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .tokens
            .iter()
            .find(|token| token.prefix == prefix)
            .cloned())
    }
}

#[async_trait]
impl CategoriesRepo for InMemoryRepos {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        let mut categories = self.tables.lock().await.categories.clone();
        categories.sort_by_key(|category| category.name.to_lowercase());
        Ok(categories)
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .categories
            .iter()
            .find(|category| category.id == id)
            .cloned())
    }
}

#[async_trait]
impl RecipesRepo for InMemoryRepos {
    async fn list_recipes(
        &self,
        filter: &RecipeQueryFilter,
        page: PageRequest,
    ) -> Result<Vec<RecipeRecord>, RepoError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().await;
        Ok(tables
            .matching(filter)
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn count_recipes(&self, filter: &RecipeQueryFilter) -> Result<u64, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.matching(filter).len() as u64)
    }

    async fn find_recipe(&self, id: Uuid) -> Result<Option<RecipeRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.recipe(id).cloned())
    }

    async fn find_recipes_by_ids(&self, ids: &[Uuid]) -> Result<Vec<RecipeRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .recipes
            .iter()
            .filter(|recipe| ids.contains(&recipe.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RecipesWriteRepo for InMemoryRepos {
    async fn create_recipe(
        &self,
        owner_id: Uuid,
        draft: RecipeDraft,
    ) -> Result<RecipeRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let category_name = tables.category_name(draft.category_id)?;
        let owner_username = tables.username(owner_id)?;
        let created_at = tables.next_timestamp();
        let recipe = RecipeRecord {
            id: Uuid::new_v4(),
            title: draft.title,
            image_url: draft.image_url,
            description: draft.description,
            category_id: draft.category_id,
            category_name,
            preparation_minutes: draft.preparation_minutes,
            cooking_minutes: draft.cooking_minutes,
            rating_tenths: draft.rating_tenths,
            process: draft.process,
            owner_id,
            owner_username,
            price_minor: draft.price_minor,
            is_public: draft.is_public,
            created_at,
            updated_at: created_at,
        };
        tables.recipes.push(recipe.clone());
        Ok(recipe)
    }

    async fn update_recipe(&self, id: Uuid, draft: RecipeDraft) -> Result<RecipeRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let category_name = tables.category_name(draft.category_id)?;
        let updated_at = tables.next_timestamp();
        let recipe = tables
            .recipes
            .iter_mut()
            .find(|recipe| recipe.id == id)
            .ok_or(RepoError::NotFound)?;

        recipe.title = draft.title;
        recipe.image_url = draft.image_url;
        recipe.description = draft.description;
        recipe.category_id = draft.category_id;
        recipe.category_name = category_name;
        recipe.preparation_minutes = draft.preparation_minutes;
        recipe.cooking_minutes = draft.cooking_minutes;
        recipe.rating_tenths = draft.rating_tenths;
        recipe.process = draft.process;
        recipe.price_minor = draft.price_minor;
        recipe.is_public = draft.is_public;
        recipe.updated_at = updated_at;
        Ok(recipe.clone())
    }

    async fn delete_recipe(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().await;
        let before = tables.recipes.len();
        tables.recipes.retain(|recipe| recipe.id != id);
        if tables.recipes.len() == before {
            return Err(RepoError::NotFound);
        }
        tables.cart.retain(|(_, _, recipe_id)| *recipe_id != id);
        Ok(())
    }
}

#[async_trait]
impl CartRepo for InMemoryRepos {
    async fn list_items(&self, user_id: Uuid) -> Result<Vec<CartItemRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .cart
            .iter()
            .filter(|(_, owner, _)| *owner == user_id)
            .filter_map(|(id, owner, recipe_id)| {
                tables.recipe(*recipe_id).map(|recipe| CartItemRecord {
                    id: *id,
                    user_id: *owner,
                    recipe: recipe.clone(),
                })
            })
            .collect())
    }

    async fn add_item(&self, user_id: Uuid, recipe_id: Uuid) -> Result<CartItemRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let recipe = tables
            .recipe(recipe_id)
            .cloned()
            .ok_or_else(|| RepoError::InvalidInput {
                message: format!("recipe {recipe_id} does not exist"),
            })?;
        let id = Uuid::new_v4();
        tables.cart.push((id, user_id, recipe_id));
        Ok(CartItemRecord {
            id,
            user_id,
            recipe,
        })
    }

    async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool, RepoError> {
        let mut tables = self.tables.lock().await;
        let before = tables.cart.len();
        tables
            .cart
            .retain(|(id, owner, _)| !(*id == item_id && *owner == user_id));
        Ok(tables.cart.len() != before)
    }

    async fn clear(&self, user_id: Uuid) -> Result<u64, RepoError> {
        let mut tables = self.tables.lock().await;
        let before = tables.cart.len();
        tables.cart.retain(|(_, owner, _)| *owner != user_id);
        Ok((before - tables.cart.len()) as u64)
    }

    async fn count(&self, user_id: Uuid) -> Result<u64, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .cart
            .iter()
            .filter(|(_, owner, _)| *owner == user_id)
            .count() as u64)
    }
}

#[async_trait]
impl OrdersRepo for InMemoryRepos {
    async fn create_order(&self, params: CreateOrderParams) -> Result<OrderRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let created_at = tables.next_timestamp();
        let order = OrderRecord {
            id: Uuid::new_v4(),
            user_id: params.user_id,
            recipe_id: params.recipe_id,
            payment_id: params.payment_id,
            created_at,
        };
        tables.orders.push(order.clone());
        Ok(order)
    }

    async fn grant_purchase(
        &self,
        user_id: Uuid,
        recipe_id: Uuid,
        payment_id: &str,
    ) -> Result<PurchasedRecipeRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables
            .purchases
            .iter()
            .find(|grant| grant.user_id == user_id && grant.recipe_id == recipe_id)
        {
            return Ok(existing.clone());
        }
        let created_at = tables.next_timestamp();
        let grant = PurchasedRecipeRecord {
            id: Uuid::new_v4(),
            user_id,
            recipe_id,
            payment_id: payment_id.to_string(),
            created_at,
        };
        tables.purchases.push(grant.clone());
        Ok(grant)
    }

    async fn list_purchased_recipe_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .purchases
            .iter()
            .filter(|grant| grant.user_id == user_id)
            .map(|grant| grant.recipe_id)
            .collect())
    }

    async fn has_order(&self, user_id: Uuid, recipe_id: Uuid) -> Result<bool, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .iter()
            .any(|order| order.user_id == user_id && order.recipe_id == recipe_id))
    }
}

#[async_trait]
impl SubscriptionsRepo for InMemoryRepos {
    async fn create_subscription(&self, email: &str) -> Result<SubscriptionRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if tables.subscriptions.iter().any(|sub| sub.email == email) {
            return Err(RepoError::Duplicate {
                constraint: "subscriptions_email_key".to_string(),
            });
        }
        let subscribed_at = tables.next_timestamp();
        let record = SubscriptionRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            subscribed_at,
        };
        tables.subscriptions.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl HealthRepo for InMemoryRepos {
    async fn ping(&self) -> Result<(), RepoError> {
        if self.unhealthy.load(Ordering::SeqCst) {
            Err(RepoError::Persistence("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Accepts every order and remembers what it was asked for.
#[derive(Default)]
pub struct FakeGateway {
    requests: Mutex<Vec<PaymentOrderRequest>>,
}

impl FakeGateway {
    pub async fn requests(&self) -> Vec<PaymentOrderRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(&self, request: PaymentOrderRequest) -> Result<PaymentOrder, PaymentError> {
        let mut requests = self.requests.lock().await;
        requests.push(request.clone());
        Ok(PaymentOrder {
            id: format!("order_test_{}", requests.len()),
            amount: request.amount,
            currency: request.currency,
            status: "created".to_string(),
        })
    }
}

/// A cache store whose backend is unreachable.
pub struct OfflineStore;

#[async_trait]
impl CacheStore for OfflineStore {
    async fn get(&self, _key: &str) -> Result<Option<Bytes>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _payload: Bytes, _ttl: Duration) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn delete_matching(&self, _pattern: &str) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub repos: Arc<InMemoryRepos>,
    pub store: Arc<dyn CacheStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub gateway: Arc<FakeGateway>,
}

pub fn spawn_app() -> TestApp {
    spawn_app_with_store(Arc::new(MemoryStore::new(
        NonZeroUsize::new(256).expect("non-zero capacity"),
    )))
}

pub fn spawn_app_with_store(store: Arc<dyn CacheStore>) -> TestApp {
    let repos = Arc::new(InMemoryRepos::default());
    let notifier = Arc::new(RecordingNotifier::new());
    let gateway = Arc::new(FakeGateway::default());
    let gate = ResultCacheGate::new(store.clone(), Duration::from_secs(300));

    let accounts = AccountService::new(repos.clone(), Duration::from_secs(3600))
        .with_password_params(Params::new(1024, 1, 1, None).expect("argon2 params"));
    let catalog = CatalogService::new(
        repos.clone(),
        repos.clone(),
        repos.clone(),
        gate,
        notifier.clone(),
    );
    let cart = CartService::new(repos.clone(), repos.clone());
    let orders = OrderService::new(
        repos.clone(),
        repos.clone(),
        gateway.clone(),
        notifier.clone(),
        CURRENCY,
    );
    let subscriptions = SubscriptionService::new(repos.clone(), notifier.clone());

    let state = ApiState {
        accounts: Arc::new(accounts),
        catalog: Arc::new(catalog),
        cart: Arc::new(cart),
        orders: Arc::new(orders),
        subscriptions: Arc::new(subscriptions),
        health: repos.clone(),
    };

    TestApp {
        router: build_router(state),
        repos,
        store,
        notifier,
        gateway,
    }
}

impl TestApp {
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    /// Register `username` and log in, returning the bearer token and user id.
    pub async fn sign_up(&self, username: &str) -> (String, Uuid) {
        let (status, _) = self
            .post(
                "/api/v1/register",
                None,
                serde_json::json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {username}");

        let (status, body) = self
            .post(
                "/api/v1/login",
                None,
                serde_json::json!({ "username": username, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login {username}");

        let token = body["token"].as_str().expect("token").to_string();
        let user_id = body["user"]["id"]
            .as_str()
            .and_then(|id| Uuid::parse_str(id).ok())
            .expect("user id");
        (token, user_id)
    }

    /// Create a recipe through the API and return its id.
    pub async fn create_recipe(
        &self,
        token: &str,
        category: Uuid,
        title: &str,
        is_public: bool,
    ) -> Uuid {
        let (status, body) = self
            .post(
                "/api/v1/recipes",
                Some(token),
                serde_json::json!({
                    "title": title,
                    "description": format!("{title}, step by step"),
                    "category": category,
                    "price": 12.5,
                    "rating": 4.5,
                    "is_public": is_public,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create {title}: {body}");
        body["id"]
            .as_str()
            .and_then(|id| Uuid::parse_str(id).ok())
            .expect("recipe id")
    }
}

/// Titles of a listing page, in order.
pub fn titles(page: &Value) -> Vec<String> {
    page["results"]
        .as_array()
        .expect("results array")
        .iter()
        .filter_map(|recipe| recipe["title"].as_str().map(str::to_string))
        .collect()
}
