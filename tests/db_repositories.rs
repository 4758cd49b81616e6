//! Postgres repository coverage.
//!
//! Needs `DATABASE_URL` pointing at a server where `sqlx::test` may create
//! scratch databases, so the tests are ignored by default.

use std::collections::HashSet;

use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use larder::application::pagination::PageRequest;
use larder::application::repos::{
    CartRepo, CreateOrderParams, CreateTokenParams, CreateUserParams, OrdersRepo,
    RecipeQueryFilter, RecipeScope, RecipesRepo, RecipesWriteRepo, RepoError, SubscriptionsRepo,
    UsersRepo,
};
use larder::domain::entities::UserRecord;
use larder::domain::recipes::RecipeDraft;
use larder::infra::db::PostgresRepositories;

async fn seed_category(pool: &PgPool, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO categories (id, name) VALUES ($1, $2)")
        .bind(id)
        .bind(name)
        .execute(pool)
        .await
        .expect("insert category");
    id
}

async fn seed_user(repos: &PostgresRepositories, username: &str) -> UserRecord {
    repos
        .create_user(CreateUserParams {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "not-a-real-hash".to_string(),
        })
        .await
        .expect("create user")
}

fn draft(category_id: Uuid, title: &str, is_public: bool) -> RecipeDraft {
    RecipeDraft {
        title: title.to_string(),
        image_url: None,
        description: format!("{title}, step by step"),
        category_id,
        preparation_minutes: Some(10),
        cooking_minutes: Some(20),
        rating_tenths: Some(45),
        process: String::new(),
        price_minor: 1_250,
        is_public,
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn listing_indexes_exist(pool: PgPool) {
    let rows: Vec<String> = sqlx::query_scalar(
        "SELECT indexname FROM pg_indexes WHERE schemaname = 'public' AND tablename = 'recipes'",
    )
    .fetch_all(&pool)
    .await
    .expect("fetch recipe indexes");

    let indexes: HashSet<String> = rows.into_iter().collect();
    assert!(indexes.contains("recipes_owner_created_idx"));
    assert!(indexes.contains("recipes_public_created_idx"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn usernames_are_unique(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    seed_user(&repos, "alice").await;

    let err = repos
        .create_user(CreateUserParams {
            username: "alice".to_string(),
            email: "second@example.com".to_string(),
            password_hash: "x".to_string(),
        })
        .await
        .expect_err("duplicate username");
    assert!(matches!(err, RepoError::Duplicate { .. }), "{err:?}");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn tokens_are_found_by_prefix(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let alice = seed_user(&repos, "alice").await;
    let expires_at = OffsetDateTime::now_utc() + Duration::hours(1);

    repos
        .create_token(CreateTokenParams {
            user_id: alice.id,
            prefix: "abc123def456".to_string(),
            hashed_secret: vec![1, 2, 3],
            expires_at,
        })
        .await
        .expect("create token");

    let token = repos
        .find_token_by_prefix("abc123def456")
        .await
        .expect("lookup")
        .expect("token exists");
    assert_eq!(token.user_id, alice.id);
    assert_eq!(token.hashed_secret, vec![1, 2, 3]);
    assert!(
        repos
            .find_token_by_prefix("missing")
            .await
            .expect("lookup")
            .is_none()
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn listings_are_scoped_filtered_and_newest_first(pool: PgPool) {
    let desserts = seed_category(&pool, "Desserts").await;
    let mains = seed_category(&pool, "Mains").await;
    let repos = PostgresRepositories::new(pool);
    let alice = seed_user(&repos, "alice").await;
    let bob = seed_user(&repos, "bob").await;

    repos
        .create_recipe(alice.id, draft(desserts, "Lemon tart", true))
        .await
        .expect("create");
    repos
        .create_recipe(alice.id, draft(desserts, "100% cocoa_cake", false))
        .await
        .expect("create");
    repos
        .create_recipe(bob.id, draft(mains, "Ragu", true))
        .await
        .expect("create");

    let mut mine = RecipeQueryFilter::new(RecipeScope::Owner(alice.id));
    let page = PageRequest::default();
    let titles: Vec<String> = repos
        .list_recipes(&mine, page)
        .await
        .expect("list")
        .into_iter()
        .map(|recipe| recipe.title)
        .collect();
    assert_eq!(titles, vec!["100% cocoa_cake", "Lemon tart"]);

    mine.search = Some("%".to_string());
    assert_eq!(repos.count_recipes(&mine).await.expect("count"), 1);
    mine.search = Some("LEMON".to_string());
    assert_eq!(repos.count_recipes(&mine).await.expect("count"), 1);

    let mut public = RecipeQueryFilter::new(RecipeScope::Public);
    assert_eq!(repos.count_recipes(&public).await.expect("count"), 2);
    public.category_id = Some(mains);
    let listed = repos.list_recipes(&public, page).await.expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].owner_username, "bob");
    assert_eq!(listed[0].category_name, "Mains");

    let second = PageRequest::new(Some(1), Some(1));
    let only_alice = RecipeQueryFilter::new(RecipeScope::Owner(alice.id));
    let tail = repos
        .list_recipes(&only_alice, second)
        .await
        .expect("list");
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].title, "Lemon tart");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn recipes_update_and_delete(pool: PgPool) {
    let desserts = seed_category(&pool, "Desserts").await;
    let mains = seed_category(&pool, "Mains").await;
    let repos = PostgresRepositories::new(pool);
    let alice = seed_user(&repos, "alice").await;

    let created = repos
        .create_recipe(alice.id, draft(desserts, "Tart", false))
        .await
        .expect("create");
    assert_eq!(created.owner_username, "alice");

    let updated = repos
        .update_recipe(created.id, draft(mains, "Pie", true))
        .await
        .expect("update");
    assert_eq!(updated.title, "Pie");
    assert_eq!(updated.category_name, "Mains");
    assert!(updated.is_public);

    repos.delete_recipe(created.id).await.expect("delete");
    assert!(
        repos
            .find_recipe(created.id)
            .await
            .expect("find")
            .is_none()
    );
    assert!(matches!(
        repos.delete_recipe(created.id).await,
        Err(RepoError::NotFound)
    ));
    assert!(matches!(
        repos.update_recipe(created.id, draft(mains, "Gone", false)).await,
        Err(RepoError::NotFound)
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn cart_items_belong_to_their_user(pool: PgPool) {
    let mains = seed_category(&pool, "Mains").await;
    let repos = PostgresRepositories::new(pool);
    let alice = seed_user(&repos, "alice").await;
    let bob = seed_user(&repos, "bob").await;
    let recipe = repos
        .create_recipe(alice.id, draft(mains, "Dal", true))
        .await
        .expect("create");

    let item = repos.add_item(bob.id, recipe.id).await.expect("add");
    assert_eq!(item.recipe.title, "Dal");
    repos.add_item(bob.id, recipe.id).await.expect("add again");
    assert_eq!(repos.count(bob.id).await.expect("count"), 2);

    assert!(!repos.remove_item(alice.id, item.id).await.expect("remove"));
    assert!(repos.remove_item(bob.id, item.id).await.expect("remove"));
    assert_eq!(repos.list_items(bob.id).await.expect("list").len(), 1);
    assert_eq!(repos.clear(bob.id).await.expect("clear"), 1);
    assert_eq!(repos.count(bob.id).await.expect("count"), 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn purchase_grants_keep_the_first_payment(pool: PgPool) {
    let mains = seed_category(&pool, "Mains").await;
    let repos = PostgresRepositories::new(pool);
    let alice = seed_user(&repos, "alice").await;
    let bob = seed_user(&repos, "bob").await;
    let recipe = repos
        .create_recipe(alice.id, draft(mains, "Dal", true))
        .await
        .expect("create");

    assert!(!repos.has_order(bob.id, recipe.id).await.expect("has order"));

    for payment_id in ["pay_001", "pay_002"] {
        repos
            .create_order(CreateOrderParams {
                user_id: bob.id,
                recipe_id: recipe.id,
                payment_id: payment_id.to_string(),
            })
            .await
            .expect("order");
    }
    let first = repos
        .grant_purchase(bob.id, recipe.id, "pay_001")
        .await
        .expect("grant");
    let second = repos
        .grant_purchase(bob.id, recipe.id, "pay_002")
        .await
        .expect("grant again");

    assert_eq!(first.id, second.id);
    assert_eq!(second.payment_id, "pay_001");
    assert!(repos.has_order(bob.id, recipe.id).await.expect("has order"));
    assert_eq!(
        repos
            .list_purchased_recipe_ids(bob.id)
            .await
            .expect("purchased"),
        vec![recipe.id]
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn subscriptions_are_unique_by_email(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    repos
        .create_subscription("reader@example.com")
        .await
        .expect("subscribe");
    let err = repos
        .create_subscription("reader@example.com")
        .await
        .expect_err("duplicate");
    assert!(matches!(err, RepoError::Duplicate { .. }), "{err:?}");
}
