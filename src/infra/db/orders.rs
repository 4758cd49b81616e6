use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{CreateOrderParams, OrdersRepo, RepoError};
use crate::domain::entities::{OrderRecord, PurchasedRecipeRecord};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    recipe_id: Uuid,
    payment_id: String,
    created_at: OffsetDateTime,
}

#[async_trait]
impl OrdersRepo for PostgresRepositories {
    async fn create_order(&self, params: CreateOrderParams) -> Result<OrderRecord, RepoError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            INSERT INTO orders (id, user_id, recipe_id, payment_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, recipe_id, payment_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.user_id)
        .bind(params.recipe_id)
        .bind(params.payment_id)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(OrderRecord {
            id: row.id,
            user_id: row.user_id,
            recipe_id: row.recipe_id,
            payment_id: row.payment_id,
            created_at: row.created_at,
        })
    }

    async fn grant_purchase(
        &self,
        user_id: Uuid,
        recipe_id: Uuid,
        payment_id: &str,
    ) -> Result<PurchasedRecipeRecord, RepoError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            INSERT INTO purchased_recipes (id, user_id, recipe_id, payment_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, recipe_id)
            DO UPDATE SET payment_id = purchased_recipes.payment_id
            RETURNING id, user_id, recipe_id, payment_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(recipe_id)
        .bind(payment_id)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(PurchasedRecipeRecord {
            id: row.id,
            user_id: row.user_id,
            recipe_id: row.recipe_id,
            payment_id: row.payment_id,
            created_at: row.created_at,
        })
    }

    async fn list_purchased_recipe_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        sqlx::query_scalar(
            "SELECT recipe_id FROM purchased_recipes WHERE user_id = $1 ORDER BY created_at, id",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn has_order(&self, user_id: Uuid, recipe_id: Uuid) -> Result<bool, RepoError> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM orders WHERE user_id = $1 AND recipe_id = $2)",
        )
        .bind(user_id)
        .bind(recipe_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
