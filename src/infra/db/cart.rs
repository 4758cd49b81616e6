use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{CartRepo, RepoError};
use crate::domain::entities::CartItemRecord;

use super::recipes::{RECIPE_COLUMNS, RECIPE_JOINS, RecipeRow};
use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct CartItemRow {
    item_id: Uuid,
    item_user_id: Uuid,
    #[sqlx(flatten)]
    recipe: RecipeRow,
}

impl From<CartItemRow> for CartItemRecord {
    fn from(row: CartItemRow) -> Self {
        Self {
            id: row.item_id,
            user_id: row.item_user_id,
            recipe: row.recipe.into(),
        }
    }
}

#[async_trait]
impl CartRepo for PostgresRepositories {
    async fn list_items(&self, user_id: Uuid) -> Result<Vec<CartItemRecord>, RepoError> {
        let sql = format!(
            "SELECT ci.id AS item_id, ci.user_id AS item_user_id, {RECIPE_COLUMNS} \
             FROM cart_items ci JOIN recipes r ON r.id = ci.recipe_id {RECIPE_JOINS} \
             WHERE ci.user_id = $1 ORDER BY ci.created_at, ci.id"
        );
        let rows = sqlx::query_as::<_, CartItemRow>(&sql)
            .bind(user_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CartItemRecord::from).collect())
    }

    async fn add_item(&self, user_id: Uuid, recipe_id: Uuid) -> Result<CartItemRecord, RepoError> {
        let sql = format!(
            r#"
            WITH ci AS (
                INSERT INTO cart_items (id, user_id, recipe_id, created_at)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            )
            SELECT ci.id AS item_id, ci.user_id AS item_user_id, {RECIPE_COLUMNS}
            FROM ci JOIN recipes r ON r.id = ci.recipe_id {RECIPE_JOINS}
            "#
        );
        let row = sqlx::query_as::<_, CartItemRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(recipe_id)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(item_id)
            .bind(user_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self, user_id: Uuid) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn count(&self, user_id: Uuid) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(count.max(0) as u64)
    }
}
