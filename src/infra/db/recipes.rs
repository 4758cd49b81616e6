use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::application::repos::{
    RecipeQueryFilter, RecipeScope, RecipesRepo, RecipesWriteRepo, RepoError,
};
use crate::domain::entities::RecipeRecord;
use crate::domain::recipes::RecipeDraft;

use super::{PostgresRepositories, escape_like, map_sqlx_error};

/// Projection shared by every query that yields a [`RecipeRow`]. Expects the
/// recipe relation to be aliased `r`.
pub(super) const RECIPE_COLUMNS: &str = "r.id, r.title, r.image_url, r.description, \
    r.category_id, c.name AS category_name, r.preparation_minutes, r.cooking_minutes, \
    r.rating_tenths, r.process, r.owner_id, u.username AS owner_username, r.price_minor, \
    r.is_public, r.created_at, r.updated_at";

pub(super) const RECIPE_JOINS: &str =
    "JOIN categories c ON c.id = r.category_id JOIN users u ON u.id = r.owner_id";

#[derive(sqlx::FromRow)]
pub(super) struct RecipeRow {
    id: Uuid,
    title: String,
    image_url: Option<String>,
    description: String,
    category_id: Uuid,
    category_name: String,
    preparation_minutes: Option<i32>,
    cooking_minutes: Option<i32>,
    rating_tenths: Option<i16>,
    process: String,
    owner_id: Uuid,
    owner_username: String,
    price_minor: i64,
    is_public: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<RecipeRow> for RecipeRecord {
    fn from(row: RecipeRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            image_url: row.image_url,
            description: row.description,
            category_id: row.category_id,
            category_name: row.category_name,
            preparation_minutes: row.preparation_minutes,
            cooking_minutes: row.cooking_minutes,
            rating_tenths: row.rating_tenths,
            process: row.process,
            owner_id: row.owner_id,
            owner_username: row.owner_username,
            price_minor: row.price_minor,
            is_public: row.is_public,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl PostgresRepositories {
    fn push_recipe_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &RecipeQueryFilter) {
        match filter.scope {
            RecipeScope::Owner(owner_id) => {
                qb.push(" AND r.owner_id = ");
                qb.push_bind(owner_id);
            }
            RecipeScope::Public => {
                qb.push(" AND r.is_public");
            }
        }

        if let Some(category_id) = filter.category_id {
            qb.push(" AND r.category_id = ");
            qb.push_bind(category_id);
        }

        if let Some(search) = filter.search.as_deref() {
            qb.push(" AND r.title ILIKE ");
            qb.push_bind(format!("%{}%", escape_like(search)));
        }
    }
}

#[async_trait]
impl RecipesRepo for PostgresRepositories {
    async fn list_recipes(
        &self,
        filter: &RecipeQueryFilter,
        page: PageRequest,
    ) -> Result<Vec<RecipeRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r {RECIPE_JOINS} WHERE TRUE"
        ));
        Self::push_recipe_filter(&mut qb, filter);
        qb.push(" ORDER BY r.created_at DESC, r.id DESC LIMIT ");
        qb.push_bind(i64::from(page.limit));
        qb.push(" OFFSET ");
        qb.push_bind(i64::try_from(page.offset).unwrap_or(i64::MAX));

        let rows = qb
            .build_query_as::<RecipeRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(RecipeRecord::from).collect())
    }

    async fn count_recipes(&self, filter: &RecipeQueryFilter) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM recipes r WHERE TRUE");
        Self::push_recipe_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(count.max(0) as u64)
    }

    async fn find_recipe(&self, id: Uuid) -> Result<Option<RecipeRecord>, RepoError> {
        let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes r {RECIPE_JOINS} WHERE r.id = $1");
        let row = sqlx::query_as::<_, RecipeRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(RecipeRecord::from))
    }

    async fn find_recipes_by_ids(&self, ids: &[Uuid]) -> Result<Vec<RecipeRecord>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r {RECIPE_JOINS} \
             WHERE r.id = ANY($1) ORDER BY r.created_at DESC, r.id DESC"
        );
        let rows = sqlx::query_as::<_, RecipeRow>(&sql)
            .bind(ids)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(RecipeRecord::from).collect())
    }
}

#[async_trait]
impl RecipesWriteRepo for PostgresRepositories {
    async fn create_recipe(
        &self,
        owner_id: Uuid,
        draft: RecipeDraft,
    ) -> Result<RecipeRecord, RepoError> {
        let sql = format!(
            r#"
            WITH r AS (
                INSERT INTO recipes (
                    id, title, image_url, description, category_id, preparation_minutes,
                    cooking_minutes, rating_tenths, process, owner_id, price_minor, is_public,
                    created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
                RETURNING *
            )
            SELECT {RECIPE_COLUMNS} FROM r {RECIPE_JOINS}
            "#
        );

        let row = sqlx::query_as::<_, RecipeRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(draft.title)
            .bind(draft.image_url)
            .bind(draft.description)
            .bind(draft.category_id)
            .bind(draft.preparation_minutes)
            .bind(draft.cooking_minutes)
            .bind(draft.rating_tenths)
            .bind(draft.process)
            .bind(owner_id)
            .bind(draft.price_minor)
            .bind(draft.is_public)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_recipe(&self, id: Uuid, draft: RecipeDraft) -> Result<RecipeRecord, RepoError> {
        let sql = format!(
            r#"
            WITH r AS (
                UPDATE recipes
                SET title = $2,
                    image_url = $3,
                    description = $4,
                    category_id = $5,
                    preparation_minutes = $6,
                    cooking_minutes = $7,
                    rating_tenths = $8,
                    process = $9,
                    price_minor = $10,
                    is_public = $11,
                    updated_at = $12
                WHERE id = $1
                RETURNING *
            )
            SELECT {RECIPE_COLUMNS} FROM r {RECIPE_JOINS}
            "#
        );

        let row = sqlx::query_as::<_, RecipeRow>(&sql)
            .bind(id)
            .bind(draft.title)
            .bind(draft.image_url)
            .bind(draft.description)
            .bind(draft.category_id)
            .bind(draft.preparation_minutes)
            .bind(draft.cooking_minutes)
            .bind(draft.rating_tenths)
            .bind(draft.process)
            .bind(draft.price_minor)
            .bind(draft.is_public)
            .bind(OffsetDateTime::now_utc())
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(RecipeRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_recipe(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
