//! Recipe catalog: cached listings and owner-only writes.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::accounts::Principal;
use crate::application::notifications::{Notification, Notifier};
use crate::application::pagination::{OffsetPage, PageRequest};
use crate::application::repos::{
    CategoriesRepo, RecipeQueryFilter, RecipeScope, RecipesRepo, RecipesWriteRepo, RepoError,
};
use crate::cache::{Identity, ResultCacheGate, derive_key};
use crate::domain::entities::{CategoryRecord, RecipeRecord};
use crate::domain::error::DomainError;
use crate::domain::recipes::{RecipeDraft, RecipePatch};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("recipe not found")]
    NotFound,
    #[error("recipe belongs to another user")]
    Forbidden,
    #[error("category `{0}` does not exist")]
    UnknownCategory(Uuid),
    #[error("failed to encode listing: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeListQuery {
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    pub page: PageRequest,
}

/// Public representation of a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeView {
    pub id: Uuid,
    pub title: String,
    pub image_url: Option<String>,
    pub description: String,
    pub category: Uuid,
    pub category_name: String,
    pub preparation_minutes: Option<i32>,
    pub cooking_minutes: Option<i32>,
    /// Out of 5.0, one decimal place.
    pub rating: Option<String>,
    pub process: String,
    pub created_by: String,
    /// Two decimal places, major units.
    pub price: String,
    pub is_public: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&RecipeRecord> for RecipeView {
    fn from(record: &RecipeRecord) -> Self {
        Self {
            id: record.id,
            title: record.title.clone(),
            image_url: record.image_url.clone(),
            description: record.description.clone(),
            category: record.category_id,
            category_name: record.category_name.clone(),
            preparation_minutes: record.preparation_minutes,
            cooking_minutes: record.cooking_minutes,
            rating: record.rating_tenths.map(format_tenths),
            process: record.process.clone(),
            created_by: record.owner_username.clone(),
            price: format_minor(record.price_minor),
            is_public: record.is_public,
            created_at: record.created_at,
        }
    }
}

pub fn format_minor(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

fn format_tenths(tenths: i16) -> String {
    format!("{}.{}", tenths / 10, tenths % 10)
}

#[derive(Clone)]
pub struct CatalogService {
    reader: Arc<dyn RecipesRepo>,
    writer: Arc<dyn RecipesWriteRepo>,
    categories: Arc<dyn CategoriesRepo>,
    gate: ResultCacheGate,
    notifier: Arc<dyn Notifier>,
}

impl CatalogService {
    pub fn new(
        reader: Arc<dyn RecipesRepo>,
        writer: Arc<dyn RecipesWriteRepo>,
        categories: Arc<dyn CategoriesRepo>,
        gate: ResultCacheGate,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            reader,
            writer,
            categories,
            gate,
            notifier,
        }
    }

    /// Serialized listing page for `identity`.
    ///
    /// A signed-in user sees their own recipes; anonymous callers see the
    /// public catalog. The result goes through the listing cache.
    pub async fn list_recipes(
        &self,
        identity: Identity,
        query: &RecipeListQuery,
    ) -> Result<Bytes, CatalogError> {
        let scope = match identity {
            Identity::User(user_id) => RecipeScope::Owner(user_id),
            Identity::Anonymous => RecipeScope::Public,
        };
        let filter = RecipeQueryFilter {
            scope,
            category_id: query.category_id,
            search: normalize_search(query.search.as_deref()),
        };

        let category = query.category_id.map(|id| id.hyphenated().to_string());
        let key = derive_key(
            identity,
            category.as_deref(),
            query.page.limit,
            query.page.offset,
            filter.search.as_deref(),
        );

        let filter = &filter;
        let page = query.page;
        self.gate
            .get_or_compute(&key, move || async move {
                let page = self.load_page(filter, page).await?;
                serde_json::to_vec(&page)
                    .map(Bytes::from)
                    .map_err(|err| CatalogError::Encode(err.to_string()))
            })
            .await
    }

    /// Every recipe owned by `user_id`, read straight from storage.
    pub async fn list_my_recipes(
        &self,
        user_id: Uuid,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<OffsetPage<RecipeView>, CatalogError> {
        let filter = RecipeQueryFilter {
            scope: RecipeScope::Owner(user_id),
            category_id: None,
            search: normalize_search(search),
        };
        self.load_page(&filter, page).await
    }

    /// Public recipes are visible to anyone; private ones only to their owner.
    pub async fn get_recipe(
        &self,
        viewer: Option<Uuid>,
        id: Uuid,
    ) -> Result<RecipeRecord, CatalogError> {
        let recipe = self
            .reader
            .find_recipe(id)
            .await?
            .ok_or(CatalogError::NotFound)?;

        if recipe.is_visible_to(viewer) {
            Ok(recipe)
        } else {
            Err(CatalogError::NotFound)
        }
    }

    pub async fn create_recipe(
        &self,
        author: &Principal,
        draft: RecipeDraft,
    ) -> Result<RecipeRecord, CatalogError> {
        let draft = draft.normalized()?;
        self.ensure_category(draft.category_id).await?;

        let recipe = self.writer.create_recipe(author.user_id, draft).await?;
        self.invalidate_listings(recipe.owner_id, recipe.is_public)
            .await;

        info!(
            target = "larder::catalog",
            recipe_id = %recipe.id,
            owner = %author.username,
            "Recipe created"
        );

        self.notifier.notify(Notification::NewRecipe {
            recipient: author.email.clone(),
            title: recipe.title.clone(),
            description: recipe.description.clone(),
        });

        Ok(recipe)
    }

    pub async fn update_recipe(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: RecipePatch,
    ) -> Result<RecipeRecord, CatalogError> {
        let current = self.owned_recipe(user_id, id).await?;
        let draft = patch.apply(&current)?;
        if draft.category_id != current.category_id {
            self.ensure_category(draft.category_id).await?;
        }

        let updated = self.writer.update_recipe(id, draft).await?;
        self.invalidate_listings(updated.owner_id, current.is_public || updated.is_public)
            .await;

        info!(
            target = "larder::catalog",
            recipe_id = %updated.id,
            owner = %updated.owner_username,
            "Recipe updated"
        );
        Ok(updated)
    }

    pub async fn delete_recipe(&self, user_id: Uuid, id: Uuid) -> Result<(), CatalogError> {
        let current = self.owned_recipe(user_id, id).await?;

        self.writer.delete_recipe(id).await?;
        self.invalidate_listings(current.owner_id, current.is_public)
            .await;

        info!(
            target = "larder::catalog",
            recipe_id = %current.id,
            owner = %current.owner_username,
            "Recipe deleted"
        );
        Ok(())
    }

    pub async fn list_categories(&self) -> Result<Vec<CategoryRecord>, CatalogError> {
        self.categories
            .list_categories()
            .await
            .map_err(CatalogError::from)
    }

    async fn load_page(
        &self,
        filter: &RecipeQueryFilter,
        page: PageRequest,
    ) -> Result<OffsetPage<RecipeView>, CatalogError> {
        let count = self.reader.count_recipes(filter).await?;
        let records = self.reader.list_recipes(filter, page).await?;
        let views = records.iter().map(RecipeView::from).collect();
        Ok(OffsetPage::new(views, count, page))
    }

    async fn owned_recipe(&self, user_id: Uuid, id: Uuid) -> Result<RecipeRecord, CatalogError> {
        let recipe = self
            .reader
            .find_recipe(id)
            .await?
            .ok_or(CatalogError::NotFound)?;
        if recipe.owner_id != user_id {
            return Err(CatalogError::Forbidden);
        }
        Ok(recipe)
    }

    async fn ensure_category(&self, id: Uuid) -> Result<(), CatalogError> {
        match self.categories.find_category(id).await? {
            Some(_) => Ok(()),
            None => Err(CatalogError::UnknownCategory(id)),
        }
    }

    /// Runs after the write has committed. Public recipes also appear in the
    /// anonymous listing, so that namespace goes too.
    async fn invalidate_listings(&self, owner_id: Uuid, touches_public: bool) {
        self.gate.invalidate_owner(Identity::User(owner_id)).await;
        if touches_public {
            self.gate.invalidate_owner(Identity::Anonymous).await;
        }
    }
}

fn normalize_search(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
