//! Recipe drafting rules shared by the catalog write paths.

use uuid::Uuid;

use super::entities::RecipeRecord;
use super::error::DomainError;

pub const TITLE_MAX_CHARS: usize = 100;
pub const PRICE_MAX_MINOR: i64 = 9_999_999;
pub const DEFAULT_PRICE_MINOR: i64 = 10_000;
pub const RATING_MAX_TENTHS: i16 = 50;

/// Fully specified recipe content, validated before it reaches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDraft {
    pub title: String,
    pub image_url: Option<String>,
    pub description: String,
    pub category_id: Uuid,
    pub preparation_minutes: Option<i32>,
    pub cooking_minutes: Option<i32>,
    pub rating_tenths: Option<i16>,
    pub process: String,
    pub price_minor: i64,
    pub is_public: bool,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipePatch {
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub preparation_minutes: Option<i32>,
    pub cooking_minutes: Option<i32>,
    pub rating_tenths: Option<i16>,
    pub process: Option<String>,
    pub price_minor: Option<i64>,
    pub is_public: Option<bool>,
}

impl RecipeDraft {
    /// Trim free text and check every field against the catalog rules.
    pub fn normalized(self) -> Result<Self, DomainError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(DomainError::validation("title", "must not be empty"));
        }
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(DomainError::validation(
                "title",
                format!("must be at most {TITLE_MAX_CHARS} characters"),
            ));
        }

        let description = self.description.trim().to_string();
        if description.is_empty() {
            return Err(DomainError::validation("description", "must not be empty"));
        }

        check_minutes("preparation_minutes", self.preparation_minutes)?;
        check_minutes("cooking_minutes", self.cooking_minutes)?;

        if let Some(rating) = self.rating_tenths {
            if !(0..=RATING_MAX_TENTHS).contains(&rating) {
                return Err(DomainError::validation(
                    "rating",
                    format!("must be between 0 and {RATING_MAX_TENTHS} tenths"),
                ));
            }
        }

        if !(0..=PRICE_MAX_MINOR).contains(&self.price_minor) {
            return Err(DomainError::validation(
                "price",
                format!("must be between 0 and {PRICE_MAX_MINOR} minor units"),
            ));
        }

        let image_url = self.image_url.and_then(|value| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        });

        Ok(Self {
            title,
            image_url,
            description,
            process: self.process.trim().to_string(),
            ..self
        })
    }
}

impl RecipePatch {
    /// Overlay the patch onto the stored recipe and validate the result.
    pub fn apply(self, current: &RecipeRecord) -> Result<RecipeDraft, DomainError> {
        RecipeDraft {
            title: self.title.unwrap_or_else(|| current.title.clone()),
            image_url: self.image_url.or_else(|| current.image_url.clone()),
            description: self
                .description
                .unwrap_or_else(|| current.description.clone()),
            category_id: self.category_id.unwrap_or(current.category_id),
            preparation_minutes: self.preparation_minutes.or(current.preparation_minutes),
            cooking_minutes: self.cooking_minutes.or(current.cooking_minutes),
            rating_tenths: self.rating_tenths.or(current.rating_tenths),
            process: self.process.unwrap_or_else(|| current.process.clone()),
            price_minor: self.price_minor.unwrap_or(current.price_minor),
            is_public: self.is_public.unwrap_or(current.is_public),
        }
        .normalized()
    }
}

fn check_minutes(field: &'static str, value: Option<i32>) -> Result<(), DomainError> {
    match value {
        Some(minutes) if minutes < 0 => {
            Err(DomainError::validation(field, "must not be negative"))
        }
        _ => Ok(()),
    }
}
