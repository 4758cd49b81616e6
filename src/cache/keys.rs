//! Cache key derivation for the recipe listing path.
//!
//! Keys are plain strings so they can live in any key-value store. Component
//! order is fixed:
//!
//! ```text
//! recipe_list:{owner}:{category}:limit_{limit}:offset_{offset}:{search}
//! ```
//!
//! The owner component comes first after the namespace so that every entry of
//! one owner shares the prefix matched by [`owner_pattern`].

use std::fmt;

use url::form_urlencoded::byte_serialize;
use uuid::Uuid;

pub const LISTING_NAMESPACE: &str = "recipe_list";

const ANONYMOUS: &str = "anonymous";
const ALL_CATEGORIES: &str = "category_all";
const NO_SEARCH: &str = "search_none";

/// Who a listing is computed for, and whose mutations invalidate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identity {
    User(Uuid),
    Anonymous,
}

impl Identity {
    pub fn from_user(user_id: Option<Uuid>) -> Self {
        user_id.map_or(Self::Anonymous, Self::User)
    }

    pub fn user_id(self) -> Option<Uuid> {
        match self {
            Self::User(id) => Some(id),
            Self::Anonymous => None,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "{}", id.hyphenated()),
            Self::Anonymous => f.write_str(ANONYMOUS),
        }
    }
}

/// A derived listing key together with the owner it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    owner: Identity,
    rendered: String,
}

impl CacheKey {
    pub fn owner(&self) -> Identity {
        self.owner
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

/// Derive the listing key for a request.
///
/// Missing category or search fall back to the `category_all` / `search_none`
/// sentinels. Supplied values are percent-encoded behind a `=` so a literal
/// search for `none` cannot collide with the sentinel. Search terms are
/// trimmed and an empty term counts as missing.
pub fn derive_key(
    identity: Identity,
    category: Option<&str>,
    limit: u32,
    offset: u64,
    search: Option<&str>,
) -> CacheKey {
    let category = match category.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => format!("category={}", encode(value)),
        None => ALL_CATEGORIES.to_string(),
    };
    let search = match search.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => format!("search={}", encode(value)),
        None => NO_SEARCH.to_string(),
    };

    CacheKey {
        owner: identity,
        rendered: format!(
            "{LISTING_NAMESPACE}:{identity}:{category}:limit_{limit}:offset_{offset}:{search}"
        ),
    }
}

/// Glob pattern matching every listing key derived for `identity`.
pub fn owner_pattern(identity: Identity) -> String {
    format!("{LISTING_NAMESPACE}:{identity}:*")
}

fn encode(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}
