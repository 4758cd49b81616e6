use sqlx::error::{DatabaseError, ErrorKind};

use crate::application::repos::RepoError;

/// SQLSTATE for a malformed literal, such as a non-UUID id.
const INVALID_TEXT_REPRESENTATION: &str = "22P02";
/// SQLSTATE raised when `statement_timeout` cancels a query.
const QUERY_CANCELED: &str = "57014";

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db) => map_database_error(db.as_ref()),
        other => RepoError::from_persistence(other),
    }
}

fn map_database_error(db: &dyn DatabaseError) -> RepoError {
    match db.kind() {
        ErrorKind::UniqueViolation => RepoError::Duplicate {
            constraint: db.constraint().unwrap_or("unknown").to_string(),
        },
        ErrorKind::ForeignKeyViolation => RepoError::InvalidInput {
            message: match db.constraint().and_then(referenced_entity) {
                Some(entity) => format!("referenced {entity} does not exist"),
                None => db.message().to_string(),
            },
        },
        ErrorKind::CheckViolation | ErrorKind::NotNullViolation => RepoError::Integrity {
            message: db.message().to_string(),
        },
        _ => match db.code().as_deref() {
            Some(INVALID_TEXT_REPRESENTATION) => RepoError::InvalidInput {
                message: db.message().to_string(),
            },
            Some(QUERY_CANCELED) => RepoError::Timeout,
            _ => RepoError::from_persistence(db.message()),
        },
    }
}

/// Entity behind one of the schema's `<table>_<column>_fkey` constraints.
fn referenced_entity(constraint: &str) -> Option<&'static str> {
    let column = constraint.strip_suffix("_fkey")?;
    if column.ends_with("_recipe_id") {
        Some("recipe")
    } else if column.ends_with("_category_id") {
        Some("category")
    } else if column.ends_with("_user_id") || column.ends_with("_owner_id") {
        Some("user")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    use super::*;

    #[derive(Debug)]
    struct PgFailure {
        code: &'static str,
        constraint: Option<&'static str>,
        message: &'static str,
    }

    impl fmt::Display for PgFailure {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message)
        }
    }

    impl StdError for PgFailure {}

    impl DatabaseError for PgFailure {
        fn message(&self) -> &str {
            self.message
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn constraint(&self) -> Option<&str> {
            self.constraint
        }

        fn kind(&self) -> ErrorKind {
            match self.code {
                "23505" => ErrorKind::UniqueViolation,
                "23503" => ErrorKind::ForeignKeyViolation,
                "23502" => ErrorKind::NotNullViolation,
                "23514" => ErrorKind::CheckViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn pg(code: &'static str, constraint: Option<&'static str>) -> sqlx::Error {
        sqlx::Error::Database(Box::new(PgFailure {
            code,
            constraint,
            message: "ERROR: statement failed",
        }))
    }

    #[test]
    fn unique_violations_keep_their_constraint() {
        for constraint in ["subscriptions_email_key", "users_username_key"] {
            match map_sqlx_error(pg("23505", Some(constraint))) {
                RepoError::Duplicate { constraint: found } => assert_eq!(found, constraint),
                other => panic!("unexpected mapping: {other:?}"),
            }
        }
    }

    #[test]
    fn missing_references_name_the_entity() {
        match map_sqlx_error(pg("23503", Some("cart_items_recipe_id_fkey"))) {
            RepoError::InvalidInput { message } => {
                assert_eq!(message, "referenced recipe does not exist");
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
        match map_sqlx_error(pg("23503", Some("recipes_category_id_fkey"))) {
            RepoError::InvalidInput { message } => {
                assert_eq!(message, "referenced category does not exist");
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn check_and_state_codes_are_classified() {
        assert!(matches!(
            map_sqlx_error(pg("23514", Some("recipes_price_minor_check"))),
            RepoError::Integrity { .. }
        ));
        assert!(matches!(
            map_sqlx_error(pg("22P02", None)),
            RepoError::InvalidInput { .. }
        ));
        assert!(matches!(
            map_sqlx_error(pg("57014", None)),
            RepoError::Timeout
        ));
        assert!(matches!(
            map_sqlx_error(pg("40001", None)),
            RepoError::Persistence(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            RepoError::NotFound
        ));
    }
}
