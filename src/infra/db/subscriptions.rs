use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{RepoError, SubscriptionsRepo};
use crate::domain::entities::SubscriptionRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    email: String,
    subscribed_at: OffsetDateTime,
}

#[async_trait]
impl SubscriptionsRepo for PostgresRepositories {
    async fn create_subscription(&self, email: &str) -> Result<SubscriptionRecord, RepoError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            INSERT INTO subscriptions (id, email, subscribed_at)
            VALUES ($1, $2, $3)
            RETURNING id, email, subscribed_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(SubscriptionRecord {
            id: row.id,
            email: row.email,
            subscribed_at: row.subscribed_at,
        })
    }
}
