use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::notifications::{Notification, Notifier};
use crate::application::repos::{RepoError, SubscriptionsRepo};
use crate::domain::accounts::validate_email;
use crate::domain::entities::SubscriptionRecord;
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("email is already subscribed")]
    AlreadySubscribed,
}

#[derive(Clone)]
pub struct SubscriptionService {
    repo: Arc<dyn SubscriptionsRepo>,
    notifier: Arc<dyn Notifier>,
}

impl SubscriptionService {
    pub fn new(repo: Arc<dyn SubscriptionsRepo>, notifier: Arc<dyn Notifier>) -> Self {
        Self { repo, notifier }
    }

    pub async fn subscribe(&self, email: &str) -> Result<SubscriptionRecord, SubscriptionError> {
        let email = validate_email(email)?;
        let record = self
            .repo
            .create_subscription(&email)
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => SubscriptionError::AlreadySubscribed,
                other => SubscriptionError::Repo(other),
            })?;

        info!(
            target = "larder::subscriptions",
            subscription_id = %record.id,
            "Newsletter subscription added"
        );
        self.notifier.notify(Notification::SubscriptionWelcome {
            recipient: record.email.clone(),
        });
        Ok(record)
    }
}
