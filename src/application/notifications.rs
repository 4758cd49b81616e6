//! Outbound user notifications.
//!
//! Services hand notifications to a [`Notifier`] after their writes commit.
//! Delivery is asynchronous and never fails the request that produced it.

use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Sent to the author after a recipe is created.
    NewRecipe {
        recipient: String,
        title: String,
        description: String,
    },
    SubscriptionWelcome {
        recipient: String,
    },
    Purchase {
        recipient: String,
        recipe_title: String,
        price: String,
        payment_id: String,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewRecipe { .. } => "new_recipe",
            Self::SubscriptionWelcome { .. } => "subscription_welcome",
            Self::Purchase { .. } => "purchase",
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            Self::NewRecipe { recipient, .. }
            | Self::SubscriptionWelcome { recipient }
            | Self::Purchase { recipient, .. } => recipient,
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Self::NewRecipe { title, .. } => format!("Your recipe \"{title}\" is live"),
            Self::SubscriptionWelcome { .. } => "Welcome to the newsletter".to_string(),
            Self::Purchase { recipe_title, .. } => format!("You purchased \"{recipe_title}\""),
        }
    }
}

/// Fire-and-forget hand-off.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Keeps every notification in memory. Useful when no worker runs.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notification);
    }
}
