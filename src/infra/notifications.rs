//! Background delivery of user notifications.
//!
//! Services enqueue through [`NotificationQueue`] without waiting. A single
//! [`NotificationWorker`] task drains the queue and delivers each message as a
//! structured log record.

use std::num::NonZeroUsize;

use metrics::counter;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::application::notifications::{Notification, Notifier};

pub(crate) const METRIC_NOTIFICATION_DELIVERED_TOTAL: &str = "larder_notification_delivered_total";
pub(crate) const METRIC_NOTIFICATION_DROPPED_TOTAL: &str = "larder_notification_dropped_total";

/// Create a bounded queue and the worker that drains it.
pub fn channel(capacity: NonZeroUsize) -> (NotificationQueue, NotificationWorker) {
    let (sender, receiver) = mpsc::channel(capacity.get());
    (NotificationQueue { sender }, NotificationWorker { receiver })
}

#[derive(Debug, Clone)]
pub struct NotificationQueue {
    sender: mpsc::Sender<Notification>,
}

impl Notifier for NotificationQueue {
    fn notify(&self, notification: Notification) {
        match self.sender.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                counter!(METRIC_NOTIFICATION_DROPPED_TOTAL, "reason" => "full").increment(1);
                warn!(
                    target = "larder::notifications",
                    kind = dropped.kind(),
                    recipient = dropped.recipient(),
                    "Notification queue full; dropping message"
                );
            }
            Err(TrySendError::Closed(dropped)) => {
                counter!(METRIC_NOTIFICATION_DROPPED_TOTAL, "reason" => "closed").increment(1);
                warn!(
                    target = "larder::notifications",
                    kind = dropped.kind(),
                    recipient = dropped.recipient(),
                    "Notification worker stopped; dropping message"
                );
            }
        }
    }
}

#[derive(Debug)]
pub struct NotificationWorker {
    receiver: mpsc::Receiver<Notification>,
}

impl NotificationWorker {
    pub fn spawn(self) -> JoinHandle<u64> {
        tokio::spawn(self.run())
    }

    /// Deliver until every queue handle is dropped. Returns the number of
    /// notifications delivered.
    pub async fn run(mut self) -> u64 {
        let mut delivered = 0;
        while let Some(notification) = self.receiver.recv().await {
            deliver(&notification);
            delivered += 1;
        }
        info!(
            target = "larder::notifications",
            delivered, "Notification worker stopped"
        );
        delivered
    }
}

fn deliver(notification: &Notification) {
    counter!(METRIC_NOTIFICATION_DELIVERED_TOTAL, "kind" => notification.kind()).increment(1);
    info!(
        target = "larder::notifications",
        kind = notification.kind(),
        recipient = notification.recipient(),
        subject = %notification.subject(),
        "Notification delivered"
    );
}
