// Queue-backed admin notifier.
//
// Verdicts must never wait on notification delivery, so notify() only
// enqueues onto a bounded channel; a background worker drains it. Delivery
// is idempotent on the record id: a retried enqueue for an already-accepted
// record is a no-op.

use crate::core::moderation::{AdminAlert, AdminNotifier, ModerationError};
use async_trait::async_trait;
use dashmap::DashSet;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

pub struct QueueNotifier {
    tx: mpsc::Sender<AdminAlert>,
    seen: DashSet<i64>,
}

impl QueueNotifier {
    /// Create a notifier plus the receiving end of its queue, for callers
    /// that want to drive delivery themselves (tests, custom sinks).
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<AdminAlert>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                tx,
                seen: DashSet::new(),
            },
            rx,
        )
    }

    /// Create a notifier with a background worker that emits each alert as a
    /// structured log event for the ops alert channel.
    pub fn spawn(capacity: usize) -> Self {
        let (notifier, mut rx) = Self::new(capacity);
        tokio::spawn(async move {
            while let Some(alert) = rx.recv().await {
                tracing::info!(
                    record_id = alert.record_id,
                    author_id = alert.author_id,
                    severity = alert.severity.as_str(),
                    blocked = alert.blocked,
                    "Admin moderation alert"
                );
            }
        });
        notifier
    }
}

#[async_trait]
impl AdminNotifier for QueueNotifier {
    async fn notify(&self, alert: AdminAlert) -> Result<(), ModerationError> {
        if !self.seen.insert(alert.record_id) {
            tracing::debug!(
                record_id = alert.record_id,
                "Duplicate admin alert suppressed"
            );
            return Ok(());
        }

        if let Err(e) = self.tx.try_send(alert) {
            let record_id = match &e {
                TrySendError::Full(alert) | TrySendError::Closed(alert) => alert.record_id,
            };
            // Un-mark the record so a later retry can enqueue it
            self.seen.remove(&record_id);
            return Err(ModerationError::NotificationError(e.to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::Severity;

    fn alert(record_id: i64) -> AdminAlert {
        AdminAlert {
            record_id,
            author_id: 42,
            severity: Severity::High,
            blocked: true,
        }
    }

    #[tokio::test]
    async fn test_notify_enqueues_the_alert() {
        let (notifier, mut rx) = QueueNotifier::new(8);

        notifier.notify(alert(1)).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received, alert(1));
    }

    #[tokio::test]
    async fn test_duplicate_record_id_notifies_once() {
        let (notifier, mut rx) = QueueNotifier::new(8);

        notifier.notify(alert(1)).await.unwrap();
        notifier.notify(alert(1)).await.unwrap();
        notifier.notify(alert(2)).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().record_id, 1);
        assert_eq!(rx.recv().await.unwrap().record_id, 2);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_queue_surfaces_error_and_allows_retry() {
        let (notifier, mut rx) = QueueNotifier::new(1);

        notifier.notify(alert(1)).await.unwrap();
        let overflow = notifier.notify(alert(2)).await;
        assert!(matches!(
            overflow,
            Err(ModerationError::NotificationError(_))
        ));

        // After the queue drains, the same record can be retried
        assert_eq!(rx.recv().await.unwrap().record_id, 1);
        notifier.notify(alert(2)).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().record_id, 2);
    }
}
