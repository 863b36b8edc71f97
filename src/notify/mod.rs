//! Fire-and-forget customer notifications.
//!
//! Job operations hand a [`Notification`] to a [`NotificationSender`] and move
//! on. A [`NotificationWorker`] delivers them in the background; delivery
//! failures are logged and never reach the operation that queued them.

pub mod worker;

use serde::Serialize;
use std::fmt;
use std::future::Future;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::domain::{CustomerId, JobId, TechnicianId};

pub use worker::NotificationWorker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    JobScheduled,
    JobCompleted,
    JobCancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub job_id: JobId,
    pub customer_id: CustomerId,
    pub technician_id: Option<TechnicianId>,
}

#[derive(Debug)]
pub struct NotifyError(pub String);

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "notification delivery failed: {}", self.0)
    }
}

impl std::error::Error for NotifyError {}

/// Delivery channel for notifications (email, SMS, ...)
pub trait Notifier: Send + Sync + 'static {
    fn deliver(&self, notification: &Notification) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// Writes each notification to the log instead of contacting a provider
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            kind = ?notification.kind,
            job_id = notification.job_id,
            customer_id = notification.customer_id,
            technician_id = ?notification.technician_id,
            "Notification delivered"
        );
        Ok(())
    }
}

/// Cloneable handle used by request handlers to queue notifications
#[derive(Debug, Clone)]
pub struct NotificationSender {
    tx: mpsc::Sender<Notification>,
}

impl NotificationSender {
    /// Create a sender and the receiving end for a [`NotificationWorker`]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// `true` once the worker has stopped receiving
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Queue without waiting. Returns `false` if the notification was dropped.
    pub fn send(&self, notification: Notification) -> bool {
        match self.tx.try_send(notification) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(n)) => {
                warn!("Notification queue full, dropping {:?} for job {}", n.kind, n.job_id);
                false
            }
            Err(mpsc::error::TrySendError::Closed(n)) => {
                warn!("Notification worker stopped, dropping {:?} for job {}", n.kind, n.job_id);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(job_id: JobId) -> Notification {
        Notification {
            kind: NotificationKind::JobScheduled,
            job_id,
            customer_id: 1,
            technician_id: None,
        }
    }

    #[test]
    fn test_full_queue_drops_instead_of_blocking() {
        let (sender, mut rx) = NotificationSender::channel(1);

        assert!(sender.send(notification(1)));
        assert!(!sender.send(notification(2)));

        assert_eq!(rx.try_recv().unwrap().job_id, 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_queue_drops() {
        let (sender, rx) = NotificationSender::channel(4);
        assert!(!sender.is_closed());
        drop(rx);
        assert!(sender.is_closed());
        assert!(!sender.send(notification(1)));
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        assert!(LogNotifier.deliver(&notification(5)).await.is_ok());
    }
}
