use std::sync::Arc;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::{Notification, Notifier};

/// Background worker delivering queued notifications
pub struct NotificationWorker<N> {
    notifier: Arc<N>,
    receiver: mpsc::Receiver<Notification>,
}

impl<N: Notifier> NotificationWorker<N> {
    pub fn new(notifier: N, receiver: mpsc::Receiver<Notification>) -> Self {
        Self {
            notifier: Arc::new(notifier),
            receiver,
        }
    }

    /// Run until shutdown is signalled or every sender is dropped
    ///
    /// # Concurrency Model
    /// - Each notification is delivered on its own task
    /// - A semaphore permit is held for the duration of each delivery
    /// - In-flight deliveries are awaited before returning
    pub async fn run(mut self, semaphore: Arc<Semaphore>, mut shutdown_rx: watch::Receiver<bool>) {
        info!("Notification worker started");
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Notification worker received shutdown signal");
                        break;
                    }
                }
                Some(finished) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = finished {
                        error!("Notification task panicked: {:?}", e);
                    }
                }
                next = self.receiver.recv() => {
                    let Some(notification) = next else {
                        info!("Notification channel closed");
                        break;
                    };

                    if !self.dispatch(notification, &semaphore, &mut in_flight).await {
                        break;
                    }
                }
            }
        }

        // Senders can no longer enqueue; whatever was accepted still goes out.
        self.receiver.close();
        let mut drained = 0;
        let mut dropped = 0;
        while let Some(notification) = self.receiver.recv().await {
            if dropped == 0 && self.dispatch(notification, &semaphore, &mut in_flight).await {
                drained += 1;
            } else {
                dropped += 1;
            }
        }
        if drained > 0 {
            info!("Delivering {} notifications queued before shutdown", drained);
        }
        if dropped > 0 {
            warn!("Dropped {} queued notifications", dropped);
        }

        let pending = in_flight.len();
        if pending > 0 {
            info!("Waiting for {} in-flight notifications...", pending);
        }
        while let Some(finished) = in_flight.join_next().await {
            if let Err(e) = finished {
                error!("Notification task panicked: {:?}", e);
            }
        }
        info!("Notification worker stopped");
    }

    /// Spawn one delivery holding a semaphore permit. Returns `false` if the
    /// semaphore was closed.
    async fn dispatch(
        &self,
        notification: Notification,
        semaphore: &Arc<Semaphore>,
        in_flight: &mut JoinSet<()>,
    ) -> bool {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!("Notification worker failed to acquire semaphore: {:?}", e);
                return false;
            }
        };

        let notifier = self.notifier.clone();
        in_flight.spawn(async move {
            debug!("Delivering {:?} for job {}", notification.kind, notification.job_id);
            if let Err(e) = notifier.deliver(&notification).await {
                error!("Job {}: {}", notification.job_id, e);
            }
            drop(permit);
        });
        true
    }
}
