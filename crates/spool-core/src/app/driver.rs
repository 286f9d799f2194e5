use std::future::pending;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use super::engine::{DeliveryQueue, DrainOutcome};

/// Background task that turns wall-clock time and connectivity changes into
/// engine calls.
/// - flush interval → `on_timer_tick()`
/// - scheduled retry → `on_retry_timer()`
/// - reachability watch → `on_reachability_changed()`
///
/// Dropping the handle without `shutdown_and_join()` leaves the loop running
/// until the runtime shuts down.
pub struct DeliveryDriver {
    queue: Arc<DeliveryQueue>,
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl DeliveryDriver {
    pub fn spawn(queue: Arc<DeliveryQueue>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        // subscribe here so a change made right after spawn() is not missed
        let reachability = queue.reachability_watch();
        let q = Arc::clone(&queue);
        let join = tokio::spawn(async move {
            drive(q, reachability, shutdown_rx).await;
        });
        Self {
            queue,
            shutdown_tx,
            join,
        }
    }

    pub fn queue(&self) -> &Arc<DeliveryQueue> {
        &self.queue
    }

    /// Stop the loop. A drain already running inside it is allowed to finish.
    pub fn request_shutdown(&self) {
        // ignore send error: the loop may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    /// Stop the loop, wait for it, then run the queue's final drain.
    pub async fn shutdown_and_join(self) -> DrainOutcome {
        self.request_shutdown();
        let _ = self.join.await;
        self.queue.destroy().await
    }
}

async fn drive(
    queue: Arc<DeliveryQueue>,
    mut reachability: Option<watch::Receiver<bool>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut interval = time::interval(queue.flush_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    interval.tick().await;

    info!(queue = %queue.name(), interval_ms = queue.config().flush_interval_ms, "delivery driver started");

    loop {
        if *shutdown_rx.borrow() || queue.is_destroyed() {
            break;
        }

        // register before reading the deadline so a reschedule in between is not missed
        let schedule_changed = queue.schedule_changed();
        let retry_delay = queue.retry_delay();

        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = interval.tick() => {
                let outcome = queue.on_timer_tick().await;
                debug!(queue = %queue.name(), ?outcome, "flush interval");
            }
            _ = async {
                match retry_delay {
                    Some(delay) => time::sleep(delay).await,
                    None => pending::<()>().await,
                }
            } => {
                let outcome = queue.on_retry_timer().await;
                debug!(queue = %queue.name(), ?outcome, "retry timer");
            }
            _ = schedule_changed => {}
            online = next_reachability(&mut reachability) => {
                match online {
                    Some(online) => {
                        let outcome = queue.on_reachability_changed(online).await;
                        debug!(queue = %queue.name(), online, ?outcome, "reachability");
                    }
                    None => reachability = None,
                }
            }
        }
    }

    info!(queue = %queue.name(), pending = queue.queue_length(), "delivery driver stopped");
}

/// Next value from the watch, `None` once the sender is gone. Pends forever
/// without a watch.
async fn next_reachability(rx: &mut Option<watch::Receiver<bool>>) -> Option<bool> {
    match rx {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(*rx.borrow_and_update()),
            Err(_) => None,
        },
        None => pending().await,
    }
}
