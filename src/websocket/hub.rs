//! Broadcast Hub
//!
//! Tracks every live observer and fans readings out to them. Each observer
//! is fed through its own bounded channel; a send that fails or times out
//! removes that observer without affecting the rest.
//!
//! Background publishes go through one queue drained by a single dispatcher
//! task, so every observer sees readings in the order they were published.

use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::messages::ReadingUpdate;

/// Unique identifier for an observer connection
pub type ObserverId = Uuid;

/// Registry of live observers
pub struct BroadcastHub {
    /// Active observers: ObserverId → ObserverHandle
    observers: RwLock<HashMap<ObserverId, ObserverHandle>>,
    config: HubConfig,
    /// Publish queue, created with its dispatcher on first use
    outbox: OnceLock<mpsc::UnboundedSender<ReadingUpdate>>,
}

/// Configuration for the broadcast hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of each observer's outbound channel
    pub channel_capacity: usize,
    /// How long a single delivery may wait before the observer is dropped
    pub send_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 32,
            send_timeout: Duration::from_secs(3),
        }
    }
}

/// Handle for sending messages to a specific observer
#[derive(Clone)]
pub struct ObserverHandle {
    pub sender: mpsc::Sender<ReadingUpdate>,
}

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Observers that accepted the message
    pub delivered: usize,
    /// Observers removed because delivery failed
    pub dropped: usize,
}

impl BroadcastHub {
    /// Create a new hub
    pub fn new(config: HubConfig) -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
            config,
            outbox: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Create a channel sized for this hub and register its sending half
    pub async fn connect(&self) -> (ObserverId, mpsc::Receiver<ReadingUpdate>) {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let id = self.register(tx).await;
        (id, rx)
    }

    /// Add an observer; it receives every broadcast from now until it is deregistered
    pub async fn register(&self, sender: mpsc::Sender<ReadingUpdate>) -> ObserverId {
        let id = Uuid::new_v4();
        self.observers
            .write()
            .await
            .insert(id, ObserverHandle { sender });

        tracing::info!(observer_id = %id, "Observer connected");
        id
    }

    /// Remove an observer
    ///
    /// Returns `false` if it was not registered; that is not an error.
    pub async fn deregister(&self, id: &ObserverId) -> bool {
        let removed = self.observers.write().await.remove(id).is_some();

        if removed {
            tracing::info!(observer_id = %id, "Observer disconnected");
        }
        removed
    }

    /// Deliver `message` to every observer registered right now
    ///
    /// Sends run concurrently, each bounded by the configured timeout, so one
    /// stalled observer cannot hold up the others. Observers whose delivery
    /// fails are deregistered before this returns.
    pub async fn broadcast(&self, message: &ReadingUpdate) -> BroadcastReport {
        // Snapshot so registration and removal are not blocked while we send
        let targets: Vec<(ObserverId, mpsc::Sender<ReadingUpdate>)> = self
            .observers
            .read()
            .await
            .iter()
            .map(|(id, handle)| (*id, handle.sender.clone()))
            .collect();

        if targets.is_empty() {
            return BroadcastReport::default();
        }

        let send_timeout = self.config.send_timeout;
        let outcomes = join_all(targets.into_iter().map(|(id, sender)| async move {
            (id, deliver(&sender, *message, send_timeout).await)
        }))
        .await;

        let mut report = BroadcastReport::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::debug!(observer_id = %id, error = %e, "Delivery failed, dropping observer");
                    if self.deregister(&id).await {
                        report.dropped += 1;
                    }
                }
            }
        }

        tracing::trace!(
            delivered = report.delivered,
            dropped = report.dropped,
            "Broadcast reading"
        );
        report
    }

    /// Broadcast in the background
    ///
    /// Used by the ingest path so the response never waits on observers.
    /// Messages are queued and broadcast one at a time, in call order.
    pub fn publish(self: &Arc<Self>, message: ReadingUpdate) {
        let outbox = self.outbox.get_or_init(|| self.spawn_dispatcher());
        if outbox.send(message).is_err() {
            tracing::warn!("Broadcast dispatcher stopped, reading not pushed");
        }
    }

    /// Start the task that drains the publish queue
    ///
    /// The task holds only a weak reference, and ends once the hub (and with
    /// it the queue's sender) is dropped.
    fn spawn_dispatcher(self: &Arc<Self>) -> mpsc::UnboundedSender<ReadingUpdate> {
        let (tx, mut rx) = mpsc::unbounded_channel::<ReadingUpdate>();
        let hub = Arc::downgrade(self);

        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let Some(live) = hub.upgrade() else { break };
                live.broadcast(&message).await;
            }
            tracing::debug!("Broadcast dispatcher finished");
        });

        tx
    }

    /// Get the current observer count
    pub async fn observer_count(&self) -> usize {
        self.observers.read().await.len()
    }

    /// Check whether an observer is registered
    pub async fn is_registered(&self, id: &ObserverId) -> bool {
        self.observers.read().await.contains_key(id)
    }
}

async fn deliver(
    sender: &mpsc::Sender<ReadingUpdate>,
    message: ReadingUpdate,
    send_timeout: Duration,
) -> Result<(), DeliveryError> {
    match tokio::time::timeout(send_timeout, sender.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) => Err(DeliveryError::Closed),
        Err(_) => Err(DeliveryError::Timeout(send_timeout)),
    }
}

/// Per-observer delivery failure; never reported to clients
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Observer connection closed")]
    Closed,

    #[error("Send timed out after {0:?}")]
    Timeout(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_hub() -> BroadcastHub {
        BroadcastHub::new(HubConfig {
            channel_capacity: 4,
            send_timeout: Duration::from_millis(50),
        })
    }

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();
        assert_eq!(config.channel_capacity, 32);
        assert_eq!(config.send_timeout, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_register_deregister() {
        let hub = test_hub();
        let (id, _rx) = hub.connect().await;
        assert!(hub.is_registered(&id).await);
        assert_eq!(hub.observer_count().await, 1);

        assert!(hub.deregister(&id).await);
        assert_eq!(hub.observer_count().await, 0);
    }

    #[tokio::test]
    async fn test_deregister_unknown_is_noop() {
        let hub = test_hub();
        let (id, mut rx) = hub.connect().await;

        assert!(!hub.deregister(&Uuid::new_v4()).await);
        assert!(hub.deregister(&id).await);
        assert!(!hub.deregister(&id).await);

        // Other observers are unaffected
        let (_other, mut other_rx) = hub.connect().await;
        let report = hub.broadcast(&ReadingUpdate::new(1.0, 2.0)).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(other_rx.try_recv().unwrap(), ReadingUpdate::new(1.0, 2.0));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_observer_once() {
        let hub = test_hub();
        let (_a, mut rx_a) = hub.connect().await;
        let (_b, mut rx_b) = hub.connect().await;
        let (_c, mut rx_c) = hub.connect().await;

        let update = ReadingUpdate::new(21.5, 60.0);
        let report = hub.broadcast(&update).await;
        assert_eq!(
            report,
            BroadcastReport {
                delivered: 3,
                dropped: 0
            }
        );

        for rx in [&mut rx_a, &mut rx_b, &mut rx_c] {
            assert_eq!(rx.try_recv().unwrap(), update);
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn test_late_observer_misses_earlier_broadcast() {
        let hub = test_hub();
        let (_early, mut early_rx) = hub.connect().await;

        hub.broadcast(&ReadingUpdate::new(10.0, 20.0)).await;
        let (_late, mut late_rx) = hub.connect().await;

        assert!(early_rx.try_recv().is_ok());
        assert!(late_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_disconnected_observer_is_removed() {
        let hub = test_hub();
        let (stays, mut stays_rx) = hub.connect().await;
        let (leaves, leaves_rx) = hub.connect().await;

        // Connection dropped without a deregister call
        drop(leaves_rx);

        let report = hub.broadcast(&ReadingUpdate::new(22.0, 55.0)).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, 1);
        assert!(hub.is_registered(&stays).await);
        assert!(!hub.is_registered(&leaves).await);
        assert_eq!(stays_rx.try_recv().unwrap(), ReadingUpdate::new(22.0, 55.0));
    }

    #[tokio::test]
    async fn test_stalled_observer_times_out_without_blocking_others() {
        let hub = BroadcastHub::new(HubConfig {
            channel_capacity: 1,
            send_timeout: Duration::from_millis(50),
        });
        let (stalled, _stalled_rx) = hub.connect().await;
        let (healthy, mut healthy_rx) = hub.connect().await;

        // Fills both buffers; the healthy one drains, the stalled one never does
        hub.broadcast(&ReadingUpdate::new(1.0, 1.0)).await;
        assert!(healthy_rx.try_recv().is_ok());

        let report = hub.broadcast(&ReadingUpdate::new(2.0, 2.0)).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, 1);
        assert!(!hub.is_registered(&stalled).await);
        assert!(hub.is_registered(&healthy).await);
        assert_eq!(healthy_rx.try_recv().unwrap(), ReadingUpdate::new(2.0, 2.0));
    }

    #[tokio::test]
    async fn test_publish_delivers_in_background() {
        let hub = Arc::new(test_hub());
        let (_id, mut rx) = hub.connect().await;

        hub.publish(ReadingUpdate::new(5.0, 6.0));

        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(received, Some(ReadingUpdate::new(5.0, 6.0)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_publish_preserves_order() {
        let hub = Arc::new(BroadcastHub::new(HubConfig {
            channel_capacity: 64,
            send_timeout: Duration::from_secs(1),
        }));
        let (_id, mut rx) = hub.connect().await;
        let expected: Vec<f64> = (0..20).map(f64::from).collect();

        for run in 0..50 {
            for temperature in &expected {
                hub.publish(ReadingUpdate::new(*temperature, 50.0));
            }

            let mut received = Vec::with_capacity(expected.len());
            for _ in 0..expected.len() {
                let update = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                    .await
                    .unwrap()
                    .unwrap();
                received.push(update.temperature);
            }
            assert_eq!(received, expected, "run {}", run);
        }
    }

    #[tokio::test]
    async fn test_dispatcher_stops_with_hub() {
        let hub = Arc::new(test_hub());
        hub.publish(ReadingUpdate::new(1.0, 1.0));
        let weak = Arc::downgrade(&hub);

        drop(hub);
        tokio::task::yield_now().await;
        assert!(weak.upgrade().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_register_during_broadcast() {
        let hub = Arc::new(test_hub());
        let mut receivers = Vec::new();
        for _ in 0..16 {
            receivers.push(hub.connect().await.1);
        }

        let broadcaster = {
            let hub = Arc::clone(&hub);
            tokio::spawn(async move { hub.broadcast(&ReadingUpdate::new(3.0, 4.0)).await })
        };
        let registrar = {
            let hub = Arc::clone(&hub);
            tokio::spawn(async move {
                let mut late = Vec::new();
                for _ in 0..16 {
                    late.push(hub.connect().await);
                }
                late
            })
        };

        let report = broadcaster.await.unwrap();
        let late = registrar.await.unwrap();

        assert!(report.delivered >= 16);
        assert_eq!(report.dropped, 0);
        assert_eq!(hub.observer_count().await, 32);
        for rx in &mut receivers {
            assert_eq!(rx.try_recv().unwrap(), ReadingUpdate::new(3.0, 4.0));
        }
        drop(late);
    }
}
