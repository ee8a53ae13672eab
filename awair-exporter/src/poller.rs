//! Periodic refresh loop.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::client::AwairClient;
use crate::collector::SharedCollector;

/// Drives [`AirQualityCollector::refresh`](crate::collector::AirQualityCollector::refresh)
/// on a fixed interval.
pub struct Poller {
    collector: SharedCollector,
    client: AwairClient,
    interval: Duration,
}

impl Poller {
    /// Create a new poller.
    pub fn new(collector: SharedCollector, client: AwairClient, interval: Duration) -> Self {
        Self {
            collector,
            client,
            interval,
        }
    }

    /// Run the polling loop until the shutdown signal is received.
    ///
    /// The first refresh happens immediately. A slow fetch delays the next
    /// tick instead of causing a burst of catch-up fetches.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            url = %self.client.url(),
            interval_secs = self.interval.as_secs(),
            "Starting sensor poller"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    // Failures are logged and counted by the collector
                    if self.collector.refresh(&self.client).await.is_ok() {
                        debug!("Refresh complete");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Sensor poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::AirQualityCollector;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_poller_keeps_running_after_failures() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let collector = Arc::new(AirQualityCollector::new("default"));
        let client = AwairClient::new(&addr.to_string(), Duration::from_secs(1)).unwrap();
        let poller = Poller::new(collector.clone(), client, Duration::from_millis(20));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(poller.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(300)).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("poller did not stop")
            .unwrap();

        let stats = collector.stats();
        assert!(stats.refreshes_failed >= 2, "stats: {:?}", stats);
        assert_eq!(stats.refreshes_succeeded, 0);
        assert!(!collector.has_reading());
    }

    #[tokio::test]
    async fn test_poller_stops_when_sender_dropped() {
        let collector = Arc::new(AirQualityCollector::new("default"));
        let client = AwairClient::new("127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let poller = Poller::new(collector, client, Duration::from_secs(3600));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(poller.run(shutdown_rx));
        drop(shutdown_tx);

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("poller did not stop")
            .unwrap();
    }
}
