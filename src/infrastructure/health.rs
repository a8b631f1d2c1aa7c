//! Background liveness polling.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::connection::{ConnectionManager, Connector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthOutcome { Healthy, Reconnected, ReconnectFailed }

/// Pings the store on a fixed interval and reconnects on failure.
///
/// Failed reconnects are retried on the next tick, forever, without backoff.
pub struct HealthMonitor<C: Connector> {
    manager: Arc<ConnectionManager<C>>,
    target: String,
    interval: Duration,
}

impl<C: Connector> HealthMonitor<C> {
    pub fn new(manager: Arc<ConnectionManager<C>>, target: impl Into<String>, interval: Duration) -> Self {
        Self { manager, target: target.into(), interval }
    }

    /// One poll iteration.
    pub async fn check_once(&self) -> HealthOutcome {
        let Err(err) = self.manager.ping().await else { return HealthOutcome::Healthy };
        tracing::warn!(error = %err, "Database connection lost");

        match self.manager.reconnect(&self.target).await {
            Ok(()) => {
                tracing::info!("Successfully reconnected to the database");
                HealthOutcome::Reconnected
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to reconnect");
                HealthOutcome::ReconnectFailed
            }
        }
    }

    /// Runs until `shutdown` flips to `true`.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => { self.check_once().await; }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() { break; }
                    }
                }
            }
            tracing::debug!("Health monitor stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::connection::testing::FakeServer;
    use std::sync::atomic::Ordering;

    fn monitor(server: &FakeServer) -> HealthMonitor<FakeServer> {
        let manager = Arc::new(ConnectionManager::new(server.clone(), Duration::from_millis(50)));
        HealthMonitor::new(manager, "postgres://fake", Duration::from_millis(20))
    }

    #[tokio::test]
    async fn test_degraded_start_recovers_on_first_check() {
        let server = FakeServer::default();
        let m = monitor(&server);
        assert_eq!(m.check_once().await, HealthOutcome::Reconnected);
        assert_eq!(m.check_once().await, HealthOutcome::Healthy);
    }

    #[tokio::test]
    async fn test_reconnect_failure_retries_next_tick() {
        let server = FakeServer::default();
        server.unreachable.store(true, Ordering::SeqCst);
        let m = monitor(&server);
        assert_eq!(m.check_once().await, HealthOutcome::ReconnectFailed);
        assert_eq!(m.check_once().await, HealthOutcome::ReconnectFailed);

        server.unreachable.store(false, Ordering::SeqCst);
        assert_eq!(m.check_once().await, HealthOutcome::Reconnected);
    }

    #[tokio::test]
    async fn test_spawned_monitor_reconnects_and_stops() {
        let server = FakeServer::default();
        let m = monitor(&server);
        let manager = m.manager.clone();
        let (tx, rx) = watch::channel(false);
        let task = m.spawn(rx);

        tokio::time::timeout(Duration::from_secs(2), async {
            while !manager.is_connected() { tokio::time::sleep(Duration::from_millis(5)).await; }
        })
        .await
        .expect("monitor should connect");

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
    }
}
