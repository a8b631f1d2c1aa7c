//! Connection management for the relational store.
//!
//! The active pool lives behind an atomically swappable handle. Request
//! handlers load it per call, so a swap performed by the health monitor is
//! visible to every request issued afterwards.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::Connection;
use thiserror::Error;
use tokio::sync::{watch, Mutex};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("database connection is not initialized")]
    NotInitialized,

    #[error("failed to connect to database: {0}")]
    Connect(String),

    #[error("failed to ping database: {0}")]
    Ping(String),

    #[error("database ping timed out after {0:?}")]
    Timeout(Duration),
}

/// Pool sizing and lifetime bounds.
#[derive(Debug, Clone)]
pub struct PoolPolicy {
    pub max_connections: u32,
    /// Idle floor kept warm by the pool.
    pub min_connections: u32,
    /// Connections older than this are retired and replaced by the pool.
    pub max_lifetime: Duration,
    pub idle_timeout: Duration,
    /// Upper bound on waiting for a free connection.
    pub acquire_timeout: Duration,
    /// Server-side cancellation for slow statements.
    pub statement_timeout: Option<Duration>,
}

impl Default for PoolPolicy {
    fn default() -> Self {
        Self {
            max_connections: 25,
            min_connections: 10,
            max_lifetime: Duration::from_secs(5 * 60),
            idle_timeout: Duration::from_secs(10 * 60),
            acquire_timeout: Duration::from_secs(10),
            statement_timeout: Some(Duration::from_secs(5)),
        }
    }
}

/// Opens, probes and closes handles to a backing store.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Handle: Clone + Send + Sync + 'static;

    async fn open(&self, target: &str) -> Result<Self::Handle, ConnectionError>;

    async fn probe(&self, handle: &Self::Handle) -> Result<(), ConnectionError>;

    /// Best-effort; never fails.
    async fn close(&self, handle: Self::Handle);
}

/// `PostgreSQL` pool connector.
#[derive(Debug, Clone, Default)]
pub struct PgConnector {
    policy: PoolPolicy,
}

impl PgConnector {
    pub fn new(policy: PoolPolicy) -> Self { Self { policy } }
}

#[async_trait]
impl Connector for PgConnector {
    type Handle = PgPool;

    async fn open(&self, target: &str) -> Result<PgPool, ConnectionError> {
        let mut options = PgConnectOptions::from_str(target).map_err(|e| ConnectionError::Connect(e.to_string()))?;
        if let Some(timeout) = self.policy.statement_timeout {
            options = options.options([("statement_timeout", timeout.as_millis().to_string())]);
        }

        PgPoolOptions::new()
            .max_connections(self.policy.max_connections)
            .min_connections(self.policy.min_connections)
            .max_lifetime(self.policy.max_lifetime)
            .idle_timeout(self.policy.idle_timeout)
            .acquire_timeout(self.policy.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| ConnectionError::Connect(e.to_string()))
    }

    async fn probe(&self, pool: &PgPool) -> Result<(), ConnectionError> {
        let mut conn = pool.acquire().await.map_err(|e| ConnectionError::Ping(e.to_string()))?;
        conn.ping().await.map_err(|e| ConnectionError::Ping(e.to_string()))
    }

    async fn close(&self, pool: PgPool) {
        pool.close().await;
    }
}

/// Owns the active handle and swaps it on reconnect.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    active: ArcSwapOption<C::Handle>,
    reconnect_lock: Mutex<()>,
    probe_timeout: Duration,
    /// Count of successful connects.
    connects: watch::Sender<u64>,
}

impl<C: Connector> ConnectionManager<C> {
    /// Creates a manager with no active connection.
    pub fn new(connector: C, probe_timeout: Duration) -> Self {
        let (connects, _) = watch::channel(0);
        Self { connector, active: ArcSwapOption::empty(), reconnect_lock: Mutex::new(()), probe_timeout, connects }
    }

    /// Observes the number of successful connects; the value only grows.
    pub fn subscribe(&self) -> watch::Receiver<u64> { self.connects.subscribe() }

    pub fn is_connected(&self) -> bool { self.active.load().is_some() }

    /// Current handle, if any.
    pub fn handle(&self) -> Result<C::Handle, ConnectionError> {
        self.active.load_full().map(|h| (*h).clone()).ok_or(ConnectionError::NotInitialized)
    }

    pub async fn ping(&self) -> Result<(), ConnectionError> {
        let handle = self.handle()?;
        self.probe(&handle).await
    }

    /// Replaces the active handle with a freshly opened and probed one.
    ///
    /// The previous handle is dropped from the manager before the new one is
    /// opened, so on failure the manager holds no connection.
    pub async fn reconnect(&self, target: &str) -> Result<(), ConnectionError> {
        let _guard = self.reconnect_lock.lock().await;

        self.close_active().await;

        let handle = self.connector.open(target).await?;
        if let Err(err) = self.probe(&handle).await {
            self.connector.close(handle).await;
            return Err(err);
        }

        self.active.store(Some(Arc::new(handle)));
        self.connects.send_modify(|n| *n += 1);
        Ok(())
    }

    /// Closes and forgets the active handle.
    pub async fn close(&self) {
        let _guard = self.reconnect_lock.lock().await;
        self.close_active().await;
    }

    async fn close_active(&self) {
        if let Some(previous) = self.active.swap(None) {
            let previous = Arc::try_unwrap(previous).unwrap_or_else(|shared| (*shared).clone());
            self.connector.close(previous).await;
        }
    }

    async fn probe(&self, handle: &C::Handle) -> Result<(), ConnectionError> {
        match tokio::time::timeout(self.probe_timeout, self.connector.probe(handle)).await {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::Timeout(self.probe_timeout)),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeServer;
    use super::*;
    use std::sync::atomic::Ordering;

    fn manager(server: &FakeServer) -> ConnectionManager<FakeServer> {
        ConnectionManager::new(server.clone(), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_ping_fails_without_connection() {
        let m = manager(&FakeServer::default());
        assert_eq!(m.ping().await, Err(ConnectionError::NotInitialized));
        assert!(!m.is_connected());
    }

    #[tokio::test]
    async fn test_reconnect_after_drop_restores_ping() {
        let server = FakeServer::default();
        let m = manager(&server);
        m.reconnect("postgres://fake").await.unwrap();
        assert!(m.ping().await.is_ok());

        m.handle().unwrap().drop_connection();
        assert!(matches!(m.ping().await, Err(ConnectionError::Ping(_))));

        m.reconnect("postgres://fake").await.unwrap();
        assert!(m.ping().await.is_ok());
        assert_eq!(m.handle().unwrap().generation, 2);
        assert_eq!(server.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_reconnect_leaves_no_connection() {
        let server = FakeServer::default();
        let m = manager(&server);
        m.reconnect("postgres://fake").await.unwrap();

        server.unreachable.store(true, Ordering::SeqCst);
        let err = m.reconnect("postgres://fake").await.unwrap_err();
        assert!(matches!(err, ConnectionError::Connect(_)));
        assert!(!m.is_connected());
        assert_eq!(m.ping().await, Err(ConnectionError::NotInitialized));
        assert_eq!(server.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_probe_timeout_rejects_new_handle() {
        let server = FakeServer::default();
        server.hang_probes.store(true, Ordering::SeqCst);
        let m = manager(&server);
        let err = m.reconnect("postgres://fake").await.unwrap_err();
        assert_eq!(err, ConnectionError::Timeout(Duration::from_millis(50)));
        assert!(!m.is_connected());
        assert_eq!(server.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_successful_connects_only() {
        let server = FakeServer::default();
        let m = manager(&server);
        let mut connects = m.subscribe();

        server.unreachable.store(true, Ordering::SeqCst);
        assert!(m.reconnect("postgres://fake").await.is_err());
        assert_eq!(*connects.borrow(), 0);

        server.unreachable.store(false, Ordering::SeqCst);
        m.reconnect("postgres://fake").await.unwrap();
        let seen = tokio::time::timeout(Duration::from_secs(1), connects.wait_for(|n| *n > 0)).await.unwrap().unwrap();
        assert_eq!(*seen, 1);
    }

    #[tokio::test]
    async fn test_close_forgets_handle() {
        let server = FakeServer::default();
        let m = manager(&server);
        m.reconnect("postgres://fake").await.unwrap();
        m.close().await;
        assert!(!m.is_connected());
        assert_eq!(server.closed.load(Ordering::SeqCst), 1);
    }
}
