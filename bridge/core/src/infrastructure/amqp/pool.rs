// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Pooled Connection Factory
//!
//! Bounded pool over any [`ConnectionFactory`], built on `deadpool::managed`.
//! Connections are created lazily up to `max_size`, idle ones are handed out
//! again, and connections the broker closed are dropped on recycle. Callers
//! beyond the cap wait for a release (optionally bounded by a timeout).

use deadpool::managed::{self, Metrics, Object, Pool, PoolError, RecycleError, RecycleResult};
use deadpool::Runtime;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::broker::{BrokerConnection, ConnectionFactory};
use crate::domain::error::BridgeError;

/// deadpool adapter around a raw factory.
#[derive(Debug)]
pub struct FactoryManager<F> {
    factory: F,
}

impl<F: ConnectionFactory> managed::Manager for FactoryManager<F> {
    type Type = F::Connection;
    type Error = BridgeError;

    async fn create(&self) -> Result<F::Connection, BridgeError> {
        let connection = self.factory.create_connection().await?;
        metrics::counter!("amqp_bridge_connections_created_total").increment(1);
        debug!(target_broker = %self.factory.describe(), "Pooled connection created");
        Ok(connection)
    }

    async fn recycle(&self, connection: &mut F::Connection, metrics: &Metrics) -> RecycleResult<BridgeError> {
        if connection.is_open() {
            return Ok(());
        }
        warn!(
            target_broker = %self.factory.describe(),
            recycled = metrics.recycle_count,
            "Discarding closed pooled connection"
        );
        Err(RecycleError::Backend(BridgeError::broker("pooled connection was closed")))
    }
}

/// A connection checked out of the pool; returned on drop.
pub type PooledConnection<F> = Object<FactoryManager<F>>;

/// Point-in-time pool accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub max_size: usize,
    /// Live underlying connections, idle or checked out
    pub size: usize,
    pub available: usize,
    pub in_use: usize,
    pub waiting: usize,
}

/// Bounded, shareable connection source.
pub struct PooledConnectionFactory<F: ConnectionFactory> {
    pool: Pool<FactoryManager<F>>,
    description: String,
}

impl<F: ConnectionFactory> PooledConnectionFactory<F> {
    /// Wrap `factory` in a pool of at most `max_size` connections.
    ///
    /// No connection is opened here.
    pub fn new(factory: F, max_size: usize, acquire_timeout: Option<Duration>) -> Result<Self, BridgeError> {
        if max_size == 0 {
            return Err(BridgeError::config("pool max size must be at least 1"));
        }

        let description = factory.describe();
        let pool = Pool::builder(FactoryManager { factory })
            .max_size(max_size)
            .wait_timeout(acquire_timeout)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| BridgeError::config(format!("failed to build connection pool: {}", e)))?;

        debug!(target_broker = %description, max_size, "Connection pool created");
        Ok(Self { pool, description })
    }

    /// Check out a connection, creating one if the pool is below its cap.
    pub async fn get(&self) -> Result<PooledConnection<F>, BridgeError> {
        let result = self.pool.get().await;
        metrics::gauge!("amqp_bridge_pool_size").set(self.pool.status().size as f64);

        result.map_err(|e| match e {
            PoolError::Backend(inner) => inner,
            PoolError::Timeout(_) => BridgeError::broker(format!(
                "timed out waiting for a pooled connection to {}",
                self.description
            )),
            PoolError::Closed => BridgeError::broker(format!("connection pool for {} is closed", self.description)),
            other => BridgeError::broker(other.to_string()),
        })
    }

    pub fn status(&self) -> PoolStatus {
        let status = self.pool.status();
        PoolStatus {
            max_size: status.max_size,
            size: status.size,
            available: status.available,
            in_use: status.size.saturating_sub(status.available),
            waiting: status.waiting,
        }
    }

    pub fn max_size(&self) -> usize {
        self.pool.status().max_size
    }

    pub fn describe(&self) -> &str {
        &self.description
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Stop handing out connections and drop the idle ones.
    pub fn close(&self) {
        self.pool.close();
    }
}

impl<F: ConnectionFactory> Clone for PooledConnectionFactory<F> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            description: self.description.clone(),
        }
    }
}

impl<F: ConnectionFactory> fmt::Debug for PooledConnectionFactory<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnectionFactory")
            .field("broker", &self.description)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct Counters {
        created: AtomicUsize,
        fail: AtomicBool,
    }

    #[derive(Debug)]
    struct StubFactory {
        counters: Arc<Counters>,
    }

    #[derive(Debug)]
    struct StubConnection {
        open: Arc<AtomicBool>,
    }

    #[async_trait]
    impl BrokerConnection for StubConnection {
        fn is_open(&self) -> bool {
            self.open.load(Ordering::SeqCst)
        }

        async fn close(&mut self) -> Result<(), BridgeError> {
            self.open.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait]
    impl ConnectionFactory for StubFactory {
        type Connection = StubConnection;

        async fn create_connection(&self) -> Result<StubConnection, BridgeError> {
            if self.counters.fail.load(Ordering::SeqCst) {
                return Err(BridgeError::broker("connection refused"));
            }
            self.counters.created.fetch_add(1, Ordering::SeqCst);
            Ok(StubConnection {
                open: Arc::new(AtomicBool::new(true)),
            })
        }

        fn describe(&self) -> String {
            "amqps://stub:5671".to_string()
        }
    }

    fn stub_pool(max: usize, timeout: Option<Duration>) -> (Arc<Counters>, PooledConnectionFactory<StubFactory>) {
        let counters = Arc::new(Counters::default());
        let pool = PooledConnectionFactory::new(
            StubFactory {
                counters: counters.clone(),
            },
            max,
            timeout,
        )
        .unwrap();
        (counters, pool)
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let counters = Arc::new(Counters::default());
        let err = PooledConnectionFactory::new(StubFactory { counters }, 0, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_lazy_creation_and_reuse() {
        let (counters, pool) = stub_pool(5, None);
        assert_eq!(pool.status().size, 0);
        assert_eq!(pool.max_size(), 5);

        {
            let _conn = pool.get().await.unwrap();
            assert_eq!(pool.status().in_use, 1);
        }
        {
            let _conn = pool.get().await.unwrap();
        }

        assert_eq!(counters.created.load(Ordering::SeqCst), 1);
        let status = pool.status();
        assert_eq!(status.size, 1);
        assert_eq!(status.available, 1);
        assert_eq!(status.in_use, 0);
    }

    #[tokio::test]
    async fn test_closed_connection_replaced_on_recycle() {
        let (counters, pool) = stub_pool(5, None);
        {
            let mut conn = pool.get().await.unwrap();
            conn.close().await.unwrap();
        }
        let conn = pool.get().await.unwrap();
        assert!(conn.is_open());
        assert_eq!(counters.created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_acquire_timeout_when_exhausted() {
        let (_counters, pool) = stub_pool(1, Some(Duration::from_millis(20)));
        let _held = pool.get().await.unwrap();

        let err = pool.get().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokerConnection);
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_factory_error_propagates() {
        let (counters, pool) = stub_pool(5, None);
        counters.fail.store(true, Ordering::SeqCst);

        let err = pool.get().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokerConnection);
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(pool.status().size, 0);
    }

    #[tokio::test]
    async fn test_closed_pool_rejects_get() {
        let (_counters, pool) = stub_pool(5, None);
        pool.close();
        assert!(pool.is_closed());
        assert!(pool.get().await.is_err());
    }
}
