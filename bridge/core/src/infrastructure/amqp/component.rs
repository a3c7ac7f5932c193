// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::fmt;
use tracing::info;

use super::pool::{PoolStatus, PooledConnection, PooledConnectionFactory};
use crate::domain::broker::ConnectionFactory;
use crate::domain::error::BridgeError;

/// Connection source handed to the messaging integration layer.
///
/// Routes and consumers only ever see this type; they borrow connections
/// from the pool and return them on drop.
pub struct AmqpComponent<F: ConnectionFactory> {
    pool: PooledConnectionFactory<F>,
}

impl<F: ConnectionFactory> AmqpComponent<F> {
    pub fn new(pool: PooledConnectionFactory<F>) -> Result<Self, BridgeError> {
        if pool.is_closed() {
            return Err(BridgeError::config(format!(
                "connection pool for {} is closed",
                pool.describe()
            )));
        }
        if pool.max_size() == 0 {
            return Err(BridgeError::config(format!(
                "connection pool for {} has no capacity",
                pool.describe()
            )));
        }

        info!(target_broker = %pool.describe(), max_connections = pool.max_size(), "AMQP component ready");
        Ok(Self { pool })
    }

    pub async fn connection(&self) -> Result<PooledConnection<F>, BridgeError> {
        self.pool.get().await
    }

    pub fn connection_factory(&self) -> &PooledConnectionFactory<F> {
        &self.pool
    }

    pub fn status(&self) -> PoolStatus {
        self.pool.status()
    }

    pub fn shutdown(&self) {
        info!(target_broker = %self.pool.describe(), "Closing AMQP connection pool");
        self.pool.close();
    }
}

impl<F: ConnectionFactory> Clone for AmqpComponent<F> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

impl<F: ConnectionFactory> fmt::Debug for AmqpComponent<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmqpComponent").field("pool", &self.pool).finish()
    }
}
