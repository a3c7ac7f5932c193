// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::time::Duration;
use tracing::info;

use crate::domain::broker::{BrokerConnection, BrokerConnectionConfig, ConnectionFactory};
use crate::domain::error::BridgeError;
use crate::infrastructure::amqp::{AmqpComponent, AmqpConnectionFactory, PooledConnectionFactory};
use crate::infrastructure::tls::{InstalledSecurityContext, SecurityContextRegistry};

/// Builds broker connection factories on top of the installed context.
pub struct ConnectionFactoryProvider<'r> {
    registry: &'r SecurityContextRegistry,
}

impl<'r> ConnectionFactoryProvider<'r> {
    pub fn new(registry: &'r SecurityContextRegistry) -> Self {
        Self { registry }
    }

    /// AMQP factory for `config`, verified by opening and closing one
    /// connection.
    ///
    /// # Errors
    ///
    /// - `OrderingViolation` if no security context is installed
    /// - `BrokerConnection` if the probe fails at any layer
    pub async fn create_authenticated_factory(
        &self,
        config: BrokerConnectionConfig,
    ) -> Result<AmqpConnectionFactory, BridgeError> {
        self.create_probed_factory(|context| AmqpConnectionFactory::new(context, config))
            .await
    }

    /// Like [`Self::create_authenticated_factory`] for any factory built from
    /// the installed context.
    pub async fn create_probed_factory<F, B>(&self, build: B) -> Result<F, BridgeError>
    where
        F: ConnectionFactory,
        B: FnOnce(InstalledSecurityContext) -> F,
    {
        let context = self.registry.require("create_authenticated_factory")?;
        let factory = build(context);
        probe(&factory).await?;
        Ok(factory)
    }

    /// Bound `factory` to at most `max_connections` live connections.
    pub fn wrap_in_pool<F: ConnectionFactory>(
        &self,
        factory: F,
        max_connections: usize,
        acquire_timeout: Option<Duration>,
    ) -> Result<PooledConnectionFactory<F>, BridgeError> {
        PooledConnectionFactory::new(factory, max_connections, acquire_timeout)
    }

    pub fn amqp_component<F: ConnectionFactory>(
        &self,
        pool: PooledConnectionFactory<F>,
    ) -> Result<AmqpComponent<F>, BridgeError> {
        AmqpComponent::new(pool)
    }
}

/// Open one connection and close it again.
pub async fn probe<F: ConnectionFactory>(factory: &F) -> Result<(), BridgeError> {
    let target = factory.describe();
    let mut connection = factory.create_connection().await?;
    connection.close().await?;
    info!(target_broker = %target, "Broker connectivity probe succeeded");
    Ok(())
}
