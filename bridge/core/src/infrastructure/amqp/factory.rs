// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # AMQP 1.0 Connection Factory
//!
//! Opens broker connections over the installed security context:
//! TCP connect, mutual TLS handshake, SASL PLAIN, then the AMQP `open`
//! exchange. `fe2o3-amqp` is handed the finished TLS stream, so the
//! certificate policy is always ours and never the client library's default.

use async_trait::async_trait;
use fe2o3_amqp::connection::ConnectionHandle;
use fe2o3_amqp::sasl_profile::SaslProfile;
use fe2o3_amqp::Connection;
use tracing::debug;

use super::transport::{open_tls_stream, with_deadline};
use crate::domain::broker::{BrokerConnection, BrokerConnectionConfig, ConnectionFactory};
use crate::domain::error::BridgeError;
use crate::infrastructure::tls::InstalledSecurityContext;

/// Raw (unpooled) factory bound to one broker and one security context.
#[derive(Debug, Clone)]
pub struct AmqpConnectionFactory {
    context: InstalledSecurityContext,
    config: BrokerConnectionConfig,
}

impl AmqpConnectionFactory {
    /// Requires an installed context; there is no way to build one without.
    pub fn new(context: InstalledSecurityContext, config: BrokerConnectionConfig) -> Self {
        Self { context, config }
    }

    pub fn config(&self) -> &BrokerConnectionConfig {
        &self.config
    }

    async fn open(&self) -> Result<AmqpConnection, BridgeError> {
        let authority = self.config.authority();
        let stream = open_tls_stream(&self.context, &self.config).await?;

        let profile = SaslProfile::Plain {
            username: self.config.username().to_string(),
            password: self.config.password().to_string(),
        };

        let handle = Connection::builder()
            .container_id(self.config.container_id())
            .hostname(self.config.host())
            .sasl_profile(profile)
            .open_with_stream(stream)
            .await
            .map_err(|e| BridgeError::broker(format!("AMQP open with {} failed: {}", authority, e)))?;

        debug!(broker = %authority, container_id = %self.config.container_id(), "AMQP connection opened");
        Ok(AmqpConnection { handle })
    }
}

#[async_trait]
impl ConnectionFactory for AmqpConnectionFactory {
    type Connection = AmqpConnection;

    async fn create_connection(&self) -> Result<AmqpConnection, BridgeError> {
        let authority = self.config.authority();
        let result = with_deadline(self.config.connect_timeout(), &authority, self.open()).await;
        if result.is_err() {
            metrics::counter!("amqp_bridge_connection_failures_total").increment(1);
        }
        result
    }

    fn describe(&self) -> String {
        format!("amqps://{}", self.config.authority())
    }
}

/// Open AMQP 1.0 connection.
pub struct AmqpConnection {
    handle: ConnectionHandle<()>,
}

impl AmqpConnection {
    /// Underlying client handle, for opening sessions and links.
    pub fn handle_mut(&mut self) -> &mut ConnectionHandle<()> {
        &mut self.handle
    }
}

impl std::fmt::Debug for AmqpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmqpConnection")
            .field("closed", &self.handle.is_closed())
            .finish()
    }
}

#[async_trait]
impl BrokerConnection for AmqpConnection {
    fn is_open(&self) -> bool {
        !self.handle.is_closed()
    }

    async fn close(&mut self) -> Result<(), BridgeError> {
        self.handle
            .close()
            .await
            .map_err(|e| BridgeError::broker(format!("AMQP close failed: {}", e)))
    }
}
