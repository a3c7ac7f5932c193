// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Broker Connection Value Objects
//!
//! [`BrokerConnectionConfig`] is the immutable target + credentials record the
//! connection factory is built from, and [`BrokerConnection`] /
//! [`ConnectionFactory`] are the seams the pool is written against. The AMQP
//! implementation lives in `crate::infrastructure::amqp`.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use url::Url;

use super::error::BridgeError;

/// IANA port for AMQP over TLS.
pub const AMQPS_DEFAULT_PORT: u16 = 5671;

/// Immutable broker target and credentials.
///
/// Only `amqps://` URIs are accepted: there is no plaintext mode to fall back
/// to.
#[derive(Clone)]
pub struct BrokerConnectionConfig {
    uri: Url,
    host: String,
    port: u16,
    username: String,
    password: String,
    connect_timeout: Option<Duration>,
    container_id: String,
}

impl BrokerConnectionConfig {
    pub fn new(
        uri: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, BridgeError> {
        let parsed = Url::parse(uri)
            .map_err(|e| BridgeError::config(format!("broker.host '{}' is not a valid URI: {}", uri, e)))?;

        if parsed.scheme() != "amqps" {
            return Err(BridgeError::config(format!(
                "broker.host must use the amqps scheme, got '{}'",
                parsed.scheme()
            )));
        }

        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| BridgeError::config(format!("broker.host '{}' has no host", uri)))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = parsed.port().unwrap_or(AMQPS_DEFAULT_PORT);

        let username = username.into();
        if username.is_empty() {
            return Err(BridgeError::config("broker.username cannot be empty"));
        }

        Ok(Self {
            uri: parsed,
            host,
            port,
            username,
            password: password.into(),
            connect_timeout: None,
            container_id: format!("amqp-bridge-{}", uuid::Uuid::new_v4()),
        })
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_container_id(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = container_id.into();
        self
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, for log lines and error messages.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }
}

impl fmt::Debug for BrokerConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConnectionConfig")
            .field("uri", &self.uri.as_str())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .field("container_id", &self.container_id)
            .finish()
    }
}

/// A live connection handed out by a [`ConnectionFactory`].
#[async_trait]
pub trait BrokerConnection: Send + Sync + 'static {
    /// Whether the connection can still carry traffic. Pools use this to
    /// discard dead connections on recycle.
    fn is_open(&self) -> bool;

    async fn close(&mut self) -> Result<(), BridgeError>;
}

/// Creates authenticated broker connections on demand.
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    type Connection: BrokerConnection;

    async fn create_connection(&self) -> Result<Self::Connection, BridgeError>;

    /// Human-readable target, used in logs.
    fn describe(&self) -> String;
}
