// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use rustls::pki_types::ServerName;
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tracing::debug;

use crate::domain::broker::BrokerConnectionConfig;
use crate::domain::error::BridgeError;
use crate::infrastructure::tls::InstalledSecurityContext;

/// TCP connect plus mutual TLS handshake against the broker endpoint.
///
/// Both steps share the optional connect timeout.
pub async fn connect_tls(
    context: &InstalledSecurityContext,
    config: &BrokerConnectionConfig,
) -> Result<TlsStream<TcpStream>, BridgeError> {
    with_deadline(config.connect_timeout(), &config.authority(), open_tls_stream(context, config)).await
}

pub(crate) async fn open_tls_stream(
    context: &InstalledSecurityContext,
    config: &BrokerConnectionConfig,
) -> Result<TlsStream<TcpStream>, BridgeError> {
    let authority = config.authority();
    let server_name = ServerName::try_from(config.host().to_string()).map_err(|e| {
        BridgeError::broker(format!("invalid broker host '{}': {}", config.host(), e))
    })?;

    let tcp = TcpStream::connect((config.host(), config.port()))
        .await
        .map_err(|e| BridgeError::broker(format!("failed to connect to {}: {}", authority, e)))?;
    tcp.set_nodelay(true)
        .map_err(|e| BridgeError::broker(format!("failed to configure socket to {}: {}", authority, e)))?;

    let stream = context
        .connector()
        .connect(server_name, tcp)
        .await
        .map_err(|e| BridgeError::broker(format!("TLS handshake with {} failed: {}", authority, e)))?;

    debug!(broker = %authority, protocol = %context.protocol(), "TLS session established");
    Ok(stream)
}

/// Run `fut`, failing with a broker error once `timeout` elapses.
pub(crate) async fn with_deadline<T>(
    timeout: Option<Duration>,
    authority: &str,
    fut: impl Future<Output = Result<T, BridgeError>>,
) -> Result<T, BridgeError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
            BridgeError::broker(format!(
                "connection to {} timed out after {}ms",
                authority,
                limit.as_millis()
            ))
        })?,
        None => fut.await,
    }
}
