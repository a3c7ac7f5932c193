// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Security Context
//!
//! A [`SecurityContext`] is a finished `rustls` client configuration: one
//! protocol version set, the client identity and the broker verifier.
//!
//! The process-wide default lives in a [`SecurityContextRegistry`]. The slot is
//! written at most once and readers only ever see a fully built context.
//! Installing hands back an [`InstalledSecurityContext`], which is the only
//! value connection factories accept.

use rustls::{ClientConfig, SupportedProtocolVersion};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use tokio_rustls::TlsConnector;
use tracing::info;

use super::{crypto_provider, KeyManagerSet, TrustManagerSet};
use crate::domain::error::BridgeError;

static TLS12_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS12];
static TLS13_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS13];

/// Named protocol accepted in `server.ssl.protocol`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsProtocol {
    /// `TLSv1.2`
    Tls12,
    /// `TLSv1.3`
    Tls13,
    /// `TLS`: any version the provider supports
    Any,
}

impl TlsProtocol {
    pub fn versions(self) -> &'static [&'static SupportedProtocolVersion] {
        match self {
            TlsProtocol::Tls12 => TLS12_ONLY,
            TlsProtocol::Tls13 => TLS13_ONLY,
            TlsProtocol::Any => rustls::ALL_VERSIONS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TlsProtocol::Tls12 => "TLSv1.2",
            TlsProtocol::Tls13 => "TLSv1.3",
            TlsProtocol::Any => "TLS",
        }
    }
}

impl fmt::Display for TlsProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TlsProtocol {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tlsv1.2" => Ok(TlsProtocol::Tls12),
            "tlsv1.3" => Ok(TlsProtocol::Tls13),
            "tls" => Ok(TlsProtocol::Any),
            _ => Err(BridgeError::security_init(format!(
                "protocol '{}' is not supported (expected TLSv1.2, TLSv1.3 or TLS)",
                s
            ))),
        }
    }
}

/// Client-side mutual TLS configuration for broker connections.
pub struct SecurityContext {
    protocol: TlsProtocol,
    config: Arc<ClientConfig>,
}

impl SecurityContext {
    pub fn protocol(&self) -> TlsProtocol {
        self.protocol
    }

    pub fn client_config(&self) -> Arc<ClientConfig> {
        self.config.clone()
    }

    pub fn connector(&self) -> TlsConnector {
        TlsConnector::from(self.config.clone())
    }
}

impl fmt::Debug for SecurityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityContext")
            .field("protocol", &self.protocol)
            .field("client_auth", &self.config.client_auth_cert_resolver.has_certs())
            .finish()
    }
}

/// Build a context for `protocol` from derived manager sets.
///
/// The protocol name is checked before any manager material is touched.
///
/// # Errors
///
/// - `SecurityInit` for an unknown protocol name or a version set the
///   provider cannot serve
/// - `SecurityContextInit` if the identity is rejected, e.g. the key does not
///   belong to the leaf certificate
pub fn build_security_context(
    protocol: &str,
    key_managers: KeyManagerSet,
    trust_managers: TrustManagerSet,
) -> Result<SecurityContext, BridgeError> {
    let protocol: TlsProtocol = protocol.parse()?;

    let (cert_chain, key) = key_managers.into_parts();

    let config = ClientConfig::builder_with_provider(crypto_provider())
        .with_protocol_versions(protocol.versions())
        .map_err(|e| BridgeError::security_init(format!("{} unavailable: {}", protocol, e)))?
        .with_webpki_verifier(trust_managers.verifier())
        .with_client_auth_cert(cert_chain, key)
        .map_err(|e| BridgeError::context_init(format!("client identity rejected: {}", e)))?;

    Ok(SecurityContext {
        protocol,
        config: Arc::new(config),
    })
}

/// Handle to the context installed in a [`SecurityContextRegistry`].
///
/// Cannot be constructed outside the registry, so holding one proves the
/// install happened.
#[derive(Debug, Clone)]
pub struct InstalledSecurityContext(Arc<SecurityContext>);

impl Deref for InstalledSecurityContext {
    type Target = SecurityContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Single-assignment slot for the default security context.
#[derive(Debug)]
pub struct SecurityContextRegistry {
    slot: OnceLock<Arc<SecurityContext>>,
}

static GLOBAL_REGISTRY: SecurityContextRegistry = SecurityContextRegistry::new();

impl SecurityContextRegistry {
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    /// Process-wide default registry.
    pub fn global() -> &'static SecurityContextRegistry {
        &GLOBAL_REGISTRY
    }

    /// Install `context` as the default. Only [`build_and_install`] writes
    /// the slot.
    ///
    /// # Errors
    ///
    /// `SecurityContextInit` if a context is already installed; the existing
    /// one is left untouched.
    pub(crate) fn install(&self, context: SecurityContext) -> Result<InstalledSecurityContext, BridgeError> {
        let protocol = context.protocol();
        let context = Arc::new(context);
        self.slot.set(context.clone()).map_err(|_| {
            BridgeError::context_init("a default security context is already installed")
        })?;

        info!(%protocol, "Installed default security context");
        Ok(InstalledSecurityContext(context))
    }

    pub fn current(&self) -> Option<InstalledSecurityContext> {
        self.slot.get().cloned().map(InstalledSecurityContext)
    }

    pub fn is_installed(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Installed context, or `OrderingViolation` naming `operation`.
    pub fn require(&self, operation: &str) -> Result<InstalledSecurityContext, BridgeError> {
        self.current().ok_or_else(|| {
            BridgeError::ordering(format!("{} requires an installed security context", operation))
        })
    }
}

impl Default for SecurityContextRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a context and install it into `registry` in one step.
///
/// Reached from outside the crate through `SecurityContextBuilder`.
pub(crate) fn build_and_install(
    registry: &SecurityContextRegistry,
    protocol: &str,
    key_managers: KeyManagerSet,
    trust_managers: TrustManagerSet,
) -> Result<InstalledSecurityContext, BridgeError> {
    let context = build_security_context(protocol, key_managers, trust_managers)?;
    registry.install(context)
}
