// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Bridge Error Taxonomy
//!
//! Every failure the bootstrap sequence can produce maps onto exactly one
//! [`BridgeError`] variant. All of them are fatal: the process entry point
//! aborts startup on the first one it sees.
//!
//! | Variant | Subsystem | Raised by |
//! |---------|-----------|-----------|
//! | `StoreLoad` | security | credential store file unreadable |
//! | `StoreFormat` | security | malformed store, wrong/missing password |
//! | `SecurityInit` | security | unsupported protocol, key algorithm or trust material |
//! | `SecurityContextInit` | security | managers rejected, context already installed |
//! | `BrokerConnection` | connection | DNS/TCP, TLS handshake, AMQP open or SASL failure |
//! | `OrderingViolation` | connection | connect attempted before a context was installed |
//! | `Configuration` | configuration | invalid inputs handed to the bridge |
//!
//! Display strings carry a fixed subsystem prefix so that the user-visible
//! startup error names which phase failed.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub const SECURITY_PREFIX: &str = "unable to create SSL context";
pub const CONNECTION_PREFIX: &str = "unable to create AMQP connection factory";
pub const CONFIGURATION_PREFIX: &str = "invalid bridge configuration";

/// Which part of the bridge produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    Security,
    Connection,
    Configuration,
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subsystem::Security => f.write_str("security"),
            Subsystem::Connection => f.write_str("connection"),
            Subsystem::Configuration => f.write_str("configuration"),
        }
    }
}

/// Field-less mirror of [`BridgeError`] for matching in callers and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    StoreLoad,
    StoreFormat,
    SecurityInit,
    SecurityContextInit,
    BrokerConnection,
    OrderingViolation,
    Configuration,
}

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Credential store file is missing or unreadable
    #[error("unable to create SSL context: failed to read credential store {path}: {reason}")]
    StoreLoad { path: PathBuf, reason: String },

    /// Credential store is malformed or the password does not match
    #[error("unable to create SSL context: failed to decode credential store {path}: {reason}")]
    StoreFormat { path: PathBuf, reason: String },

    #[error("unable to create SSL context: {0}")]
    SecurityInit(String),

    #[error("unable to create SSL context: initialization rejected: {0}")]
    SecurityContextInit(String),

    #[error("unable to create AMQP connection factory: {0}")]
    BrokerConnection(String),

    #[error("unable to create AMQP connection factory: no security context installed ({0})")]
    OrderingViolation(String),

    #[error("invalid bridge configuration: {0}")]
    Configuration(String),
}

impl BridgeError {
    pub fn store_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        BridgeError::StoreLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn store_format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        BridgeError::StoreFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn security_init(reason: impl Into<String>) -> Self {
        BridgeError::SecurityInit(reason.into())
    }

    pub fn context_init(reason: impl Into<String>) -> Self {
        BridgeError::SecurityContextInit(reason.into())
    }

    pub fn broker(reason: impl Into<String>) -> Self {
        BridgeError::BrokerConnection(reason.into())
    }

    pub fn ordering(reason: impl Into<String>) -> Self {
        BridgeError::OrderingViolation(reason.into())
    }

    pub fn config(reason: impl Into<String>) -> Self {
        BridgeError::Configuration(reason.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::StoreLoad { .. } => ErrorKind::StoreLoad,
            BridgeError::StoreFormat { .. } => ErrorKind::StoreFormat,
            BridgeError::SecurityInit(_) => ErrorKind::SecurityInit,
            BridgeError::SecurityContextInit(_) => ErrorKind::SecurityContextInit,
            BridgeError::BrokerConnection(_) => ErrorKind::BrokerConnection,
            BridgeError::OrderingViolation(_) => ErrorKind::OrderingViolation,
            BridgeError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    pub fn subsystem(&self) -> Subsystem {
        match self.kind() {
            ErrorKind::StoreLoad
            | ErrorKind::StoreFormat
            | ErrorKind::SecurityInit
            | ErrorKind::SecurityContextInit => Subsystem::Security,
            ErrorKind::BrokerConnection | ErrorKind::OrderingViolation => Subsystem::Connection,
            ErrorKind::Configuration => Subsystem::Configuration,
        }
    }
}
