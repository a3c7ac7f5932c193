// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain types shared by every layer: the error taxonomy, bootstrap phases,
//! broker connection seams and the YAML configuration model.

pub mod bootstrap;
pub mod bridge_config;
pub mod broker;
pub mod error;

pub use bootstrap::{BootstrapFailure, BootstrapPhase};
pub use bridge_config::{BridgeConfig, DEFAULT_MAX_CONNECTIONS};
pub use broker::{BrokerConnection, BrokerConnectionConfig, ConnectionFactory};
pub use error::{BridgeError, ErrorKind, Subsystem};
