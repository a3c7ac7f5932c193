// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! AMQP Bridge Core
//!
//! Bootstraps a mutual TLS security context from PEM credential stores and a
//! bounded pool of authenticated AMQP 1.0 broker connections on top of it.
//!
//! # Architecture
//!
//! - **domain:** errors, bootstrap phases, broker seams, configuration
//! - **infrastructure:** rustls context and registry, AMQP transport and pool
//! - **application:** the ordered bootstrap sequence

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;
