// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! AMQP 1.0 over mutual TLS: transport, raw factory, bounded pool and the
//! component exposed to the messaging layer.

pub mod component;
pub mod factory;
pub mod pool;
pub mod transport;

pub use component::AmqpComponent;
pub use factory::{AmqpConnection, AmqpConnectionFactory};
pub use pool::{PoolStatus, PooledConnection, PooledConnectionFactory};
pub use transport::connect_tls;
