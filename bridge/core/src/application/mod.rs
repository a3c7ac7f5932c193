// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod bootstrap;
pub mod connection_factory_provider;
pub mod security_context_builder;

pub use bootstrap::{Bootstrap, PooledFactoryReady};
pub use connection_factory_provider::{probe, ConnectionFactoryProvider};
pub use security_context_builder::SecurityContextBuilder;
