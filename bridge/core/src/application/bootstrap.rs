// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Bootstrap Sequence
//!
//! Drives one bootstrap run through its phases:
//!
//! ```text
//! UNSTARTED -> STORES_LOADED -> CONTEXT_INSTALLED -> FACTORY_PROBED -> POOLED_FACTORY_READY
//! ```
//!
//! Each step consumes the [`Bootstrap`] and returns it in the next phase, so
//! steps cannot be called out of order. The first error ends the run with a
//! [`BootstrapFailure`] naming the last phase reached; there is no retry.

use tracing::{error, info};

use super::connection_factory_provider::ConnectionFactoryProvider;
use super::security_context_builder::SecurityContextBuilder;
use crate::domain::bootstrap::{BootstrapFailure, BootstrapPhase};
use crate::domain::bridge_config::BridgeConfig;
use crate::domain::broker::{BrokerConnectionConfig, ConnectionFactory};
use crate::domain::error::BridgeError;
use crate::infrastructure::amqp::{AmqpComponent, AmqpConnectionFactory, PooledConnectionFactory};
use crate::infrastructure::tls::{CredentialStore, InstalledSecurityContext, SecurityContextRegistry};

/// Marker for the state carried between steps.
pub trait Phase {
    const PHASE: BootstrapPhase;
}

pub struct Unstarted;

pub struct StoresLoaded {
    key_store: CredentialStore,
    trust_store: CredentialStore,
}

pub struct ContextInstalled {
    context: InstalledSecurityContext,
}

pub struct FactoryProbed<F> {
    factory: F,
}

pub struct PooledFactoryReady<F: ConnectionFactory> {
    pool: PooledConnectionFactory<F>,
}

impl Phase for Unstarted {
    const PHASE: BootstrapPhase = BootstrapPhase::Unstarted;
}

impl Phase for StoresLoaded {
    const PHASE: BootstrapPhase = BootstrapPhase::StoresLoaded;
}

impl Phase for ContextInstalled {
    const PHASE: BootstrapPhase = BootstrapPhase::ContextInstalled;
}

impl<F> Phase for FactoryProbed<F> {
    const PHASE: BootstrapPhase = BootstrapPhase::FactoryProbed;
}

impl<F: ConnectionFactory> Phase for PooledFactoryReady<F> {
    const PHASE: BootstrapPhase = BootstrapPhase::PooledFactoryReady;
}

pub struct Bootstrap<'r, P> {
    config: BridgeConfig,
    registry: &'r SecurityContextRegistry,
    state: P,
}

impl<'r, P: Phase> Bootstrap<'r, P> {
    pub fn phase(&self) -> BootstrapPhase {
        P::PHASE
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    fn advance<N: Phase>(self, state: N) -> Bootstrap<'r, N> {
        info!(from = %P::PHASE, to = %N::PHASE, "Bootstrap phase complete");
        Bootstrap {
            config: self.config,
            registry: self.registry,
            state,
        }
    }
}

fn fail<P: Phase>(source: BridgeError) -> BootstrapFailure {
    error!(reached = %P::PHASE, subsystem = %source.subsystem(), "Bootstrap failed: {}", source);
    BootstrapFailure::new(P::PHASE, source)
}

impl<'r> Bootstrap<'r, Unstarted> {
    pub fn new(config: BridgeConfig, registry: &'r SecurityContextRegistry) -> Self {
        Self {
            config,
            registry,
            state: Unstarted,
        }
    }

    /// Validate the configuration and open both credential stores.
    pub fn load_stores(self) -> Result<Bootstrap<'r, StoresLoaded>, BootstrapFailure> {
        match self.open_stores() {
            Ok(state) => Ok(self.advance(state)),
            Err(e) => Err(fail::<Unstarted>(e)),
        }
    }

    fn open_stores(&self) -> Result<StoresLoaded, BridgeError> {
        self.config.validate()?;

        let ssl = &self.config.server.ssl;
        let password = self.config.key_store_password()?;
        let builder = SecurityContextBuilder::new(self.registry);

        let key_store = builder.load_store(&ssl.key_store, password.as_deref())?;
        let trust_store = builder.load_store(&ssl.trust_store, None)?;
        Ok(StoresLoaded {
            key_store,
            trust_store,
        })
    }

    /// Run every step against the AMQP broker named in the configuration.
    pub async fn run(
        config: BridgeConfig,
        registry: &'r SecurityContextRegistry,
    ) -> Result<Bootstrap<'r, PooledFactoryReady<AmqpConnectionFactory>>, BootstrapFailure> {
        Bootstrap::new(config, registry)
            .load_stores()?
            .install_context()?
            .probe_broker()
            .await?
            .into_pool()
    }
}

impl<'r> Bootstrap<'r, StoresLoaded> {
    /// Derive key and trust managers and install the default context.
    pub fn install_context(self) -> Result<Bootstrap<'r, ContextInstalled>, BootstrapFailure> {
        match self.derive_and_install() {
            Ok(context) => Ok(self.advance(ContextInstalled { context })),
            Err(e) => Err(fail::<StoresLoaded>(e)),
        }
    }

    fn derive_and_install(&self) -> Result<InstalledSecurityContext, BridgeError> {
        let builder = SecurityContextBuilder::new(self.registry);
        let key_managers = builder.derive_key_managers(&self.state.key_store)?;
        let trust_managers = builder.derive_trust_managers(&self.state.trust_store)?;
        builder.build_and_install(&self.config.server.ssl.protocol, key_managers, trust_managers)
    }
}

impl<'r> Bootstrap<'r, ContextInstalled> {
    pub fn context(&self) -> &InstalledSecurityContext {
        &self.state.context
    }

    /// Build the AMQP factory and probe the broker once.
    pub async fn probe_broker(
        self,
    ) -> Result<Bootstrap<'r, FactoryProbed<AmqpConnectionFactory>>, BootstrapFailure> {
        self.probe_with(AmqpConnectionFactory::new).await
    }

    /// Probe with a factory produced by `build` from the installed context.
    pub async fn probe_with<F, B>(self, build: B) -> Result<Bootstrap<'r, FactoryProbed<F>>, BootstrapFailure>
    where
        F: ConnectionFactory,
        B: FnOnce(InstalledSecurityContext, BrokerConnectionConfig) -> F,
    {
        let broker = match self.config.broker_connection() {
            Ok(broker) => broker,
            Err(e) => return Err(fail::<ContextInstalled>(e)),
        };
        info!(broker = %broker.authority(), username = %broker.username(), "Probing broker");

        let provider = ConnectionFactoryProvider::new(self.registry);
        match provider.create_probed_factory(|context| build(context, broker)).await {
            Ok(factory) => Ok(self.advance(FactoryProbed { factory })),
            Err(e) => Err(fail::<ContextInstalled>(e)),
        }
    }
}

impl<'r, F: ConnectionFactory> Bootstrap<'r, FactoryProbed<F>> {
    pub fn factory(&self) -> &F {
        &self.state.factory
    }

    /// Wrap the probed factory in the bounded pool from `broker.pool`.
    pub fn into_pool(self) -> Result<Bootstrap<'r, PooledFactoryReady<F>>, BootstrapFailure> {
        let pool_config = self.config.broker.pool.clone();
        let provider = ConnectionFactoryProvider::new(self.registry);
        let registry = self.registry;
        let config = self.config;

        match provider.wrap_in_pool(self.state.factory, pool_config.max_connections, pool_config.acquire_timeout) {
            Ok(pool) => {
                info!(
                    from = %FactoryProbed::<F>::PHASE,
                    to = %BootstrapPhase::PooledFactoryReady,
                    max_connections = pool_config.max_connections,
                    "Bootstrap phase complete"
                );
                Ok(Bootstrap {
                    config,
                    registry,
                    state: PooledFactoryReady { pool },
                })
            }
            Err(e) => Err(fail::<FactoryProbed<F>>(e)),
        }
    }
}

impl<'r, F: ConnectionFactory> Bootstrap<'r, PooledFactoryReady<F>> {
    pub fn pool(&self) -> &PooledConnectionFactory<F> {
        &self.state.pool
    }

    /// Hand the pool to the messaging layer.
    pub fn into_component(self) -> Result<AmqpComponent<F>, BridgeError> {
        ConnectionFactoryProvider::new(self.registry).amqp_component(self.state.pool)
    }
}
