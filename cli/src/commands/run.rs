// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `amqp-bridge run`: bootstrap against the process-wide registry and hold
//! the pooled connection factory until interrupted.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use amqp_bridge_core::application::Bootstrap;
use amqp_bridge_core::domain::BridgeConfig;
use amqp_bridge_core::infrastructure::tls::SecurityContextRegistry;

pub async fn handle_command(config_path: Option<PathBuf>) -> Result<()> {
    let config = BridgeConfig::load(config_path).context("Failed to load configuration")?;

    let ready = Bootstrap::run(config, SecurityContextRegistry::global()).await?;
    let component = ready.into_component()?;

    let status = component.status();
    info!(
        broker = %component.connection_factory().describe(),
        max_connections = status.max_size,
        "AMQP bridge ready"
    );
    println!(
        "{}",
        format!(
            "✓ Bridge ready: {} (pool capacity {})",
            component.connection_factory().describe(),
            status.max_size
        )
        .green()
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    component.shutdown();
    info!("AMQP bridge stopped");
    Ok(())
}
