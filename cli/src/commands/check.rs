// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `amqp-bridge check`: one bootstrap run with a line per phase.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use amqp_bridge_core::application::Bootstrap;
use amqp_bridge_core::domain::{BootstrapFailure, BootstrapPhase, BridgeConfig};
use amqp_bridge_core::infrastructure::tls::SecurityContextRegistry;

pub async fn handle_command(config_path: Option<PathBuf>) -> Result<()> {
    let config = BridgeConfig::load(config_path).context("Failed to load configuration")?;
    let registry = SecurityContextRegistry::global();

    println!("{}", "Bootstrap check:".bold());
    let start = Bootstrap::new(config, registry);
    print_phase(start.phase());

    let stores = start.load_stores().map_err(report)?;
    print_phase(stores.phase());

    let installed = stores.install_context().map_err(report)?;
    print_phase(installed.phase());
    println!("    Protocol: {}", installed.context().protocol());

    let probed = installed.probe_broker().await.map_err(report)?;
    print_phase(probed.phase());
    println!("    Broker: {}", probed.factory().config().authority());

    let ready = probed.into_pool().map_err(report)?;
    print_phase(ready.phase());

    let status = ready.pool().status();
    println!();
    println!("{}", "Connection pool:".bold());
    println!("  Capacity: {}", status.max_size);
    println!("  Live: {}", status.size);
    println!("  In use: {}", status.in_use);
    println!();
    println!("{}", "✓ Bridge bootstrap succeeded".green());

    Ok(())
}

fn print_phase(phase: BootstrapPhase) {
    println!("  {} {}", "✓".green(), phase);
}

fn report(failure: BootstrapFailure) -> BootstrapFailure {
    println!("  {} {}", "✗".red(), failed_step(&failure));
    println!("    Reached: {}", failure.reached);
    println!("    Cause: {}", failure.source);
    failure
}

/// The step that broke, named by the phase it would have reached.
fn failed_step(failure: &BootstrapFailure) -> String {
    match failure.reached.next() {
        Some(target) => format!("{} (from {})", target, failure.reached),
        None => failure.phase().to_string(),
    }
}
