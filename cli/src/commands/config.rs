// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use amqp_bridge_core::domain::BridgeConfig;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./amqp-bridge.yaml)
        #[arg(short, long, default_value = "./amqp-bridge.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. AMQP_BRIDGE_CONFIG_PATH: {}",
            std::env::var("AMQP_BRIDGE_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./amqp-bridge.yaml");
        println!("  4. ~/.amqp-bridge/config.yaml");
        println!("  5. /etc/amqp-bridge/config.yaml");
        println!();
    }

    let config = BridgeConfig::load(config_override).context("Failed to load configuration")?;

    println!("{}", "Current configuration:".bold());
    println!();

    let ssl = &config.server.ssl;
    println!("{}", "Security:".bold());
    println!("  Protocol: {}", ssl.protocol);
    println!("  Key store: {}", ssl.key_store.display());
    println!(
        "  Key store password: {}",
        if ssl.key_store_password.is_some() { "(set)" } else { "(none)" }
    );
    println!("  Trust store: {}", ssl.trust_store.display());
    println!();

    let broker = &config.broker;
    println!("{}", "Broker:".bold());
    println!("  Host: {}", broker.host);
    println!("  Username: {}", broker.username);
    println!("  Password: {}", "(redacted)".dimmed());
    if let Some(timeout) = broker.connect_timeout {
        println!("  Connect timeout: {:?}", timeout);
    }
    if let Some(container_id) = &broker.container_id {
        println!("  Container id: {}", container_id);
    }
    println!();

    println!("{}", "Connection pool:".bold());
    println!("  Max connections: {}", broker.pool.max_connections);
    match broker.pool.acquire_timeout {
        Some(timeout) => println!("  Acquire timeout: {:?}", timeout),
        None => println!("  Acquire timeout: {}", "(wait indefinitely)".dimmed()),
    }
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = BridgeConfig::load(config_path).context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    let ssl = &config.server.ssl;
    for (label, path) in [("Key store", &ssl.key_store), ("Trust store", &ssl.trust_store)] {
        if !path.is_file() {
            println!(
                "{}",
                format!("⚠ {} not found: {}", label, path.display()).yellow()
            );
        }
    }

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
