// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Bridge Configuration Types
//
// Defines the YAML configuration consumed by the bootstrap sequence:
// - server.ssl: protocol name plus key store / trust store locations
// - broker: AMQP target URI, SASL credentials, optional timeouts
// - broker.pool: connection pool cap
//
// Secrets may be written inline or as "env:VAR_NAME" references resolved at
// bootstrap time.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::broker::BrokerConnectionConfig;
use super::error::BridgeError;

/// Pool cap mandated by the connection policy.
pub const DEFAULT_MAX_CONNECTIONS: usize = 5;

const CONFIG_PATH_ENV: &str = "AMQP_BRIDGE_CONFIG_PATH";
const SECRET_ENV_PREFIX: &str = "env:";

/// Top-level bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub server: ServerConfig,
    pub broker: BrokerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub ssl: SslConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SslConfig {
    /// Protocol name, e.g. "TLSv1.2", "TLSv1.3" or "TLS"
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// Path to the PEM identity store (certificate chain + private key)
    pub key_store: PathBuf,

    /// Password for an encrypted private key (supports "env:VAR_NAME")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_store_password: Option<String>,

    /// Path to the PEM trust store (CA certificates only, no password)
    pub trust_store: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BrokerConfig {
    /// Broker URI, e.g. "amqps://broker.example.com:5671"
    pub host: String,

    pub username: String,

    /// SASL PLAIN password (supports "env:VAR_NAME")
    pub password: String,

    /// Upper bound for TCP connect + TLS handshake + AMQP open.
    /// Unset means the transport defaults apply.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<Duration>,

    /// AMQP container id; a random one is generated when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,

    #[serde(default)]
    pub pool: PoolConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PoolConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// How long a caller waits for a free connection once the pool is full.
    /// Unset means wait indefinitely.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub acquire_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            acquire_timeout: None,
        }
    }
}

fn default_protocol() -> String {
    "TLSv1.2".to_string()
}

fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

/// Resolve a possibly indirect secret value.
///
/// `env:NAME` reads the environment variable `NAME`; anything else is taken
/// literally.
pub fn resolve_secret(field: &str, value: &str) -> Result<String, BridgeError> {
    match value.strip_prefix(SECRET_ENV_PREFIX) {
        Some(var) => std::env::var(var).map_err(|_| {
            BridgeError::config(format!(
                "{} references environment variable '{}' which is not set",
                field, var
            ))
        }),
        None => Ok(value.to_string()),
    }
}

impl BridgeConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
            .map_err(|e| BridgeError::config(format!("{} ({})", e, path.display())))
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, BridgeError> {
        serde_yaml::from_str(yaml).map_err(|e| BridgeError::config(format!("malformed YAML: {}", e)))
    }

    pub fn to_yaml_string(&self) -> Result<String, BridgeError> {
        serde_yaml::to_string(self).map_err(|e| BridgeError::config(e.to_string()))
    }

    /// Discover configuration file using precedence order
    /// 1. AMQP_BRIDGE_CONFIG_PATH environment variable
    /// 2. ./amqp-bridge.yaml (working directory)
    /// 3. ~/.amqp-bridge/config.yaml (user home)
    /// 4. /etc/amqp-bridge/config.yaml (system, Unix) or C:\ProgramData\AmqpBridge\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./amqp-bridge.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".amqp-bridge").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/amqp-bridge/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\AmqpBridge\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration from an explicit path or by discovery.
    ///
    /// There is no usable default broker, so finding nothing is an error.
    pub fn load(cli_path: Option<PathBuf>) -> Result<Self, BridgeError> {
        let path = match cli_path {
            Some(path) => {
                tracing::info!("Loading configuration from explicit path: {:?}", path);
                path
            }
            None => {
                let path = Self::discover_config().ok_or_else(|| {
                    BridgeError::config(
                        "no configuration file found (set --config or AMQP_BRIDGE_CONFIG_PATH)",
                    )
                })?;
                tracing::info!("Loading configuration from discovered path: {:?}", path);
                path
            }
        };

        let mut config = Self::from_yaml_file(&path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    /// This allows container deployments to inject targets and secrets
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("AMQP_BRIDGE_BROKER_HOST") {
            tracing::info!("Environment override: AMQP_BRIDGE_BROKER_HOST={}", val);
            self.broker.host = val;
        }
        if let Ok(val) = std::env::var("AMQP_BRIDGE_BROKER_USERNAME") {
            tracing::info!("Environment override: AMQP_BRIDGE_BROKER_USERNAME={}", val);
            self.broker.username = val;
        }
        if let Ok(val) = std::env::var("AMQP_BRIDGE_BROKER_PASSWORD") {
            tracing::info!("Environment override: AMQP_BRIDGE_BROKER_PASSWORD=<redacted>");
            self.broker.password = val;
        }
        if let Ok(val) = std::env::var("AMQP_BRIDGE_SSL_PROTOCOL") {
            tracing::info!("Environment override: AMQP_BRIDGE_SSL_PROTOCOL={}", val);
            self.server.ssl.protocol = val;
        }
        if let Ok(val) = std::env::var("AMQP_BRIDGE_KEY_STORE_PASSWORD") {
            tracing::info!("Environment override: AMQP_BRIDGE_KEY_STORE_PASSWORD=<redacted>");
            self.server.ssl.key_store_password = Some(val);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), BridgeError> {
        let ssl = &self.server.ssl;
        if ssl.protocol.trim().is_empty() {
            return Err(BridgeError::config("server.ssl.protocol cannot be empty"));
        }
        if ssl.key_store.as_os_str().is_empty() {
            return Err(BridgeError::config("server.ssl.key-store cannot be empty"));
        }
        if ssl.trust_store.as_os_str().is_empty() {
            return Err(BridgeError::config("server.ssl.trust-store cannot be empty"));
        }

        if self.broker.host.is_empty() {
            return Err(BridgeError::config("broker.host cannot be empty"));
        }
        if self.broker.pool.max_connections == 0 {
            return Err(BridgeError::config("broker.pool.max-connections must be at least 1"));
        }

        // Parses the URI and checks the username; the password is not resolved
        // here so that validation works without the secret environment.
        BrokerConnectionConfig::new(&self.broker.host, self.broker.username.clone(), "")?;

        Ok(())
    }

    /// Key store password with any `env:` reference resolved
    pub fn key_store_password(&self) -> Result<Option<String>, BridgeError> {
        self.server
            .ssl
            .key_store_password
            .as_deref()
            .map(|v| resolve_secret("server.ssl.key-store-password", v))
            .transpose()
    }

    /// Immutable broker record with secrets resolved
    pub fn broker_connection(&self) -> Result<BrokerConnectionConfig, BridgeError> {
        let password = resolve_secret("broker.password", &self.broker.password)?;
        let mut connection =
            BrokerConnectionConfig::new(&self.broker.host, self.broker.username.clone(), password)?
                .with_connect_timeout(self.broker.connect_timeout);
        if let Some(id) = &self.broker.container_id {
            connection = connection.with_container_id(id.clone());
        }
        Ok(connection)
    }
}
