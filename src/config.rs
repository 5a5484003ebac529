//! TOML-based gateway configuration.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working in-memory gateway on `0.0.0.0:8080`.
//!
//! # Example TOML
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! write_timeout_ms = 15000
//!
//! [store]
//! backend = "redis"
//! url = "redis://localhost:6379"
//! db = 2
//! key_prefix = "taskgate"
//! retention_secs = 259200
//!
//! [broker]
//! default_queue = "default"
//! concurrency = 10
//!
//! [log]
//! filter = "info,taskgate=debug"
//! json = false
//! ```
//!
//! The `PORT` environment variable overrides `server.port`.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use taskgate_tasks::constants::{
    DEFAULT_CONCURRENCY, DEFAULT_KEY_PREFIX, DEFAULT_QUEUE, DEFAULT_RESULTS_EXPIRE_IN,
    DEFAULT_RETENTION,
};

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file contains invalid TOML or does not match the schema.
    #[error("Failed to parse config TOML: {source}")]
    Parse {
        #[from]
        source: toml::de::Error,
    },

    /// The file parsed but holds values the gateway cannot run with.
    #[error("Config validation error: {message}")]
    Validation { message: String },

    /// The file could not be read.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        source: std::io::Error,
        path: String,
    },
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Metadata store connection.
    pub store: StoreSettings,
    /// Execution backend defaults.
    pub broker: BrokerConfig,
    /// Log output.
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Time allowed to read a request, in milliseconds.
    pub read_timeout_ms: u64,
    /// Deadline for producing a response, in milliseconds. Requests that
    /// exceed it are answered with 408 and their in-flight work is dropped.
    pub write_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            read_timeout_ms: 15_000,
            write_timeout_ms: 15_000,
        }
    }
}

/// Which [`MetadataStore`](taskgate_tasks::MetadataStore) implementation to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreKind,
    /// Redis URL, e.g. `redis://host:6379`. Required for the redis backend.
    pub url: Option<String>,
    pub password: Option<String>,
    pub db: u32,
    pub key_prefix: String,
    /// Record retention in seconds.
    pub retention_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreKind::Memory,
            url: None,
            password: None,
            db: 0,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            retention_secs: DEFAULT_RETENTION.as_secs(),
        }
    }
}

impl StoreSettings {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    /// Builds the connection URL with password and database folded in.
    ///
    /// Credentials or a database path already present in `url` win over the
    /// separate fields. Returns `None` when no URL is configured.
    pub fn redis_url(&self) -> Option<String> {
        let url = self.url.as_deref()?.trim_end_matches('/');
        let (scheme, rest) = url.split_once("://").unwrap_or(("redis", url));

        let rest = match (&self.password, rest.contains('@')) {
            (Some(password), false) => format!(":{password}@{rest}"),
            _ => rest.to_string(),
        };
        let host_part = rest.rsplit('@').next().unwrap_or(&rest);
        let rest = if host_part.contains('/') {
            rest
        } else {
            format!("{rest}/{}", self.db)
        };
        Some(format!("{scheme}://{rest}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Queue used when a submission names none.
    pub default_queue: String,
    /// Maximum number of tasks executing at once.
    pub concurrency: usize,
    /// How long finished task states remain readable, in seconds.
    pub results_expire_in_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            default_queue: DEFAULT_QUEUE.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            results_expire_in_secs: DEFAULT_RESULTS_EXPIRE_IN.as_secs(),
        }
    }
}

impl BrokerConfig {
    pub fn results_expire_in(&self) -> Duration {
        Duration::from_secs(self.results_expire_in_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence when set.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl GatewayConfig {
    /// Parse a TOML string into a validated [`GatewayConfig`].
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a [`GatewayConfig`] from a file path.
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Parse`] if the TOML is malformed, or
    /// [`ConfigError::Validation`] if validation fails.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            source,
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Applies the `PORT` environment variable, if it holds a valid port.
    pub fn apply_env(mut self) -> Self {
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        self
    }

    /// Checks values the gateway cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| {
            Err(ConfigError::Validation {
                message: message.to_string(),
            })
        };

        if self.server.port == 0 {
            return invalid("server.port must be greater than 0");
        }
        if self.server.read_timeout_ms == 0 {
            return invalid("server.read_timeout_ms must be greater than 0");
        }
        if self.server.write_timeout_ms == 0 {
            return invalid("server.write_timeout_ms must be greater than 0");
        }
        if self.broker.concurrency == 0 {
            return invalid("broker.concurrency must be greater than 0");
        }
        if self.store.retention_secs == 0 {
            return invalid("store.retention_secs must be greater than 0");
        }
        if self.store.backend == StoreKind::Redis
            && self.store.url.as_deref().is_none_or(|u| u.trim().is_empty())
        {
            return invalid("store.url is required when store.backend = \"redis\"");
        }
        Ok(())
    }

    /// The socket address to listen on.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| ConfigError::Validation {
                message: format!("invalid listen address: {e}"),
            })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.write_timeout_ms)
    }
}
