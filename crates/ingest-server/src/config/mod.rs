//! Server configuration
//!
//! Compiled defaults (`defaults`), overridden by environment variables,
//! overridden by the builder methods (the CLI sets `max_connections`).
//!
//! # Example
//!
//! ```rust,ignore
//! use ingest_server::config::ServerConfig;
//!
//! let config = ServerConfig::from_env()?
//!     .max_connections(64)
//!     .port(0);
//! config.validate()?;
//! ```

pub mod defaults;

use ingest_core::env::{env_get, env_get_strict, EnvError};
use ingest_core::error::IngestError;
use ingest_core::log_info;
use ingest_core::policy::{ReadErrorPolicy, WouldBlockPolicy};

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Admission capacity of the connection table
    pub max_connections: usize,
    /// IPv4 address to bind
    pub host: Ipv4Addr,
    /// Port to bind (0 = ephemeral)
    pub port: u16,
    /// listen(2) backlog
    pub backlog: i32,
    /// Events per wait
    pub max_events: usize,
    /// Per-connection read buffer size
    pub buffer_size: usize,
    pub read_error_policy: ReadErrorPolicy,
    pub would_block_policy: WouldBlockPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerConfig {
    /// Compiled defaults, no environment lookups. `max_connections` starts
    /// at 0 and must be set before `validate()` passes.
    pub fn new() -> Self {
        Self {
            max_connections: 0,
            host: defaults::HOST,
            port: defaults::PORT,
            backlog: defaults::BACKLOG,
            max_events: defaults::MAX_EVENTS,
            buffer_size: defaults::BUFFER_SIZE,
            read_error_policy: ReadErrorPolicy::default(),
            would_block_policy: WouldBlockPolicy::default(),
        }
    }

    /// Defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `INGEST_HOST` - IPv4 bind address
    /// - `INGEST_PORT` - bind port
    /// - `INGEST_BACKLOG` - listen backlog
    /// - `INGEST_MAX_EVENTS` - events per wait
    /// - `INGEST_BUFFER_SIZE` - per-connection read buffer
    /// - `INGEST_READ_ERROR_POLICY` - `abort` | `drop`
    /// - `INGEST_WOULD_BLOCK_POLICY` - `disconnect` | `ignore`
    ///
    /// Numbers fall back to the default when unparseable; policy names must
    /// be valid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = Self::new();
        Ok(Self {
            host: env_get("INGEST_HOST", base.host),
            port: env_get("INGEST_PORT", base.port),
            backlog: env_get("INGEST_BACKLOG", base.backlog),
            max_events: env_get("INGEST_MAX_EVENTS", base.max_events),
            buffer_size: env_get("INGEST_BUFFER_SIZE", base.buffer_size),
            read_error_policy: env_get_strict("INGEST_READ_ERROR_POLICY")?
                .unwrap_or(base.read_error_policy),
            would_block_policy: env_get_strict("INGEST_WOULD_BLOCK_POLICY")?
                .unwrap_or(base.would_block_policy),
            ..base
        })
    }

    // Builder methods

    pub fn max_connections(mut self, n: usize) -> Self {
        self.max_connections = n;
        self
    }

    pub fn host(mut self, host: Ipv4Addr) -> Self {
        self.host = host;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }

    pub fn max_events(mut self, n: usize) -> Self {
        self.max_events = n;
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn read_error_policy(mut self, policy: ReadErrorPolicy) -> Self {
        self.read_error_policy = policy;
        self
    }

    pub fn would_block_policy(mut self, policy: WouldBlockPolicy) -> Self {
        self.would_block_policy = policy;
        self
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.host, self.port))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("max_connections must be > 0"));
        }
        if self.max_events == 0 || self.max_events > defaults::MAX_EVENTS_LIMIT {
            return Err(ConfigError::InvalidValue("max_events must be in 1..=4096"));
        }
        if self.buffer_size == 0 || self.buffer_size > defaults::BUFFER_SIZE_LIMIT {
            return Err(ConfigError::InvalidValue("buffer_size must be in 1..=1048576"));
        }
        if self.backlog <= 0 {
            return Err(ConfigError::InvalidValue("backlog must be > 0"));
        }
        Ok(())
    }

    pub fn print(&self) {
        log_info!("config: max_connections={} bind={} backlog={} max_events={} buffer_size={} read_error_policy={} would_block_policy={}",
            self.max_connections,
            self.bind_addr(),
            self.backlog,
            self.max_events,
            self.buffer_size,
            self.read_error_policy,
            self.would_block_policy,
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue(&'static str),
    Env(EnvError),
    Usage(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "{}", msg),
            ConfigError::Env(e) => write!(f, "{}", e),
            ConfigError::Usage(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<EnvError> for ConfigError {
    fn from(e: EnvError) -> Self {
        ConfigError::Env(e)
    }
}

impl From<ConfigError> for IngestError {
    fn from(e: ConfigError) -> Self {
        IngestError::Config(e.to_string())
    }
}
