use std::time::Duration;

use thiserror::Error as ThisError;

use crate::ring::DEFAULT_VIRTUAL_NODES;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid port: {0}")]
    InvalidPort(u16),
    #[error("at least one server must be specified")]
    NoServers,
    #[error("invalid server address: {0:?}")]
    InvalidServerAddress(String),
    #[error("{0} must be positive")]
    Zero(&'static str),
}

/// Validated configuration for a single cache server. Flag and environment
/// loading live in the binary; the core only consumes this record.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Deadline for reading one command from a connection.
    pub read_timeout: Duration,
    /// Deadline for writing one response to a connection.
    pub write_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7379,
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// The address to bind, in `host:port` form.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }
        if self.read_timeout.is_zero() {
            return Err(ConfigError::Zero("read timeout"));
        }
        if self.write_timeout.is_zero() {
            return Err(ConfigError::Zero("write timeout"));
        }
        Ok(())
    }
}

/// Validated configuration for a cluster client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server addresses in `host:port` form.
    pub servers: Vec<String>,
    pub max_conns_per_server: usize,
    /// Deadline for dialing a server, and for waiting on a pooled
    /// connection when the pool is exhausted.
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    /// Additional rounds after the first failed attempt.
    pub retry_attempts: u32,
    pub virtual_nodes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            max_conns_per_server: 10,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(10),
            retry_attempts: 3,
            virtual_nodes: DEFAULT_VIRTUAL_NODES,
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servers.is_empty() {
            return Err(ConfigError::NoServers);
        }
        for server in &self.servers {
            if server.is_empty() || !server.contains(':') {
                return Err(ConfigError::InvalidServerAddress(server.clone()));
            }
        }
        if self.max_conns_per_server == 0 {
            return Err(ConfigError::Zero("max connections per server"));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::Zero("connect timeout"));
        }
        if self.read_timeout.is_zero() {
            return Err(ConfigError::Zero("read timeout"));
        }
        if self.write_timeout.is_zero() {
            return Err(ConfigError::Zero("write timeout"));
        }
        if self.virtual_nodes == 0 {
            return Err(ConfigError::Zero("virtual nodes"));
        }
        Ok(())
    }
}
