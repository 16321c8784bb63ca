//! Error types for tlsredis

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Main error type for tlsredis operations
#[derive(Debug, Error)]
pub enum Error {
    /// Connection URL is malformed, has no host, or uses an unsupported scheme
    #[error("invalid connection url: {0}")]
    Parse(String),

    /// TLS material or other configuration explicitly supplied but unusable
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Socket-level failure while dialing
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Dial (TCP connect and TLS handshake) did not finish in time
    #[error("dial to {addr} timed out after {timeout:?}")]
    Timeout {
        /// Dial target
        addr: String,
        /// Configured dial timeout
        timeout: Duration,
    },

    /// No pooled connection became available in time
    #[error("timed out after {timeout:?} waiting for a pooled connection to {addr}")]
    PoolTimeout {
        /// Dial target of the pool
        addr: String,
        /// Configured pool timeout
        timeout: Duration,
    },

    /// TLS handshake failed
    #[error("tls handshake with {addr} failed: {source}")]
    Tls {
        /// Dial target
        addr: String,
        /// Underlying handshake error
        #[source]
        source: io::Error,
    },

    /// The client factory refused to build a handle
    #[error("client construction failed: {0}")]
    Client(String),

    /// Error raised by the redis client library
    #[cfg(feature = "redis")]
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl Error {
    /// Returns true if this is a connection URL error
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Parse(_))
    }

    /// Returns true if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Returns true for dial failures worth retrying (socket errors, dial timeouts)
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Timeout { .. })
    }

    /// Short, stable name of the error kind, used as a metrics label
    pub fn category(&self) -> &'static str {
        match self {
            Error::Parse(_) => "parse",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Timeout { .. } => "timeout",
            Error::PoolTimeout { .. } => "pool_timeout",
            Error::Tls { .. } => "tls",
            Error::Client(_) => "client",
            #[cfg(feature = "redis")]
            Error::Redis(_) => "redis",
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
