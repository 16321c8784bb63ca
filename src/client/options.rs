//! Connection options supplied by the caller

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Dial timeout used when none is configured
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Pool size used when none is configured
pub const DEFAULT_POOL_SIZE: usize = 3;

/// Pooling parameters handed verbatim to the client library
///
/// A zero value means "let the client library decide", except for
/// `pool_size` which defaults to [`DEFAULT_POOL_SIZE`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolOptions {
    /// Maximum number of connections kept per endpoint
    pub pool_size: usize,
    /// How long to wait for a free connection
    pub pool_timeout: Duration,
    /// Close connections idle longer than this
    pub idle_timeout: Duration,
    /// Socket read timeout
    pub read_timeout: Duration,
    /// Socket write timeout
    pub write_timeout: Duration,
    /// Command retries on network errors
    pub max_retries: u32,
}

impl PoolOptions {
    /// Apply defaulting rules (pool size zero becomes [`DEFAULT_POOL_SIZE`])
    pub fn with_defaults(mut self) -> Self {
        if self.pool_size == 0 {
            self.pool_size = DEFAULT_POOL_SIZE;
        }
        self
    }
}

/// Options for acquiring a client for one endpoint
///
/// The URL has the form `redis[s]://[user:pass@]host[:port][/db]`. TLS files are
/// only consulted for the `rediss` scheme.
///
/// Use `ConnectionOptions::builder()` for a fluent setup, or deserialize it from
/// an application config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionOptions {
    /// Connection URL (required)
    pub url: String,
    /// PEM file holding the CA that signs the server certificate.
    /// When unset, the system trust roots are used.
    pub ca_file: Option<PathBuf>,
    /// PEM private key for client authentication
    pub client_key_file: Option<PathBuf>,
    /// PEM certificate for client authentication
    pub client_cert_file: Option<PathBuf>,
    /// Cap on TCP connect plus TLS handshake (zero: 30 seconds)
    pub dial_timeout: Duration,
    /// TCP keepalive idle time (zero: keepalive disabled)
    pub tcp_keepalive: Duration,
    /// Pass-through pooling parameters
    pub pool: PoolOptions,
}

impl ConnectionOptions {
    /// Create options for a URL with every other field at its default
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Create a builder for advanced configuration
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use tlsredis::ConnectionOptions;
    ///
    /// let options = ConnectionOptions::builder("rediss://cache.internal:6380/1")
    ///     .ca_file("/etc/redis/ca.pem")
    ///     .client_cert_file("/etc/redis/client.pem")
    ///     .client_key_file("/etc/redis/client.key")
    ///     .dial_timeout(Duration::from_secs(5))
    ///     .pool_size(8)
    ///     .build();
    ///
    /// assert_eq!(options.pool.pool_size, 8);
    /// ```
    pub fn builder(url: impl Into<String>) -> ConnectionOptionsBuilder {
        ConnectionOptionsBuilder {
            options: Self::new(url),
        }
    }

    /// Dial timeout after defaulting
    pub fn effective_dial_timeout(&self) -> Duration {
        if self.dial_timeout.is_zero() {
            DEFAULT_DIAL_TIMEOUT
        } else {
            self.dial_timeout
        }
    }

    /// Keepalive idle time, or `None` when keepalive is disabled
    pub fn effective_keepalive(&self) -> Option<Duration> {
        if self.tcp_keepalive.is_zero() {
            None
        } else {
            Some(self.tcp_keepalive)
        }
    }
}

/// Builder for `ConnectionOptions`
#[derive(Debug, Clone)]
pub struct ConnectionOptionsBuilder {
    options: ConnectionOptions,
}

impl ConnectionOptionsBuilder {
    /// Set the CA certificate file (PEM)
    pub fn ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.ca_file = Some(path.into());
        self
    }

    /// Set the client private key file (PEM)
    pub fn client_key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.client_key_file = Some(path.into());
        self
    }

    /// Set the client certificate file (PEM)
    pub fn client_cert_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.client_cert_file = Some(path.into());
        self
    }

    /// Set the dial timeout
    ///
    /// Default: 30 seconds
    pub fn dial_timeout(mut self, duration: Duration) -> Self {
        self.options.dial_timeout = duration;
        self
    }

    /// Set the TCP keepalive idle time
    ///
    /// Default: disabled
    pub fn tcp_keepalive(mut self, duration: Duration) -> Self {
        self.options.tcp_keepalive = duration;
        self
    }

    /// Set the pool size
    ///
    /// Default: 3
    pub fn pool_size(mut self, size: usize) -> Self {
        self.options.pool.pool_size = size;
        self
    }

    /// Replace all pooling parameters
    pub fn pool(mut self, pool: PoolOptions) -> Self {
        self.options.pool = pool;
        self
    }

    /// Build the options
    pub fn build(self) -> ConnectionOptions {
        self.options
    }
}
