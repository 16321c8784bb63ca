//! tlsredis: redis clients over plain TCP or TLS, one per endpoint
//!
//! Resolves a `redis://` or `rediss://` URL, builds a dial function (optionally
//! trusting a custom CA and presenting a client certificate), and keeps a single
//! client handle per `host:port`.
//!
//! # Example
//!
//! ```no_run
//! # async fn example() -> tlsredis::Result<()> {
//! use tlsredis::{ConnectionOptions, RedisRegistry};
//!
//! let registry = RedisRegistry::redis();
//! let options = ConnectionOptions::builder("rediss://:secret@cache.internal:6380/2")
//!     .ca_file("/etc/redis/ca.pem")
//!     .client_cert_file("/etc/redis/client.pem")
//!     .client_key_file("/etc/redis/client.key")
//!     .build();
//!
//! let client = registry.get_or_create(&options)?;
//! let mut conn = client.get_multiplexed_connection().await?;
//! let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
//! # let _ = pong;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod client;
pub mod connection;
pub mod error;
pub mod metrics;

pub use client::{
    Acquired, ClientFactory, ClientOptions, ClientRegistry, ConnectionOptions, Endpoint,
    PoolOptions, Scheme,
};
#[cfg(feature = "redis")]
pub use client::{RedisClient, RedisFactory, RedisRegistry};
pub use connection::{Dialer, TlsConfig, Transport};
pub use error::{Error, Result};
