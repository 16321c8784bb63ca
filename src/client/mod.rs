//! Client acquisition
//!
//! This module handles:
//! * Connection URL resolution (host, credentials, database)
//! * Caller-facing connection options and their defaults
//! * The per-endpoint client registry and the client library seam

mod endpoint;
mod options;
#[cfg(feature = "redis")]
mod redis_client;
mod registry;

pub use endpoint::{Endpoint, Scheme, DEFAULT_PORT};
pub use options::{
    ConnectionOptions, ConnectionOptionsBuilder, PoolOptions, DEFAULT_DIAL_TIMEOUT,
    DEFAULT_POOL_SIZE,
};
#[cfg(feature = "redis")]
pub use redis_client::{RedisClient, RedisFactory, RedisRegistry};
pub use registry::{Acquired, ClientFactory, ClientOptions, ClientRegistry};
