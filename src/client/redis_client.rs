//! # Redis adapter
//!
//! Wires the registry to the `redis` crate: connections are opened through the
//! registry's dial function and handed to redis' multiplexed connection, which
//! then owns the protocol.
//!
//! Each [`RedisClient`] keeps a bounded pool of multiplexed connections:
//! 1. **Lazy fill**: a connection is dialed only when the pool holds fewer than
//!    `pool_size` live ones.
//! 2. **Round robin**: once full, callers share clones of pooled connections.
//! 3. **Eviction**: connections whose driver has stopped, or that sat unused
//!    longer than `idle_timeout`, are dropped and redialed on demand.

use super::options::PoolOptions;
use super::registry::{ClientFactory, ClientOptions, ClientRegistry};
use crate::connection::Dialer;
use crate::{Error, Result};
use redis::aio::MultiplexedConnection;
use redis::RedisConnectionInfo;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard};

/// Builds [`RedisClient`] handles
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisFactory;

impl ClientFactory for RedisFactory {
    type Client = RedisClient;

    fn create(&self, options: ClientOptions) -> Result<RedisClient> {
        Ok(RedisClient::new(options))
    }
}

/// Registry handing out one [`RedisClient`] per endpoint
pub type RedisRegistry = ClientRegistry<RedisFactory>;

impl ClientRegistry<RedisFactory> {
    /// Empty registry backed by the `redis` crate
    pub fn redis() -> Self {
        Self::new(RedisFactory)
    }
}

struct PooledConnection {
    connection: MultiplexedConnection,
    closed: Arc<AtomicBool>,
    last_used: Instant,
}

impl PooledConnection {
    fn is_usable(&self, idle_timeout: Duration, now: Instant) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        idle_timeout.is_zero() || now.duration_since(self.last_used) <= idle_timeout
    }
}

#[derive(Default)]
struct PoolState {
    connections: Vec<PooledConnection>,
    next: usize,
}

impl PoolState {
    fn evict(&mut self, idle_timeout: Duration) {
        let now = Instant::now();
        let before = self.connections.len();
        self.connections
            .retain(|pooled| pooled.is_usable(idle_timeout, now));
        let evicted = before - self.connections.len();
        if evicted > 0 {
            tracing::debug!(evicted, "dropped closed or idle redis connections");
        }
    }

    fn checkout(&mut self) -> Option<MultiplexedConnection> {
        if self.connections.is_empty() {
            return None;
        }
        let index = self.next % self.connections.len();
        self.next = self.next.wrapping_add(1);
        let pooled = &mut self.connections[index];
        pooled.last_used = Instant::now();
        Some(pooled.connection.clone())
    }
}

/// Redis client for one endpoint
///
/// Cheap to share behind the registry's `Arc`. Connections are dialed lazily by
/// [`get_multiplexed_connection`](Self::get_multiplexed_connection), at most
/// `pool_size` of them; each authenticates and selects the database on connect.
pub struct RedisClient {
    dialer: Dialer,
    connection_info: RedisConnectionInfo,
    pool: PoolOptions,
    state: Mutex<PoolState>,
}

impl RedisClient {
    /// Create a client from resolved options. Does not connect.
    pub fn new(options: ClientOptions) -> Self {
        let mut connection_info = RedisConnectionInfo::default();
        connection_info.db = options.database;
        connection_info.username = options.username;
        connection_info.password = options.password;

        Self {
            dialer: options.dialer,
            connection_info,
            pool: options.pool.with_defaults(),
            state: Mutex::new(PoolState::default()),
        }
    }

    /// Database selection and credentials sent on connect
    pub fn connection_info(&self) -> &RedisConnectionInfo {
        &self.connection_info
    }

    /// Pooling parameters this client was configured with
    pub fn pool_options(&self) -> &PoolOptions {
        &self.pool
    }

    /// Dial function used for new connections
    pub fn dialer(&self) -> &Dialer {
        &self.dialer
    }

    /// Bound on one request's round trip, from the read and write timeouts
    ///
    /// The multiplexer times a request from enqueue to reply, so the write and
    /// read budgets are added. `None` when both are zero.
    pub fn response_timeout(&self) -> Option<Duration> {
        let timeout = self.pool.read_timeout + self.pool.write_timeout;
        (!timeout.is_zero()).then_some(timeout)
    }

    /// Number of live connections currently pooled
    pub async fn pooled_connections(&self) -> usize {
        let mut state = self.state.lock().await;
        state.evict(self.pool.idle_timeout);
        state.connections.len()
    }

    /// Get a multiplexed connection from the pool, dialing one if the pool is not full
    ///
    /// Must be called from within a tokio runtime: the connection's driver task
    /// is spawned onto it.
    ///
    /// # Errors
    ///
    /// - `Error::PoolTimeout` if the pool stays busy longer than `pool_timeout`
    /// - dial errors (`Io`, `Timeout`, `Tls`), after `max_retries` redials for
    ///   socket errors and dial timeouts
    /// - `Error::Redis` if authentication or database selection is rejected,
    ///   or the server does not answer within the response timeout
    pub async fn get_multiplexed_connection(&self) -> Result<MultiplexedConnection> {
        let mut state = self.lock_pool().await?;
        state.evict(self.pool.idle_timeout);

        if state.connections.len() >= self.pool.pool_size.max(1) {
            if let Some(connection) = state.checkout() {
                return Ok(connection);
            }
        }

        let pooled = self.connect_with_retries().await?;
        let connection = pooled.connection.clone();
        state.connections.push(pooled);
        tracing::debug!(
            addr = self.dialer.addr(),
            pooled = state.connections.len(),
            "redis connection added to pool"
        );
        Ok(connection)
    }

    async fn lock_pool(&self) -> Result<MutexGuard<'_, PoolState>> {
        let timeout = self.pool.pool_timeout;
        if timeout.is_zero() {
            return Ok(self.state.lock().await);
        }
        tokio::time::timeout(timeout, self.state.lock())
            .await
            .map_err(|_| Error::PoolTimeout {
                addr: self.dialer.addr().to_string(),
                timeout,
            })
    }

    async fn connect_with_retries(&self) -> Result<PooledConnection> {
        let mut attempt = 0;
        loop {
            match self.connect().await {
                Ok(pooled) => return Ok(pooled),
                Err(e) if e.is_transient() && attempt < self.pool.max_retries => {
                    attempt += 1;
                    tracing::debug!(
                        addr = self.dialer.addr(),
                        attempt,
                        error = %e,
                        "retrying redis connection"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn connect(&self) -> Result<PooledConnection> {
        let transport = self.dialer.dial().await?;
        let (connection, driver) = MultiplexedConnection::new_with_response_timeout(
            &self.connection_info,
            transport,
            self.response_timeout(),
        )
        .await?;

        let closed = Arc::new(AtomicBool::new(false));
        let flag = closed.clone();
        tokio::spawn(async move {
            driver.await;
            flag.store(true, Ordering::Release);
        });

        Ok(PooledConnection {
            connection,
            closed,
            last_used: Instant::now(),
        })
    }
}

impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient")
            .field("dialer", &self.dialer)
            .field("db", &self.connection_info.db)
            .field("username", &self.connection_info.username)
            .field(
                "password",
                &self.connection_info.password.as_ref().map(|_| "<redacted>"),
            )
            .field("pool", &self.pool)
            .finish()
    }
}
