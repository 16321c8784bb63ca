//! One client handle per endpoint
//!
//! The registry resolves a connection URL, and for an endpoint it has not seen
//! yet, builds the dial function and asks a [`ClientFactory`] for a handle. The
//! handle is kept for as long as the registry lives; later requests for the
//! same `host:port` get the same handle back, whatever their other options.
//!
//! Check-then-insert runs under one lock, so concurrent first requests for an
//! endpoint construct exactly one handle.

use super::endpoint::Endpoint;
use super::options::{ConnectionOptions, PoolOptions};
use crate::connection::Dialer;
use crate::metrics::counters;
use crate::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Everything a client library needs to build a handle for one endpoint
#[derive(Clone)]
pub struct ClientOptions {
    /// Dial function producing connections to the endpoint
    pub dialer: Dialer,
    /// Logical database to select after connecting
    pub database: i64,
    /// Username for authentication
    pub username: Option<String>,
    /// Password for authentication
    pub password: Option<String>,
    /// Pooling parameters, defaults applied
    pub pool: PoolOptions,
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("dialer", &self.dialer)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pool", &self.pool)
            .finish()
    }
}

/// Builds client handles from resolved options
///
/// This is the seam to the key-value client library: the registry never
/// speaks the wire protocol, it only hands over a dial function and session
/// parameters.
pub trait ClientFactory: Send + Sync {
    /// Handle type handed out by the registry
    type Client: Send + Sync + 'static;

    /// Build a new handle. Must not perform network I/O.
    fn create(&self, options: ClientOptions) -> Result<Self::Client>;
}

/// Outcome of a registry lookup
#[derive(Debug)]
pub enum Acquired<C> {
    /// The endpoint already had a handle
    Hit(Arc<C>),
    /// A new handle was built and registered
    Created(Arc<C>),
}

impl<C> Acquired<C> {
    /// Whether an existing handle was returned
    pub fn is_cache_hit(&self) -> bool {
        matches!(self, Acquired::Hit(_))
    }

    /// Borrow the handle
    pub fn client(&self) -> &Arc<C> {
        match self {
            Acquired::Hit(client) | Acquired::Created(client) => client,
        }
    }

    /// Take the handle
    pub fn into_client(self) -> Arc<C> {
        match self {
            Acquired::Hit(client) | Acquired::Created(client) => client,
        }
    }
}

struct Entry<C> {
    client: Arc<C>,
    endpoint: Endpoint,
}

/// Registry of client handles keyed by `host:port`
pub struct ClientRegistry<F: ClientFactory> {
    factory: F,
    clients: Mutex<HashMap<String, Entry<F::Client>>>,
}

impl<F: ClientFactory> ClientRegistry<F> {
    /// Create an empty registry
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// The factory used for new handles
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Get the handle for an endpoint, creating it on first use
    ///
    /// # Errors
    ///
    /// - `Error::Parse` if the URL is invalid
    /// - `Error::Config` if TLS material is configured but unusable
    /// - any error returned by the factory
    ///
    /// Nothing is registered when an error is returned.
    pub fn get_or_create(&self, options: &ConnectionOptions) -> Result<Arc<F::Client>> {
        self.acquire(options).map(Acquired::into_client)
    }

    /// Like [`get_or_create`](Self::get_or_create), but reports whether the handle already existed
    pub fn acquire(&self, options: &ConnectionOptions) -> Result<Acquired<F::Client>> {
        let result = self.acquire_inner(options);
        if let Err(e) = &result {
            counters::client_error(e.category());
        }
        result
    }

    fn acquire_inner(&self, options: &ConnectionOptions) -> Result<Acquired<F::Client>> {
        let endpoint = Endpoint::resolve(&options.url)?;

        let mut clients = self.clients.lock();

        if let Some(entry) = clients.get(endpoint.host_port()) {
            counters::registry_lookup(true);
            if entry.endpoint != endpoint {
                tracing::warn!(
                    endpoint = %endpoint.host_port(),
                    registered = %entry.endpoint,
                    requested = %endpoint,
                    "reusing client registered with different options"
                );
            } else {
                tracing::debug!(endpoint = %endpoint.host_port(), "reusing registered client");
            }
            return Ok(Acquired::Hit(entry.client.clone()));
        }
        counters::registry_lookup(false);

        let client_options = ClientOptions {
            dialer: Dialer::configure(&endpoint, options)?,
            database: endpoint.database(),
            username: endpoint.username().map(str::to_string),
            password: endpoint.password().map(str::to_string),
            pool: options.pool.clone().with_defaults(),
        };
        let client = Arc::new(self.factory.create(client_options)?);

        tracing::info!(
            endpoint = %endpoint.host_port(),
            tls = endpoint.uses_tls(),
            database = endpoint.database(),
            "registered new client"
        );
        counters::client_created(endpoint.uses_tls());

        clients.insert(
            endpoint.host_port().to_string(),
            Entry {
                client: client.clone(),
                endpoint,
            },
        );
        Ok(Acquired::Created(client))
    }

    /// Registered handle for `host_port`, if any
    pub fn get(&self, host_port: &str) -> Option<Arc<F::Client>> {
        self.clients
            .lock()
            .get(host_port)
            .map(|entry| entry.client.clone())
    }

    /// Whether `host_port` has a registered handle
    pub fn contains(&self, host_port: &str) -> bool {
        self.clients.lock().contains_key(host_port)
    }

    /// Forget the handle for `host_port` so the next request builds a new one.
    ///
    /// The removed handle is returned, not closed; it stays usable by anyone
    /// still holding it.
    pub fn invalidate(&self, host_port: &str) -> Option<Arc<F::Client>> {
        let removed = self.clients.lock().remove(host_port).map(|entry| entry.client);
        if removed.is_some() {
            tracing::debug!(endpoint = host_port, "invalidated registered client");
        }
        removed
    }

    /// Number of registered handles
    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    /// Whether no handle is registered
    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }
}

impl<F: ClientFactory> fmt::Debug for ClientRegistry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clients = self.clients.lock();
        let mut endpoints: Vec<&String> = clients.keys().collect();
        endpoints.sort();
        f.debug_struct("ClientRegistry")
            .field("endpoints", &endpoints)
            .finish()
    }
}
