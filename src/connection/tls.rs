//! TLS configuration for encrypted connections to redis.
//!
//! Server certificates are validated against either the system trust roots or,
//! when a CA file is given, against that CA alone. A client certificate and key
//! are presented only when both files are configured.

use crate::{Error, Result};
use rustls::client::{ClientSessionMemoryCache, Resumption};
use rustls::{ClientConfig, RootCertStore};
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Number of TLS sessions kept for resumption on reconnect
pub const SESSION_CACHE_CAPACITY: usize = 1000;

/// Where the server certificate's trust anchors come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustRoots {
    /// Platform trust store (bundled Mozilla roots if the platform has none)
    System,
    /// Exactly the certificates parsed from the configured CA file
    Custom,
}

/// TLS configuration for redis connections.
///
/// # Examples
///
/// ```ignore
/// use tlsredis::connection::TlsConfig;
///
/// // System roots, no client authentication
/// let tls = TlsConfig::builder().build()?;
///
/// // Custom CA with mutual authentication
/// let tls = TlsConfig::builder()
///     .ca_cert_path("/etc/redis/ca.pem")
///     .client_cert_path("/etc/redis/client.pem")
///     .client_key_path("/etc/redis/client.key")
///     .build()?;
/// ```
#[derive(Clone)]
pub struct TlsConfig {
    /// Path to CA certificate file (None = use system roots)
    ca_cert_path: Option<PathBuf>,
    trust_roots: TrustRoots,
    /// Trust anchors handed to the verifier
    root_store: Arc<RootCertStore>,
    /// Leaf certificate presented for client authentication, if any
    client_cert: Option<CertificateDer<'static>>,
    session_cache_capacity: usize,
    /// Compiled rustls ClientConfig
    client_config: Arc<ClientConfig>,
}

impl TlsConfig {
    /// Create a new TLS configuration builder.
    pub fn builder() -> TlsConfigBuilder {
        TlsConfigBuilder::default()
    }

    /// Get the rustls ClientConfig for this TLS configuration.
    pub fn client_config(&self) -> Arc<ClientConfig> {
        self.client_config.clone()
    }

    /// Where the trust anchors come from
    pub fn trust_roots(&self) -> TrustRoots {
        self.trust_roots
    }

    /// Trust anchors used to verify the server
    pub fn root_store(&self) -> &RootCertStore {
        &self.root_store
    }

    /// Path of the custom CA file, if one was configured
    pub fn ca_cert_path(&self) -> Option<&Path> {
        self.ca_cert_path.as_deref()
    }

    /// Whether a client certificate is presented to the server
    pub fn has_client_identity(&self) -> bool {
        self.client_config.client_auth_cert_resolver.has_certs()
    }

    /// Leaf certificate presented to the server, if any
    pub fn client_cert(&self) -> Option<&CertificateDer<'static>> {
        self.client_cert.as_ref()
    }

    /// Capacity of the session resumption cache
    pub fn session_cache_capacity(&self) -> usize {
        self.session_cache_capacity
    }
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("ca_cert_path", &self.ca_cert_path)
            .field("trust_roots", &self.trust_roots)
            .field("root_count", &self.root_store.len())
            .field("client_identity", &self.client_cert.is_some())
            .field("session_cache_capacity", &self.session_cache_capacity)
            .field("client_config", &"<ClientConfig>")
            .finish()
    }
}

/// Builder for TLS configuration.
pub struct TlsConfigBuilder {
    ca_cert_path: Option<PathBuf>,
    client_cert_path: Option<PathBuf>,
    client_key_path: Option<PathBuf>,
    session_cache_capacity: usize,
}

impl Default for TlsConfigBuilder {
    fn default() -> Self {
        Self {
            ca_cert_path: None,
            client_cert_path: None,
            client_key_path: None,
            session_cache_capacity: SESSION_CACHE_CAPACITY,
        }
    }
}

impl TlsConfigBuilder {
    /// Set the path to a custom CA certificate file (PEM format).
    ///
    /// The certificates in this file replace the system roots entirely.
    pub fn ca_cert_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    /// Set the path to the client certificate (PEM format).
    ///
    /// Ignored unless a client key is also set.
    pub fn client_cert_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.client_cert_path = Some(path.into());
        self
    }

    /// Set the path to the client private key (PEM format).
    ///
    /// Ignored unless a client certificate is also set.
    pub fn client_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.client_key_path = Some(path.into());
        self
    }

    /// Override the number of cached TLS sessions (default: 1000).
    pub fn session_cache_capacity(mut self, capacity: usize) -> Self {
        self.session_cache_capacity = capacity;
        self
    }

    /// Build the TLS configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if:
    /// - the CA file cannot be read or holds no valid certificate
    /// - the client certificate or key cannot be read or parsed
    /// - the client key does not suit the certificate
    pub fn build(self) -> Result<TlsConfig> {
        let (root_store, trust_roots) = match &self.ca_cert_path {
            Some(ca_path) => {
                tracing::debug!(path = %ca_path.display(), "adding custom redis CA");
                (load_custom_ca(ca_path)?, TrustRoots::Custom)
            }
            None => {
                tracing::debug!("not using custom redis CA");
                (load_system_roots()?, TrustRoots::System)
            }
        };
        let root_store = Arc::new(root_store);

        let builder = ClientConfig::builder().with_root_certificates(root_store.clone());

        let (mut client_config, client_cert) =
            match (&self.client_cert_path, &self.client_key_path) {
                (Some(cert_path), Some(key_path)) => {
                    tracing::debug!(
                        cert = %cert_path.display(),
                        key = %key_path.display(),
                        "enabling client TLS authentication"
                    );
                    let certs = load_cert_chain(cert_path)?;
                    let key = load_private_key(key_path)?;
                    let leaf = certs.first().cloned();
                    let config = builder.with_client_auth_cert(certs, key).map_err(|e| {
                        Error::Config(format!(
                            "unable to load client certificate/key pair '{}' / '{}': {}",
                            cert_path.display(),
                            key_path.display(),
                            e
                        ))
                    })?;
                    (config, leaf)
                }
                _ => {
                    tracing::debug!("not enabling client TLS authentication");
                    (builder.with_no_client_auth(), None)
                }
            };

        client_config.resumption = Resumption::store(Arc::new(ClientSessionMemoryCache::new(
            self.session_cache_capacity,
        )));

        Ok(TlsConfig {
            ca_cert_path: self.ca_cert_path,
            trust_roots,
            root_store,
            client_cert,
            session_cache_capacity: self.session_cache_capacity,
            client_config: Arc::new(client_config),
        })
    }
}

/// Load system root certificates, falling back to the bundled Mozilla roots.
fn load_system_roots() -> Result<RootCertStore> {
    let result = rustls_native_certs::load_native_certs();

    let mut store = RootCertStore::empty();
    let (added, _ignored) = store.add_parsable_certificates(result.certs);

    if added == 0 {
        if !result.errors.is_empty() {
            tracing::debug!(
                errors = result.errors.len(),
                "platform trust store unavailable, using bundled roots"
            );
        }
        store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    if store.is_empty() {
        return Err(Error::Config(
            "failed to load any system root certificates".to_string(),
        ));
    }

    Ok(store)
}

/// Load a custom CA certificate from a PEM file.
fn load_custom_ca(ca_path: &Path) -> Result<RootCertStore> {
    let certs = read_certificates(ca_path, "ca_file")?;

    let mut root_store = RootCertStore::empty();
    let (added, _ignored) = root_store.add_parsable_certificates(certs);

    if added == 0 {
        return Err(Error::Config(format!(
            "no valid certificates found in ca_file '{}'",
            ca_path.display()
        )));
    }

    Ok(root_store)
}

fn load_cert_chain(cert_path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let certs = read_certificates(cert_path, "client_cert_file")?;
    if certs.is_empty() {
        return Err(Error::Config(format!(
            "no certificates found in client_cert_file '{}'",
            cert_path.display()
        )));
    }
    Ok(certs)
}

fn read_certificates(path: &Path, field: &str) -> Result<Vec<CertificateDer<'static>>> {
    let data = fs::read(path).map_err(|e| {
        Error::Config(format!(
            "failed to read {} '{}': {}",
            field,
            path.display(),
            e
        ))
    })?;

    rustls_pemfile::certs(&mut Cursor::new(&data))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| {
            Error::Config(format!(
                "failed to parse {} '{}': {}",
                field,
                path.display(),
                e
            ))
        })
}

fn load_private_key(key_path: &Path) -> Result<PrivateKeyDer<'static>> {
    let data = fs::read(key_path).map_err(|e| {
        Error::Config(format!(
            "failed to read client_key_file '{}': {}",
            key_path.display(),
            e
        ))
    })?;

    rustls_pemfile::private_key(&mut Cursor::new(&data))
        .map_err(|e| {
            Error::Config(format!(
                "failed to parse client_key_file '{}': {}",
                key_path.display(),
                e
            ))
        })?
        .ok_or_else(|| {
            Error::Config(format!(
                "no private key found in client_key_file '{}'",
                key_path.display()
            ))
        })
}
