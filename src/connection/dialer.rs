//! Dial functions: plain TCP or TLS over TCP.
//!
//! A [`Dialer`] is built once per endpoint while configuring a client and is
//! invoked by the client library every time it needs a new connection. Building
//! it reads TLS material from disk but never touches the network.

use super::tls::TlsConfig;
use super::transport::Transport;
use crate::client::{ConnectionOptions, Endpoint};
use crate::metrics::{counters, histograms};
use crate::{Error, Result};
use rustls_pki_types::ServerName;
use socket2::{SockRef, TcpKeepalive};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

/// TLS half of a dialer: configuration plus the name checked against the certificate
#[derive(Clone)]
struct TlsTarget {
    config: TlsConfig,
    server_name: ServerName<'static>,
}

/// Produces connections to one endpoint
#[derive(Clone)]
pub struct Dialer {
    addr: String,
    connect_timeout: Duration,
    keepalive: Option<Duration>,
    tls: Option<TlsTarget>,
}

impl Dialer {
    /// Plain TCP dialer for `addr` (`host:port`) with the default timeout and no keepalive
    pub fn tcp(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout: crate::client::DEFAULT_DIAL_TIMEOUT,
            keepalive: None,
            tls: None,
        }
    }

    /// Build the dialer for a resolved endpoint
    ///
    /// For `redis://` endpoints this is a plain TCP dialer and the TLS files in
    /// `options` are not read. For `rediss://` endpoints the TLS configuration
    /// is assembled from the CA file and the client certificate/key pair.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a CA file or a complete client pair is
    /// configured but cannot be loaded, or if the host is not a valid TLS
    /// server name.
    pub fn configure(endpoint: &Endpoint, options: &ConnectionOptions) -> Result<Self> {
        let connect_timeout = options.effective_dial_timeout();
        if options.dial_timeout.is_zero() {
            tracing::debug!(timeout = ?connect_timeout, "defaulted dial timeout");
        }

        let dialer = Dialer::tcp(endpoint.host_port())
            .with_connect_timeout(connect_timeout)
            .with_keepalive(options.effective_keepalive());

        if !endpoint.uses_tls() {
            return Ok(dialer);
        }

        tracing::debug!("using encrypted connection to redis");
        let mut builder = TlsConfig::builder();
        if let Some(ca_file) = &options.ca_file {
            builder = builder.ca_cert_path(ca_file);
        }
        if let Some(cert_file) = &options.client_cert_file {
            builder = builder.client_cert_path(cert_file);
        }
        if let Some(key_file) = &options.client_key_file {
            builder = builder.client_key_path(key_file);
        }

        dialer.with_tls(endpoint.host(), builder.build()?)
    }

    /// Set the timeout covering TCP connect and TLS handshake together
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enable TCP keepalive with the given idle time (`None` disables it)
    pub fn with_keepalive(mut self, idle: Option<Duration>) -> Self {
        self.keepalive = idle;
        self
    }

    /// Upgrade every dialed connection to TLS, verifying the server as `host`
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `host` is not a valid DNS name or IP address.
    pub fn with_tls(mut self, host: &str, config: TlsConfig) -> Result<Self> {
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|_| Error::Config(format!("invalid hostname for TLS: '{}'", host)))?;
        self.tls = Some(TlsTarget {
            config,
            server_name,
        });
        Ok(self)
    }

    /// Dial target in `host:port` form
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Timeout covering TCP connect and TLS handshake
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Keepalive idle time, if enabled
    pub fn keepalive(&self) -> Option<Duration> {
        self.keepalive
    }

    /// Whether dialed connections are TLS-encrypted
    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// TLS configuration, for TLS dialers
    pub fn tls_config(&self) -> Option<&TlsConfig> {
        self.tls.as_ref().map(|tls| &tls.config)
    }

    /// Name the server certificate is verified against, for TLS dialers
    pub fn server_name(&self) -> Option<&ServerName<'static>> {
        self.tls.as_ref().map(|tls| &tls.server_name)
    }

    /// Open a new connection
    ///
    /// # Errors
    ///
    /// - `Error::Timeout` if connect and handshake exceed the dial timeout
    /// - `Error::Io` if the TCP connection fails
    /// - `Error::Tls` if the TLS handshake fails
    pub async fn dial(&self) -> Result<Transport> {
        let tls = self.is_tls();
        let started = Instant::now();
        counters::dial_attempted(tls);

        let result = match tokio::time::timeout(self.connect_timeout, self.connect()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                addr: self.addr.clone(),
                timeout: self.connect_timeout,
            }),
        };

        match &result {
            Ok(_) => histograms::dial_duration(tls, started.elapsed()),
            Err(e) => {
                tracing::debug!(addr = %self.addr, error = %e, "dial failed");
                counters::dial_failed(tls, e.category());
            }
        }
        result
    }

    async fn connect(&self) -> Result<Transport> {
        tracing::debug!(addr = %self.addr, tls = self.is_tls(), "dialing redis");
        let stream = TcpStream::connect(self.addr.as_str()).await?;
        stream.set_nodelay(true)?;

        if let Some(idle) = self.keepalive {
            let keepalive = TcpKeepalive::new().with_time(idle);
            SockRef::from(&stream).set_tcp_keepalive(&keepalive)?;
        }

        let Some(tls) = &self.tls else {
            return Ok(Transport::Plain(stream));
        };

        let connector = TlsConnector::from(tls.config.client_config());
        let stream = connector
            .connect(tls.server_name.clone(), stream)
            .await
            .map_err(|source| Error::Tls {
                addr: self.addr.clone(),
                source,
            })?;

        Ok(Transport::Tls(Box::new(stream)))
    }
}

impl std::fmt::Debug for Dialer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dialer")
            .field("addr", &self.addr)
            .field("connect_timeout", &self.connect_timeout)
            .field("keepalive", &self.keepalive)
            .field("tls", &self.tls_config())
            .finish()
    }
}
