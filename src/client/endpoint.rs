//! Connection URL resolution
//!
//! Supports the format:
//! * redis://[user[:password]@]host[:port][/database]
//! * rediss://... (same, over TLS)
//!
//! The port defaults to 6379. The database is taken from the final path
//! segment; a segment that is not a non-negative integer is logged and
//! replaced by database 0.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;
use url::{Host, Url};

/// Port used when the URL does not carry one
pub const DEFAULT_PORT: u16 = 6379;

/// URL scheme of an endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Plain TCP (`redis://`)
    #[default]
    Redis,
    /// TLS over TCP (`rediss://`)
    Rediss,
}

impl Scheme {
    /// Whether connections for this scheme are encrypted
    pub fn uses_tls(&self) -> bool {
        matches!(self, Self::Rediss)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redis => write!(f, "redis"),
            Self::Rediss => write!(f, "rediss"),
        }
    }
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("rediss") {
            Ok(Self::Rediss)
        } else if s.eq_ignore_ascii_case("redis") {
            Ok(Self::Redis)
        } else {
            Err(Error::Parse(format!(
                "unsupported scheme '{}': expected redis or rediss",
                s
            )))
        }
    }
}

/// A connection URL resolved into its dial target and session parameters
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: Scheme,
    host: String,
    port: u16,
    host_port: String,
    database: i64,
    username: Option<String>,
    password: Option<String>,
}

impl Endpoint {
    /// Resolve a connection URL
    ///
    /// # Errors
    ///
    /// Returns `Error::Parse` if the URL is malformed, has no host, uses a
    /// scheme other than `redis`/`rediss`, or carries credentials that are not
    /// valid percent-encoded UTF-8.
    ///
    /// # Examples
    ///
    /// ```
    /// use tlsredis::Endpoint;
    ///
    /// let endpoint = Endpoint::resolve("redis://user:pw@host:6379/2")?;
    /// assert_eq!(endpoint.host_port(), "host:6379");
    /// assert_eq!(endpoint.database(), 2);
    /// assert!(!endpoint.uses_tls());
    /// # Ok::<(), tlsredis::Error>(())
    /// ```
    pub fn resolve(s: &str) -> Result<Self> {
        let url = Url::parse(s)
            .map_err(|e| Error::Parse(format!("unable to parse redis address: {}", e)))?;

        let scheme: Scheme = url.scheme().parse()?;

        let host = match url.host() {
            Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            _ => {
                return Err(Error::Parse(
                    "please provide a redis URL of the form 'redis[s]://[user:pass@]host:port[/db]'"
                        .into(),
                ))
            }
        };
        let port = url.port().unwrap_or(DEFAULT_PORT);
        let host_port = if host.contains(':') {
            format!("[{}]:{}", host, port)
        } else {
            format!("{}:{}", host, port)
        };

        let database = match database_segment(url.path()) {
            None => 0,
            Some(segment) => match segment.parse::<i64>() {
                Ok(db) if db >= 0 => db,
                Ok(db) => {
                    tracing::warn!(
                        path = url.path(),
                        database = db,
                        "negative database number in path, using database 0"
                    );
                    0
                }
                Err(e) => {
                    tracing::warn!(
                        path = url.path(),
                        error = %e,
                        "unable to get database number from path, using database 0"
                    );
                    0
                }
            },
        };
        tracing::debug!(database, "using database");

        let username = decode_userinfo(url.username(), "username")?;
        let password = match url.password() {
            Some(password) => decode_userinfo(password, "password")?,
            None => None,
        };

        Ok(Self {
            scheme,
            host,
            port,
            host_port,
            database,
            username,
            password,
        })
    }

    /// URL scheme
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Whether the endpoint is reached over TLS
    pub fn uses_tls(&self) -> bool {
        self.scheme.uses_tls()
    }

    /// Host name or IP address, without brackets
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Dial target in `host:port` form; IPv6 hosts are bracketed
    pub fn host_port(&self) -> &str {
        &self.host_port
    }

    /// Logical database index, never negative
    pub fn database(&self) -> i64 {
        self.database
    }

    /// Username from the URL userinfo
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Password from the URL userinfo
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("scheme", &self.scheme)
            .field("host_port", &self.host_port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.host_port, self.database)
    }
}

/// Final path segment, or `None` when the URL has no path
fn database_segment(path: &str) -> Option<&str> {
    if path.is_empty() || path == "/" {
        return None;
    }
    path.rsplit('/').next()
}

fn decode_userinfo(raw: &str, field: &str) -> Result<Option<String>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let decoded = urlencoding::decode(raw)
        .map_err(|e| Error::Parse(format!("{} is not valid UTF-8: {}", field, e)))?;
    Ok(Some(decoded.into_owned()))
}
