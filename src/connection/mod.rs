//! Connection management
//!
//! This module handles:
//! * Dial functions (plain TCP or TLS, with timeout and keepalive)
//! * Transport abstraction over the dialed stream
//! * TLS configuration and support

mod dialer;
mod tls;
mod transport;

pub use dialer::Dialer;
pub use tls::{TlsConfig, TlsConfigBuilder, TrustRoots, SESSION_CACHE_CAPACITY};
pub use transport::Transport;
