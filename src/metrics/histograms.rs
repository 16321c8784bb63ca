//! Histogram metrics

use super::labels;
use std::time::Duration;

/// Time taken by a successful dial, TLS handshake included
pub fn dial_duration(tls: bool, elapsed: Duration) {
    metrics::histogram!("tlsredis_dial_duration_seconds", labels::SCHEME => labels::scheme(tls))
        .record(elapsed.as_secs_f64());
}
