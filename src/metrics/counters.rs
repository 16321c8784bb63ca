//! Counter metrics

use super::labels;

/// Registry lookup outcome (hit or miss)
pub fn registry_lookup(hit: bool) {
    let result = if hit {
        labels::RESULT_HIT
    } else {
        labels::RESULT_MISS
    };
    metrics::counter!("tlsredis_registry_lookups_total", labels::RESULT => result).increment(1);
}

/// A new client handle was registered
pub fn client_created(tls: bool) {
    metrics::counter!("tlsredis_clients_created_total", labels::SCHEME => labels::scheme(tls))
        .increment(1);
}

/// Client acquisition failed
pub fn client_error(category: &'static str) {
    metrics::counter!("tlsredis_client_errors_total", labels::CATEGORY => category).increment(1);
}

/// A dial was attempted
pub fn dial_attempted(tls: bool) {
    metrics::counter!("tlsredis_dials_total", labels::SCHEME => labels::scheme(tls)).increment(1);
}

/// A dial failed
pub fn dial_failed(tls: bool, category: &'static str) {
    metrics::counter!(
        "tlsredis_dial_errors_total",
        labels::SCHEME => labels::scheme(tls),
        labels::CATEGORY => category
    )
    .increment(1);
}
