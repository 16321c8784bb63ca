//! Label keys and values shared by counters and histograms

/// Label key for the URL scheme of an endpoint
pub const SCHEME: &str = "scheme";
/// Label key for registry lookup results
pub const RESULT: &str = "result";
/// Label key for error categories
pub const CATEGORY: &str = "category";

/// Registry lookup served an existing handle
pub const RESULT_HIT: &str = "hit";
/// Registry lookup built a new handle
pub const RESULT_MISS: &str = "miss";

/// Plain TCP scheme
pub const SCHEME_PLAIN: &str = "redis";
/// TLS scheme
pub const SCHEME_TLS: &str = "rediss";

/// Scheme label value for a TLS flag
pub fn scheme(tls: bool) -> &'static str {
    if tls {
        SCHEME_TLS
    } else {
        SCHEME_PLAIN
    }
}
