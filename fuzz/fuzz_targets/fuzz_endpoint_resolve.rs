#![no_main]

use libfuzzer_sys::fuzz_target;
use tlsredis::Endpoint;

fuzz_target!(|data: &[u8]| {
    let Ok(url) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(endpoint) = Endpoint::resolve(url) {
        // A resolved endpoint always has a host and a dialable target
        assert!(!endpoint.host().is_empty());
        assert!(endpoint.host_port().ends_with(&endpoint.port().to_string()));
    }
});
