//! Diagnostics emitted while resolving endpoints and acquiring clients
//!
//! Each test installs a thread-local `fmt` subscriber writing into a shared
//! buffer and checks the rendered events.

use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tlsredis::{ClientFactory, ClientOptions, ClientRegistry, ConnectionOptions, Endpoint};
use tracing::Level;

/// Log sink shared between the subscriber and the test
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    fn lines_at(&self, level: &str) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.contains(level))
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture<T>(f: impl FnOnce() -> T) -> (T, CapturedLogs) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, logs)
}

struct UnitFactory;

impl ClientFactory for UnitFactory {
    type Client = ();

    fn create(&self, _options: ClientOptions) -> tlsredis::Result<()> {
        Ok(())
    }
}

#[test]
fn test_unparsable_database_logs_warning() {
    let (endpoint, logs) = capture(|| Endpoint::resolve("rediss://host:6380/bogus").unwrap());

    assert_eq!(endpoint.database(), 0);
    let warnings = logs.lines_at("WARN");
    assert_eq!(warnings.len(), 1, "logs: {}", logs.contents());
    assert!(warnings[0].contains("unable to get database number from path, using database 0"));
    assert!(warnings[0].contains("/bogus"));
}

#[test]
fn test_negative_database_logs_warning() {
    let (endpoint, logs) = capture(|| Endpoint::resolve("redis://host:6379/-4").unwrap());

    assert_eq!(endpoint.database(), 0);
    let warnings = logs.lines_at("WARN");
    assert_eq!(warnings.len(), 1, "logs: {}", logs.contents());
    assert!(warnings[0].contains("negative database number in path"));
}

#[test]
fn test_valid_database_logs_no_warning() {
    let (_, logs) = capture(|| Endpoint::resolve("redis://host:6379/2").unwrap());

    assert!(logs.lines_at("WARN").is_empty(), "logs: {}", logs.contents());
}

#[test]
fn test_cache_hit_with_different_options_logs_warning() {
    let registry = ClientRegistry::new(UnitFactory);

    let (_, logs) = capture(|| {
        registry
            .get_or_create(&ConnectionOptions::new("redis://:first@cache:6379/1"))
            .unwrap();
        registry
            .get_or_create(&ConnectionOptions::new("redis://:second@cache:6379/7"))
            .unwrap();
    });

    let warnings = logs.lines_at("WARN");
    assert_eq!(warnings.len(), 1, "logs: {}", logs.contents());
    assert!(warnings[0].contains("reusing client registered with different options"));
    assert!(warnings[0].contains("redis://cache:6379/1"));
    assert!(warnings[0].contains("redis://cache:6379/7"));
    assert!(!logs.contents().contains("second"));
}

#[test]
fn test_cache_hit_with_same_options_logs_no_warning() {
    let registry = ClientRegistry::new(UnitFactory);
    let options = ConnectionOptions::new("redis://cache:6379/1");

    let (_, logs) = capture(|| {
        registry.get_or_create(&options).unwrap();
        registry.get_or_create(&options).unwrap();
    });

    assert!(logs.lines_at("WARN").is_empty(), "logs: {}", logs.contents());
}

#[test]
fn test_registration_message_names_no_client_library() {
    let registry = ClientRegistry::new(UnitFactory);

    let (_, logs) = capture(|| {
        registry
            .get_or_create(&ConnectionOptions::new("redis://cache:6379"))
            .unwrap();
    });

    let info = logs.lines_at("INFO");
    assert_eq!(info.len(), 1, "logs: {}", logs.contents());
    assert!(info[0].contains("registered new client"));
    assert!(!info[0].contains("redis client"));
}
