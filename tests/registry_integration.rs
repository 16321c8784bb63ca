//! Registry behaviour under repeated and concurrent acquisition
//!
//! The factory counts constructions so the tests can verify that one endpoint
//! never yields more than one handle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tlsredis::{ClientFactory, ClientOptions, ClientRegistry, ConnectionOptions};

#[derive(Default)]
struct CountingFactory {
    constructed: AtomicUsize,
}

/// Handle that remembers what it was built from
#[derive(Debug)]
struct Handle {
    serial: usize,
    database: i64,
    password: Option<String>,
}

impl ClientFactory for CountingFactory {
    type Client = Handle;

    fn create(&self, options: ClientOptions) -> tlsredis::Result<Handle> {
        let serial = self.constructed.fetch_add(1, Ordering::SeqCst);
        // Widen the window in which a racing caller could observe a miss
        thread::sleep(Duration::from_millis(20));
        Ok(Handle {
            serial,
            database: options.database,
            password: options.password,
        })
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn test_second_request_is_cache_hit_with_first_options() {
    init_tracing();
    let registry = ClientRegistry::new(CountingFactory::default());

    let first = registry
        .acquire(&ConnectionOptions::new("redis://:first@cache:6379/1"))
        .unwrap();
    let second = registry
        .acquire(&ConnectionOptions::new("redis://:second@cache:6379/7"))
        .unwrap();

    assert!(!first.is_cache_hit());
    assert!(second.is_cache_hit());
    assert!(Arc::ptr_eq(first.client(), second.client()));

    // First-seen configuration wins
    let handle = second.into_client();
    assert_eq!(handle.database, 1);
    assert_eq!(handle.password.as_deref(), Some("first"));
    assert_eq!(registry.factory().constructed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_first_requests_build_one_handle() {
    init_tracing();
    const THREADS: usize = 16;

    let registry = Arc::new(ClientRegistry::new(CountingFactory::default()));
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|i| {
            let registry = registry.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let options = ConnectionOptions::new(format!("redis://cache:6379/{}", i));
                registry.get_or_create(&options).unwrap()
            })
        })
        .collect();

    let handles: Vec<Arc<Handle>> = workers.into_iter().map(|w| w.join().unwrap()).collect();

    assert_eq!(registry.factory().constructed.load(Ordering::SeqCst), 1);
    assert_eq!(registry.len(), 1);
    for handle in &handles {
        assert!(Arc::ptr_eq(handle, &handles[0]));
        assert_eq!(handle.serial, 0);
    }
}

#[test]
fn test_concurrent_requests_for_distinct_endpoints() {
    init_tracing();
    const ENDPOINTS: usize = 4;
    const CALLERS_PER_ENDPOINT: usize = 4;

    let registry = Arc::new(ClientRegistry::new(CountingFactory::default()));

    thread::scope(|scope| {
        for port in 0..ENDPOINTS {
            for _ in 0..CALLERS_PER_ENDPOINT {
                let registry = &registry;
                scope.spawn(move || {
                    let url = format!("redis://cache:{}", 7000 + port);
                    registry.get_or_create(&ConnectionOptions::new(url)).unwrap();
                });
            }
        }
    });

    assert_eq!(
        registry.factory().constructed.load(Ordering::SeqCst),
        ENDPOINTS
    );
    assert_eq!(registry.len(), ENDPOINTS);
    for port in 0..ENDPOINTS {
        assert!(registry.contains(&format!("cache:{}", 7000 + port)));
    }
}

#[test]
fn test_failed_acquisition_leaves_endpoint_free() {
    init_tracing();
    let registry = ClientRegistry::new(CountingFactory::default());

    let broken = ConnectionOptions::builder("rediss://cache:6380")
        .ca_file("/nonexistent/ca.pem")
        .build();
    assert!(registry.get_or_create(&broken).unwrap_err().is_config());
    assert!(!registry.contains("cache:6380"));

    // A later, valid request for the same endpoint succeeds
    let fixed = ConnectionOptions::new("rediss://cache:6380");
    let acquired = registry.acquire(&fixed).unwrap();
    assert!(!acquired.is_cache_hit());
    assert_eq!(registry.factory().constructed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_acquire_from_async_tasks() {
    let registry = Arc::new(ClientRegistry::new(CountingFactory::default()));

    let tasks = (0..8).map(|_| {
        let registry = registry.clone();
        tokio::task::spawn_blocking(move || {
            registry
                .get_or_create(&ConnectionOptions::new("redis://cache:6379"))
                .unwrap()
        })
    });
    let handles = futures::future::join_all(tasks).await;

    assert_eq!(registry.factory().constructed.load(Ordering::SeqCst), 1);
    let first = handles[0].as_ref().unwrap();
    for handle in &handles {
        assert!(Arc::ptr_eq(handle.as_ref().unwrap(), first));
    }
}
