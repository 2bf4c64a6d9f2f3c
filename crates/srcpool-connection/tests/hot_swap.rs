//! Hot-swap tests
//!
//! Replacing a source while resources are checked out: checkouts after the
//! swap see the new pool, releases return to the pool they came from, and a
//! retired pool is torn down exactly when its last resource comes back.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;
use rstest::*;
use srcpool_connection::{PoolStats, SourceRegistry};

use common::{RecordingFactory, initialize_logging, source};

#[fixture]
fn registry() -> (SourceRegistry, RecordingFactory) {
    initialize_logging();
    let factory = RecordingFactory::new();
    (SourceRegistry::new(factory.clone()), factory)
}

#[rstest]
fn test_capacity_bounds_checkouts(registry: (SourceRegistry, RecordingFactory)) -> anyhow::Result<()> {
    let (registry, _factory) = registry;
    let registry = Arc::new(registry);
    registry.add_source("db", source("host-a", 2))?;

    let first = registry.get_connection("db")?;
    let second = registry.get_connection("db")?;
    assert_ne!(first.id(), second.id());

    let (tx, rx) = mpsc::channel();
    let waiter = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            let third = registry.get_connection("db").map(|r| r.id());
            let _ = tx.send(third);
        })
    };

    assert!(
        rx.recv_timeout(Duration::from_millis(100)).is_err(),
        "third checkout must block while both resources are out"
    );
    assert_eq!(registry.stats("db").map(|s| s.waiting()), Some(1));

    let first_id = first.id();
    drop(first);
    let third = rx.recv_timeout(Duration::from_secs(5))??;
    assert_eq!(third, first_id);

    waiter.join().expect("waiter thread");
    drop(second);
    assert_eq!(registry.stats("db"), Some(PoolStats::new(2, 2, 0)));
    Ok(())
}

#[rstest]
fn test_swap_while_checked_out(registry: (SourceRegistry, RecordingFactory)) -> anyhow::Result<()> {
    let (registry, factory) = registry;
    registry.add_source("db", source("host-a", 2))?;

    let mut held = registry.get_connection("db")?;
    registry.add_source("db", source("host-b", 2))?;

    let mut fresh = registry.get_connection("db")?;
    assert_eq!(fresh.execute("select @@hostname", &[])?.first_value(), Some("host-b"));
    assert_eq!(held.execute("select @@hostname", &[])?.first_value(), Some("host-a"));

    assert_eq!(factory.alive("host-a"), 2, "old pool lives while a resource is out");
    drop(held);
    assert_eq!(factory.alive("host-a"), 0, "old pool freed by the last release");
    assert_eq!(factory.counts("host-a").dropped, 2);

    drop(fresh);
    assert_eq!(factory.alive("host-b"), 2);
    assert_eq!(registry.stats("db"), Some(PoolStats::new(2, 2, 0)));
    Ok(())
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(2)]
#[case(3)]
fn test_retired_pool_freed_after_last_release(
    registry: (SourceRegistry, RecordingFactory),
    #[case] outstanding: usize,
) -> anyhow::Result<()> {
    let (registry, factory) = registry;
    registry.add_source("db", source("host-a", 3))?;

    let mut held: Vec<_> = (0..outstanding)
        .map(|_| registry.get_connection("db"))
        .collect::<Result<_, _>>()?;

    let retired = registry
        .replace_source("db", source("host-b", 1))?
        .expect("host-a pool retired");

    while let Some(resource) = held.pop() {
        assert!(!retired.is_freed());
        assert_eq!(factory.alive("host-a"), 3);
        drop(resource);
    }

    assert!(retired.is_freed());
    assert_eq!(factory.counts("host-a").dropped, 3);
    assert_eq!(factory.alive("host-b"), 1);
    Ok(())
}

#[rstest]
fn test_concurrent_checkouts_during_swaps(
    registry: (SourceRegistry, RecordingFactory),
) -> anyhow::Result<()> {
    const WORKERS: usize = 6;
    const SWAPS: usize = 20;

    let (registry, factory) = registry;
    let registry = Arc::new(registry);
    registry.add_source("db", source("host-0", 3))?;

    let stop = Arc::new(AtomicBool::new(false));
    let served = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..WORKERS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let stop = Arc::clone(&stop);
            let served = Arc::clone(&served);
            thread::spawn(move || -> anyhow::Result<()> {
                while !stop.load(Ordering::SeqCst) {
                    let mut resource = registry.get_connection("db")?;
                    let rows = resource.execute("select @@hostname", &[])?;
                    // A checkout is served entirely by one pool
                    assert_eq!(rows.first_value(), Some(resource.config().host.as_str()));
                    served.fetch_add(1, Ordering::SeqCst);
                }
                Ok(())
            })
        })
        .collect();

    let mut retired = Vec::new();
    for swap in 1..=SWAPS {
        thread::sleep(Duration::from_millis(2));
        let previous = registry.replace_source("db", source(&format!("host-{swap}"), 3))?;
        retired.extend(previous);
    }

    stop.store(true, Ordering::SeqCst);
    for worker in workers {
        worker.join().expect("worker thread")?;
    }

    assert!(served.load(Ordering::SeqCst) > 0);
    assert_eq!(retired.len(), SWAPS);
    assert!(retired.iter().all(|weak| weak.is_freed()));
    for swap in 0..SWAPS {
        assert_eq!(factory.alive(&format!("host-{swap}")), 0);
    }
    assert_eq!(factory.alive(&format!("host-{SWAPS}")), 3);
    assert_eq!(registry.stats("db"), Some(PoolStats::new(3, 3, 0)));
    Ok(())
}
