//! `srcpool soak`: concurrent checkouts while the source is hot-swapped

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use parking_lot::Mutex;
use serde::Serialize;
use srcpool_connection::{PoolStats, RetryPolicy, SourceRegistry, WeakPoolHandle};
use srcpool_core::SourceConfig;

use crate::sim::{SimulatedFactory, SimulatedTotals};

#[derive(Debug, Clone)]
pub struct SoakOptions {
    pub threads: usize,
    pub iterations: usize,
    /// Replace the source after every `swap_every` completed units of work; 0 never swaps
    pub swap_every: usize,
    pub latency: Duration,
    /// Lose the backend session on every n-th statement; 0 never does
    pub drop_every: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SoakReport {
    pub source: String,
    pub threads: usize,
    pub iterations: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub swaps: usize,
    pub retired_pools_freed: usize,
    pub elapsed_ms: u64,
    pub pool: Option<PoolStats>,
    pub backend: SimulatedTotals,
}

/// Two attempts per unit of work; delays grow fourfold from 1 ms, capped at 20 ms
fn retry_policy() -> RetryPolicy {
    RetryPolicy::default()
        .with_backoff(1, 20)
        .with_multiplier(4.0)
}

/// Drive `options.threads` workers through `options.iterations` units of work each
pub fn run(source: &str, config: &SourceConfig, options: &SoakOptions) -> anyhow::Result<SoakReport> {
    let factory = SimulatedFactory::new()
        .with_latency(options.latency)
        .with_drop_every(options.drop_every);
    let registry = SourceRegistry::new(factory.clone());
    registry
        .add_source(source, config.clone())
        .with_context(|| format!("invalid configuration for source '{source}'"))?;

    let policy = retry_policy();
    let completed = AtomicUsize::new(0);
    let succeeded = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let retired: Mutex<Vec<WeakPoolHandle>> = Mutex::new(Vec::new());

    tracing::info!(source, threads = options.threads, iterations = options.iterations, "soak started");
    let started = Instant::now();

    thread::scope(|scope| {
        for worker in 0..options.threads {
            let (registry, policy, completed, succeeded, failed, retired) =
                (&registry, &policy, &completed, &succeeded, &failed, &retired);
            scope.spawn(move || {
                for _ in 0..options.iterations {
                    let result = registry.with_connection(source, policy, |resource| {
                        resource.execute("select @@hostname", &[])
                    });
                    match result {
                        Ok(_) => succeeded.fetch_add(1, Ordering::Relaxed),
                        Err(err) => {
                            tracing::warn!(worker, error = %err, "unit of work failed");
                            failed.fetch_add(1, Ordering::Relaxed)
                        }
                    };

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if options.swap_every > 0 && done % options.swap_every == 0 {
                        match registry.replace_source(source, config.clone()) {
                            Ok(Some(previous)) => retired.lock().push(previous),
                            Ok(None) => {}
                            Err(err) => tracing::error!(error = %err, "hot-swap failed"),
                        }
                    }
                }
            });
        }
    });

    let retired = retired.into_inner();
    let report = SoakReport {
        source: source.to_string(),
        threads: options.threads,
        iterations: options.iterations,
        succeeded: succeeded.into_inner(),
        failed: failed.into_inner(),
        swaps: retired.len(),
        retired_pools_freed: retired.iter().filter(|weak| weak.is_freed()).count(),
        elapsed_ms: started.elapsed().as_millis() as u64,
        pool: registry.stats(source),
        backend: factory.totals(),
    };
    tracing::info!(
        succeeded = report.succeeded,
        failed = report.failed,
        swaps = report.swaps,
        "soak finished"
    );
    Ok(report)
}
