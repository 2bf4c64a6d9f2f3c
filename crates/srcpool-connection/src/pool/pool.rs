//! Pool implementation

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use srcpool_core::{SourceConfig, TransportFactory};

use super::handle::PoolHandle;
use super::stats::PoolStats;
use crate::resource::Resource;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

struct PoolState {
    idle: Vec<Resource>,
    waiting: usize,
}

/// A fixed-capacity set of resources for one source
///
/// Every resource is created when the pool is built; after that the pool only
/// moves resources between its idle set and callers. `acquire` blocks while
/// the idle set is empty and each `release` wakes one waiter, so no more than
/// `capacity` resources are ever checked out.
///
/// A pool is only reachable through [`PoolHandle`]s and is torn down when the
/// last one is dropped. Teardown requires every resource to be back in the
/// idle set; anything else means a resource escaped its checkout guard and is
/// treated as fatal.
pub struct Pool {
    id: u64,
    source: String,
    config: Arc<SourceConfig>,
    capacity: usize,
    state: Mutex<PoolState>,
    available: Condvar,
}

impl Pool {
    /// Build a pool of `capacity` unconnected resources and return its first handle.
    ///
    /// No network I/O happens here; resources connect lazily at checkout.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new<F>(
        source: impl Into<String>,
        config: SourceConfig,
        capacity: usize,
        factory: &F,
    ) -> PoolHandle
    where
        F: TransportFactory + ?Sized,
    {
        assert!(capacity > 0, "pool capacity must be greater than 0");

        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        let source = source.into();
        let config = Arc::new(config);
        let idle = (0..capacity)
            .map(|index| {
                Resource::new(index, id, Arc::clone(&config), factory.create(&config))
            })
            .collect();

        tracing::info!(
            pool_id = id,
            source = %source,
            capacity,
            target = %config.display_target(),
            "pool created"
        );

        PoolHandle::new(Self {
            id,
            source,
            config,
            capacity,
            state: Mutex::new(PoolState { idle, waiting: 0 }),
            available: Condvar::new(),
        })
    }

    /// Take an idle resource, blocking until one is released.
    ///
    /// There is no timeout and no ordering among blocked callers. Use
    /// [`Pool::acquire_timeout`] for a bounded wait.
    pub fn acquire(&self) -> Resource {
        let mut state = self.state.lock();
        let mut waited = false;
        let resource = loop {
            if let Some(resource) = state.idle.pop() {
                break resource;
            }
            if !waited {
                waited = true;
                state.waiting += 1;
                tracing::trace!(pool_id = self.id, source = %self.source, "waiting for idle resource");
            }
            self.available.wait(&mut state);
        };
        if waited {
            state.waiting -= 1;
        }
        drop(state);

        tracing::debug!(pool_id = self.id, resource_id = resource.id(), "resource acquired");
        resource
    }

    /// Take an idle resource without blocking
    pub fn try_acquire(&self) -> Option<Resource> {
        let resource = self.state.lock().idle.pop()?;
        tracing::debug!(pool_id = self.id, resource_id = resource.id(), "resource acquired");
        Some(resource)
    }

    /// Take an idle resource, waiting at most `timeout`.
    ///
    /// A timeout too large to express as a deadline waits like [`Pool::acquire`].
    pub fn acquire_timeout(&self, timeout: Duration) -> Option<Resource> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Some(self.acquire());
        };
        let mut state = self.state.lock();
        let mut waited = false;
        let resource = loop {
            if let Some(resource) = state.idle.pop() {
                break Some(resource);
            }
            if Instant::now() >= deadline {
                break None;
            }
            if !waited {
                waited = true;
                state.waiting += 1;
            }
            self.available.wait_until(&mut state, deadline);
        };
        if waited {
            state.waiting -= 1;
        }
        drop(state);

        match &resource {
            Some(resource) => {
                tracing::debug!(pool_id = self.id, resource_id = resource.id(), "resource acquired")
            }
            None => tracing::debug!(
                pool_id = self.id,
                source = %self.source,
                timeout_ms = timeout.as_millis() as u64,
                "acquire timed out"
            ),
        }
        resource
    }

    /// Return a resource to the idle set and wake one waiter.
    ///
    /// # Panics
    ///
    /// Panics if the resource belongs to another pool or the idle set is
    /// already full; both mean the pool's bookkeeping is corrupt.
    pub fn release(&self, resource: Resource) {
        if resource.pool_id() != self.id {
            tracing::error!(
                pool_id = self.id,
                resource_pool_id = resource.pool_id(),
                resource_id = resource.id(),
                "resource released into foreign pool"
            );
            panic!(
                "resource {} of pool {} released into pool {}",
                resource.id(),
                resource.pool_id(),
                self.id
            );
        }

        let resource_id = resource.id();
        let mut state = self.state.lock();
        if state.idle.len() >= self.capacity {
            drop(state);
            tracing::error!(pool_id = self.id, resource_id, "release into full pool");
            panic!(
                "pool {} already holds all {} resources",
                self.id, self.capacity
            );
        }
        state.idle.push(resource);
        self.available.notify_one();
        drop(state);

        tracing::debug!(pool_id = self.id, resource_id, "resource released");
    }

    /// Process-unique id of this pool
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Name of the source this pool was built for
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Configuration snapshot shared by this pool's resources
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn idle_count(&self) -> usize {
        self.state.lock().idle.len()
    }

    /// Get current pool statistics
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        let idle = state.idle.len();
        PoolStats::new(self.capacity, idle, state.waiting)
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        let idle = state.idle.len();
        if idle != self.capacity {
            tracing::error!(
                pool_id = self.id,
                source = %self.source,
                idle,
                capacity = self.capacity,
                "pool torn down with resources still checked out"
            );
            if std::thread::panicking() {
                std::process::abort();
            }
            panic!(
                "pool {} torn down with {} of {} resources checked out",
                self.id,
                self.capacity - idle,
                self.capacity
            );
        }

        for mut resource in state.idle.drain(..) {
            resource.disconnect();
        }

        tracing::info!(
            pool_id = self.id,
            source = %self.source,
            capacity = self.capacity,
            "pool torn down"
        );
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("capacity", &self.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}
