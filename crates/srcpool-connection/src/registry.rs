//! Source registry mapping names to their current pool

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use srcpool_core::{Result, SourceConfig, SourcesFile, SrcpoolError, TransportFactory};

use crate::pool::{Pool, PoolHandle, PoolStats, PooledResource, WeakPoolHandle};
use crate::resource::Resource;
use crate::retry::RetryPolicy;


/// Maps source names to the handle of their current pool
///
/// The registry lock only guards the map itself: it is never held while a
/// pool is built, while a caller waits for a resource, or while a retired
/// pool is torn down.
///
/// Replacing a source swaps the map entry and drops the registry's handle to
/// the old pool. Resources checked out before the swap keep that pool alive;
/// it is torn down by whichever release returns its last resource, and every
/// release goes back to the pool the resource came from.
pub struct SourceRegistry {
    factory: Arc<dyn TransportFactory>,
    sources: Mutex<HashMap<String, PoolHandle>>,
}

impl SourceRegistry {
    /// Create an empty registry building transports with `factory`
    pub fn new<F: TransportFactory>(factory: F) -> Self {
        Self {
            factory: Arc::new(factory),
            sources: Mutex::new(HashMap::new()),
        }
    }

    /// Install a pool for `name`, replacing any previous one.
    ///
    /// The pool is sized to `config.max_connections`. The previous pool, if
    /// any, stays alive until its outstanding resources are released.
    pub fn add_source(&self, name: &str, config: SourceConfig) -> Result<()> {
        self.replace_source(name, config).map(|_| ())
    }

    /// Install a pool for `name` and return an observer of the pool it replaced
    #[tracing::instrument(skip(self, config), fields(target = %config.display_target()))]
    pub fn replace_source(
        &self,
        name: &str,
        config: SourceConfig,
    ) -> Result<Option<WeakPoolHandle>> {
        config.validate()?;

        let capacity = config.max_connections;
        let handle = Pool::new(name, config, capacity, &*self.factory);
        let pool_id = handle.id();

        let previous = self.sources.lock().insert(name.to_string(), handle);

        let Some(previous) = previous else {
            tracing::info!(pool_id, capacity, "source added");
            return Ok(None);
        };

        let retired = previous.downgrade();
        tracing::info!(
            pool_id,
            capacity,
            retired_pool_id = previous.id(),
            retired_checked_out = previous.stats().checked_out(),
            "source replaced"
        );
        drop(previous);
        Ok(Some(retired))
    }

    /// Install every source of a sources file.
    ///
    /// All configurations are validated before any pool is installed.
    pub fn add_sources(&self, file: &SourcesFile) -> Result<()> {
        for (name, config) in &file.sources {
            config.validate().map_err(|e| {
                SrcpoolError::Configuration(format!("source '{}': {}", name, e))
            })?;
        }
        for (name, config) in &file.sources {
            self.add_source(name, config.clone())?;
        }
        Ok(())
    }

    /// Remove a source. Returns false if it was not registered.
    ///
    /// Like replacement, removal never waits for checked-out resources.
    #[tracing::instrument(skip(self))]
    pub fn remove_source(&self, name: &str) -> bool {
        let removed = self.sources.lock().remove(name);
        match removed {
            Some(handle) => {
                tracing::info!(pool_id = handle.id(), "source removed");
                true
            }
            None => {
                tracing::debug!("source not registered");
                false
            }
        }
    }

    /// Check out a resource of `name`, blocking until one is idle.
    ///
    /// A resource that is not connected gets one connect attempt. If that
    /// fails the resource is disconnected and still handed out, left
    /// [`Broken`](crate::ResourceState::Broken); callers must check
    /// [`Resource::connected`] before use.
    #[tracing::instrument(skip(self))]
    pub fn get_connection(&self, name: &str) -> Result<PooledResource> {
        let handle = self.lookup(name)?;
        let resource = handle.checkout();
        Ok(Self::prepare(resource))
    }

    /// Like [`SourceRegistry::get_connection`], failing with `Timeout` if no
    /// resource becomes idle within `timeout`
    #[tracing::instrument(skip(self))]
    pub fn get_connection_timeout(&self, name: &str, timeout: Duration) -> Result<PooledResource> {
        let handle = self.lookup(name)?;
        let resource = handle.checkout_timeout(timeout).ok_or_else(|| {
            SrcpoolError::Timeout(format!(
                "no idle resource for source '{}' within {:?}",
                name, timeout
            ))
        })?;
        Ok(Self::prepare(resource))
    }

    /// Run `work` on a checked-out resource of `name`, retrying on a lost session.
    ///
    /// On success the work is committed when the source runs without
    /// autocommit. If the resource could not connect, or `work` fails with an
    /// error that leaves the session unusable, the resource is disconnected
    /// and released and the work is retried on a fresh checkout, up to the
    /// policy's attempt limit. Any other error rolls back (without autocommit)
    /// and is returned as is.
    #[tracing::instrument(skip(self, policy, work))]
    pub fn with_connection<T, F>(&self, name: &str, policy: &RetryPolicy, mut work: F) -> Result<T>
    where
        F: FnMut(&mut Resource) -> Result<T>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut resource = self.get_connection(name)?;

            let result = if resource.connected() {
                work(&mut *resource)
            } else {
                Err(SrcpoolError::Disconnected)
            };

            match result {
                Ok(value) => {
                    if !resource.autocommit() {
                        resource.commit()?;
                    }
                    return Ok(value);
                }
                Err(err) if err.is_connection_lost() => {
                    resource.disconnect();
                    resource.release();
                    if attempt >= policy.max_attempts() {
                        tracing::warn!(attempt, error = %err, "giving up after lost session");
                        return Err(err);
                    }
                    let delay = policy.delay(attempt - 1);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "session lost, retrying"
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
                Err(err) => {
                    if !resource.autocommit()
                        && let Err(rollback_err) = resource.rollback()
                    {
                        tracing::warn!(error = %rollback_err, "rollback failed");
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Get a clone of the current handle for `name`
    pub fn handle(&self, name: &str) -> Option<PoolHandle> {
        self.sources.lock().get(name).cloned()
    }

    /// Statistics for the current pool of `name`
    pub fn stats(&self, name: &str) -> Option<PoolStats> {
        self.handle(name).map(|handle| handle.stats())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.lock().contains_key(name)
    }

    /// Registered source names, sorted
    pub fn source_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.sources.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.sources.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.lock().is_empty()
    }

    fn lookup(&self, name: &str) -> Result<PoolHandle> {
        self.handle(name).ok_or_else(|| {
            tracing::debug!(source = name, "source not found");
            SrcpoolError::NotFound(name.to_string())
        })
    }

    fn prepare(mut resource: PooledResource) -> PooledResource {
        if !resource.connected() {
            tracing::debug!(
                pool_id = resource.pool_id(),
                resource_id = resource.id(),
                "resource not connected, connecting"
            );
            if let Err(err) = resource.connect() {
                tracing::warn!(
                    pool_id = resource.pool_id(),
                    resource_id = resource.id(),
                    error = %err,
                    "connect failed during checkout, handing out broken resource"
                );
                resource.disconnect();
            }
        }
        resource
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.source_names())
            .finish()
    }
}
