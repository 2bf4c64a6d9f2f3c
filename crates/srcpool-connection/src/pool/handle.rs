//! Shared ownership of pools and the checkout guard

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Weak};
use std::time::Duration;

use super::pool::Pool;
use crate::resource::Resource;

/// A shared-ownership reference to a [`Pool`]
///
/// Cloning increments the reference count; dropping decrements it, and the
/// drop that takes the count to zero tears the pool down. The registry holds
/// one handle per current source and every checked-out resource holds
/// another, so a replaced pool stays alive until its last resource comes back.
#[derive(Clone)]
pub struct PoolHandle {
    pool: Arc<Pool>,
}

impl PoolHandle {
    pub(crate) fn new(pool: Pool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Check out a resource, blocking until one is idle.
    ///
    /// The returned guard owns its own clone of this handle, taken before
    /// blocking, and gives the resource back to this pool when released.
    pub fn checkout(&self) -> PooledResource {
        let handle = self.clone();
        let resource = handle.acquire();
        PooledResource::new(resource, handle)
    }

    /// Check out a resource if one is idle right now
    pub fn try_checkout(&self) -> Option<PooledResource> {
        let handle = self.clone();
        let resource = handle.try_acquire()?;
        Some(PooledResource::new(resource, handle))
    }

    /// Check out a resource, waiting at most `timeout`
    pub fn checkout_timeout(&self, timeout: Duration) -> Option<PooledResource> {
        let handle = self.clone();
        let resource = handle.acquire_timeout(timeout)?;
        Some(PooledResource::new(resource, handle))
    }

    /// Number of live handles to this pool
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.pool)
    }

    /// Observe the pool without keeping it alive
    pub fn downgrade(&self) -> WeakPoolHandle {
        WeakPoolHandle {
            pool: Arc::downgrade(&self.pool),
            pool_id: self.pool.id(),
        }
    }

    /// Check if two handles refer to the same pool
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.pool, &b.pool)
    }
}

impl Deref for PoolHandle {
    type Target = Pool;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}

impl fmt::Debug for PoolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolHandle")
            .field("pool_id", &self.pool.id())
            .field("source", &self.pool.source())
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

/// A non-owning observer of a pool
///
/// Returned when a source is replaced so callers can tell when the retired
/// pool has drained and been torn down.
#[derive(Clone)]
pub struct WeakPoolHandle {
    pool: Weak<Pool>,
    pool_id: u64,
}

impl WeakPoolHandle {
    /// Get a handle if the pool has not been torn down yet
    pub fn upgrade(&self) -> Option<PoolHandle> {
        self.pool.upgrade().map(|pool| PoolHandle { pool })
    }

    pub fn pool_id(&self) -> u64 {
        self.pool_id
    }

    /// Number of live handles still pinning the pool
    pub fn ref_count(&self) -> usize {
        self.pool.strong_count()
    }

    /// Check if the pool has been torn down
    pub fn is_freed(&self) -> bool {
        self.pool.strong_count() == 0
    }
}

impl fmt::Debug for WeakPoolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakPoolHandle")
            .field("pool_id", &self.pool_id)
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

/// A resource checked out of a pool
///
/// Holds the resource together with the handle of the pool it came from.
/// [`PooledResource::release`] (or dropping the guard) puts the resource back
/// into that pool first and then drops the handle, so a retired pool is torn
/// down by whichever release returns its last resource.
pub struct PooledResource {
    resource: Option<Resource>,
    handle: Option<PoolHandle>,
}

impl PooledResource {
    fn new(resource: Resource, handle: PoolHandle) -> Self {
        Self {
            resource: Some(resource),
            handle: Some(handle),
        }
    }

    /// Return the resource to its pool. A no-op once released.
    pub fn release(&mut self) {
        if let Some(resource) = self.resource.take()
            && let Some(handle) = self.handle.take()
        {
            handle.release(resource);
        }
    }

    /// Release and consume the guard
    pub fn close(mut self) {
        self.release();
    }

    pub fn is_released(&self) -> bool {
        self.resource.is_none()
    }

    /// Handle of the pool this resource was checked out from
    pub fn pool(&self) -> Option<&PoolHandle> {
        self.handle.as_ref()
    }
}

impl Deref for PooledResource {
    type Target = Resource;

    fn deref(&self) -> &Self::Target {
        self.resource.as_ref().expect("resource already released")
    }
}

impl DerefMut for PooledResource {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.resource.as_mut().expect("resource already released")
    }
}

impl Drop for PooledResource {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for PooledResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledResource")
            .field("resource", &self.resource)
            .field("pool_id", &self.handle.as_ref().map(|h| h.id()))
            .finish()
    }
}
