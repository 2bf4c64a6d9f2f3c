//! srcpool connection - pooling and source management
//!
//! This crate owns the lifecycle of pooled backend resources: the bounded
//! per-source [`Pool`], the shared-ownership [`PoolHandle`] that decides when
//! a pool is torn down, the [`PooledResource`] checkout guard, and the
//! [`SourceRegistry`] that maps source names to their current pool and
//! supports hot-swapping a source while resources are checked out.

pub mod global;
pub mod pool;
mod registry;
mod resource;
pub mod retry;

#[cfg(test)]
mod mock;

pub use pool::{Pool, PoolHandle, PoolStats, PooledResource, WeakPoolHandle};
pub use registry::SourceRegistry;
pub use resource::{Resource, ResourceState};
pub use retry::RetryPolicy;
