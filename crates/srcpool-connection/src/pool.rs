//! Bounded per-source resource pools
//!
//! A [`Pool`] owns a fixed number of [`Resource`](crate::Resource)s, all
//! created up front. Callers hold the pool through a [`PoolHandle`]; the pool
//! is torn down when the last handle goes away, and a checked-out
//! [`PooledResource`] carries its own handle so a pool can never disappear
//! while one of its resources is in use.
//!
//! # Example
//!
//! ```ignore
//! use srcpool_connection::pool::Pool;
//!
//! let handle = Pool::new("testdb", config, 4, &factory);
//! let mut resource = handle.checkout();
//! resource.connect()?;
//! // Use resource...
//! // Resource returned to pool on drop
//! ```

mod handle;
mod pool;
mod stats;


pub use handle::{PoolHandle, PooledResource, WeakPoolHandle};
pub use pool::Pool;
pub use stats::PoolStats;
