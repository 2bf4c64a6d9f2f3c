//! srcpool core - shared abstractions for pooled data sources
//!
//! This crate defines the pieces every other srcpool crate builds on:
//!
//! - `SourceConfig` / `SourcesFile` - per-source configuration and its TOML form
//! - `Transport` / `TransportFactory` - the backend session capability that
//!   pooled resources wrap
//! - `Value` / `RowSet` - passthrough data carried by the transport
//! - `SrcpoolError` - the error type shared by the workspace

mod config;
mod error;
mod transport;
mod types;

pub use config::*;
pub use error::*;
pub use transport::*;
pub use types::*;
