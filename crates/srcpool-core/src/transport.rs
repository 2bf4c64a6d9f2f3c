//! Backend transport capability
//!
//! The pool never speaks a wire protocol itself. Each pooled resource owns a
//! boxed [`Transport`] created by a [`TransportFactory`] and forwards session
//! and statement calls to it.

use std::sync::Arc;

use crate::{Result, RowSet, SourceConfig, Value};

/// A single backend session
///
/// Implementations must not perform network I/O until [`Transport::connect`]
/// is called.
pub trait Transport: Send {
    /// Perform the handshake using the given settings
    fn connect(&mut self, config: &SourceConfig) -> Result<()>;

    /// Close the session. Must be idempotent and must not fail.
    fn disconnect(&mut self);

    /// Check if the session is believed to be alive
    fn is_connected(&self) -> bool;

    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    /// Execute a statement with already-bound parameters
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<RowSet>;

    /// Escape a string for literal inclusion in a statement
    fn escape(&self, text: &str) -> String;
}

/// Builds unconnected transports for a source
pub trait TransportFactory: Send + Sync + 'static {
    /// Create a new, unconnected transport
    fn create(&self, config: &SourceConfig) -> Box<dyn Transport>;
}

impl<T: TransportFactory> TransportFactory for Arc<T> {
    fn create(&self, config: &SourceConfig) -> Box<dyn Transport> {
        (**self).create(config)
    }
}
