//! A single pooled backend resource

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use srcpool_core::{
    CLIENT_ERROR_FIRST, Result, RowSet, SourceConfig, SrcpoolError, Transport, TransportError,
    Value,
};

/// Connectivity state of a [`Resource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    /// Never connected, or cleanly disconnected
    Unconnected,
    /// Handshake completed and no fatal error seen since
    Connected,
    /// The last connect attempt or a statement hit a fatal error
    Broken,
}

/// A stateful connection to one backend, owned by exactly one pool.
///
/// Resources are built eagerly when their pool is constructed and are only
/// destroyed when that pool is torn down. They never talk to the network on
/// their own; [`Resource::connect`] is called lazily at checkout time.
pub struct Resource {
    id: usize,
    pool_id: u64,
    config: Arc<SourceConfig>,
    state: ResourceState,
    transport: Box<dyn Transport>,
}

impl Resource {
    pub(crate) fn new(
        id: usize,
        pool_id: u64,
        config: Arc<SourceConfig>,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            id,
            pool_id,
            config,
            state: ResourceState::Unconnected,
            transport,
        }
    }

    /// Index of this resource within its pool
    pub fn id(&self) -> usize {
        self.id
    }

    /// Id of the pool this resource belongs to
    pub fn pool_id(&self) -> u64 {
        self.pool_id
    }

    /// Configuration snapshot taken when the pool was built
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    pub fn autocommit(&self) -> bool {
        self.config.autocommit
    }

    /// Check if the resource holds a live backend session
    pub fn connected(&self) -> bool {
        self.state == ResourceState::Connected && self.transport.is_connected()
    }

    /// Establish the backend session.
    ///
    /// On failure the resource is left [`ResourceState::Broken`] and a
    /// `ConnectFailure` is returned. Connecting an already connected resource
    /// is a no-op.
    pub fn connect(&mut self) -> Result<()> {
        if self.connected() {
            return Ok(());
        }

        // Drop whatever is left of a previous session before the handshake.
        self.transport.disconnect();

        match self.transport.connect(&self.config) {
            Ok(()) => {
                self.state = ResourceState::Connected;
                tracing::debug!(
                    pool_id = self.pool_id,
                    resource_id = self.id,
                    target = %self.config.display_target(),
                    "resource connected"
                );
                Ok(())
            }
            Err(err) => {
                self.state = ResourceState::Broken;
                tracing::warn!(
                    pool_id = self.pool_id,
                    resource_id = self.id,
                    target = %self.config.display_target(),
                    error = %err,
                    "resource connect failed"
                );
                Err(match err {
                    SrcpoolError::ConnectFailure(cause) | SrcpoolError::Transport(cause) => {
                        SrcpoolError::ConnectFailure(cause)
                    }
                    other => SrcpoolError::ConnectFailure(TransportError::new(
                        CLIENT_ERROR_FIRST,
                        other.to_string(),
                    )),
                })
            }
        }
    }

    /// Close the backend session. Idempotent.
    ///
    /// A connected resource becomes `Unconnected`; a broken one stays
    /// `Broken` so the caller can still tell why it is unusable.
    pub fn disconnect(&mut self) {
        self.transport.disconnect();
        if self.state == ResourceState::Connected {
            self.state = ResourceState::Unconnected;
        }
    }

    /// Disconnect and connect again
    pub fn reconnect(&mut self) -> Result<()> {
        self.disconnect();
        self.connect()
    }

    pub fn begin(&mut self) -> Result<()> {
        self.ensure_connected()?;
        let result = self.transport.begin();
        self.track(result)
    }

    pub fn commit(&mut self) -> Result<()> {
        self.ensure_connected()?;
        let result = self.transport.commit();
        self.track(result)
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.ensure_connected()?;
        let result = self.transport.rollback();
        self.track(result)
    }

    /// Execute a statement on the backend session
    pub fn execute(&mut self, sql: &str, params: &[Value]) -> Result<RowSet> {
        self.ensure_connected()?;
        let result = self.transport.execute(sql, params);
        self.track(result)
    }

    /// Escape text for literal inclusion in a statement
    pub fn escape(&self, text: &str) -> String {
        self.transport.escape(text)
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected() {
            Ok(())
        } else {
            Err(SrcpoolError::Disconnected)
        }
    }

    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result
            && err.is_connection_lost()
        {
            tracing::warn!(
                pool_id = self.pool_id,
                resource_id = self.id,
                error = %err,
                "resource lost its session"
            );
            self.state = ResourceState::Broken;
        }
        result
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.id)
            .field("pool_id", &self.pool_id)
            .field("state", &self.state)
            .field("target", &self.config.display_target())
            .finish()
    }
}
