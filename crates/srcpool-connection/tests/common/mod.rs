//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use srcpool_core::{Result, RowSet, SourceConfig, Transport, TransportFactory, Value};

/// Per-host transport lifecycle counts
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HostCounts {
    pub created: usize,
    pub connected: usize,
    pub dropped: usize,
}

/// Factory recording the lifecycle of every transport it builds, keyed by host
#[derive(Clone, Default)]
pub struct RecordingFactory {
    counts: Arc<Mutex<HashMap<String, HostCounts>>>,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self, host: &str) -> HostCounts {
        self.counts.lock().get(host).copied().unwrap_or_default()
    }

    /// Transports of `host` still alive, idle or checked out
    pub fn alive(&self, host: &str) -> usize {
        let counts = self.counts(host);
        counts.created - counts.dropped
    }

    fn record(&self, host: &str, f: impl FnOnce(&mut HostCounts)) {
        f(self.counts.lock().entry(host.to_string()).or_default());
    }
}

impl TransportFactory for RecordingFactory {
    fn create(&self, config: &SourceConfig) -> Box<dyn Transport> {
        self.record(&config.host, |c| c.created += 1);
        Box::new(RecordingTransport {
            host: config.host.clone(),
            connected: false,
            factory: self.clone(),
        })
    }
}

struct RecordingTransport {
    host: String,
    connected: bool,
    factory: RecordingFactory,
}

impl Transport for RecordingTransport {
    fn connect(&mut self, _config: &SourceConfig) -> Result<()> {
        self.factory.record(&self.host, |c| c.connected += 1);
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        Ok(())
    }

    fn execute(&mut self, _sql: &str, _params: &[Value]) -> Result<RowSet> {
        Ok(RowSet {
            columns: vec!["host".into()],
            rows: vec![vec![Some(self.host.clone())]],
            ..RowSet::default()
        })
    }

    fn escape(&self, text: &str) -> String {
        text.replace('\'', "\\'")
    }
}

impl Drop for RecordingTransport {
    fn drop(&mut self) {
        self.factory.record(&self.host, |c| c.dropped += 1);
    }
}

pub fn source(host: &str, capacity: usize) -> SourceConfig {
    SourceConfig::new(host)
        .with_credentials("app", "secret")
        .with_database("test")
        .with_max_connections(capacity)
}

/// Initialize logging for tests if not already initialized
pub fn initialize_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("srcpool_connection=debug")),
            )
            .with_test_writer()
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
