//! Simulated backend used by `srcpool soak`
//!
//! Transports answer every statement with the host they were built for,
//! optionally after a fixed latency, and can be told to drop their session on
//! every n-th statement to exercise the retry path.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use serde::Serialize;
use srcpool_core::{
    Result, RowSet, SERVER_GONE_ERROR, SourceConfig, SrcpoolError, Transport, TransportError,
    TransportFactory, Value,
};

#[derive(Debug, Default)]
struct Counters {
    created: AtomicUsize,
    dropped: AtomicUsize,
    connects: AtomicUsize,
    statements: AtomicU64,
    dropped_sessions: AtomicUsize,
}

/// Transport lifecycle totals of a [`SimulatedFactory`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SimulatedTotals {
    pub transports_created: usize,
    pub transports_dropped: usize,
    pub connects: usize,
    pub statements: u64,
    pub dropped_sessions: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedFactory {
    latency: Duration,
    drop_every: Option<u64>,
    counters: Arc<Counters>,
}

impl SimulatedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every statement by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Lose the session on every `n`-th statement, counted across all transports.
    /// Zero disables it.
    pub fn with_drop_every(mut self, n: u64) -> Self {
        self.drop_every = (n > 0).then_some(n);
        self
    }

    pub fn totals(&self) -> SimulatedTotals {
        SimulatedTotals {
            transports_created: self.counters.created.load(Ordering::SeqCst),
            transports_dropped: self.counters.dropped.load(Ordering::SeqCst),
            connects: self.counters.connects.load(Ordering::SeqCst),
            statements: self.counters.statements.load(Ordering::SeqCst),
            dropped_sessions: self.counters.dropped_sessions.load(Ordering::SeqCst),
        }
    }
}

impl TransportFactory for SimulatedFactory {
    fn create(&self, config: &SourceConfig) -> Box<dyn Transport> {
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        Box::new(SimulatedTransport {
            host: config.host.clone(),
            connected: false,
            latency: self.latency,
            drop_every: self.drop_every,
            counters: Arc::clone(&self.counters),
        })
    }
}

struct SimulatedTransport {
    host: String,
    connected: bool,
    latency: Duration,
    drop_every: Option<u64>,
    counters: Arc<Counters>,
}

impl Transport for SimulatedTransport {
    fn connect(&mut self, _config: &SourceConfig) -> Result<()> {
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
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
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }

        let n = self.counters.statements.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(every) = self.drop_every
            && n % every == 0
        {
            self.connected = false;
            self.counters.dropped_sessions.fetch_add(1, Ordering::SeqCst);
            return Err(SrcpoolError::Transport(TransportError::new(
                SERVER_GONE_ERROR,
                "MySQL server has gone away",
            )));
        }

        Ok(RowSet {
            columns: vec!["host".into()],
            rows: vec![vec![Some(self.host.clone())]],
            ..RowSet::default()
        })
    }

    fn escape(&self, text: &str) -> String {
        text.replace('\\', "\\\\").replace('\'', "\\'")
    }
}

impl Drop for SimulatedTransport {
    fn drop(&mut self) {
        self.counters.dropped.fetch_add(1, Ordering::SeqCst);
    }
}
