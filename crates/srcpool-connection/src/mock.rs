//! In-memory transport used by the unit tests

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use srcpool_core::{
    Result, RowSet, SourceConfig, SrcpoolError, Transport, TransportError, TransportFactory, Value,
};

#[derive(Default)]
struct Counters {
    fail_connect: AtomicBool,
    created: AtomicUsize,
    connects: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    dropped: AtomicUsize,
    execute_errors: Mutex<VecDeque<TransportError>>,
}

/// Factory whose transports share one set of counters
#[derive(Clone, Default)]
pub(crate) struct MockFactory {
    counters: Arc<Counters>,
}

impl MockFactory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_fail_connect(&self, fail: bool) {
        self.counters.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Queue an error for the next `execute` on any transport
    pub(crate) fn push_execute_error(&self, err: TransportError) {
        self.counters.execute_errors.lock().push_back(err);
    }

    pub(crate) fn created(&self) -> usize {
        self.counters.created.load(Ordering::SeqCst)
    }

    pub(crate) fn connects(&self) -> usize {
        self.counters.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn commits(&self) -> usize {
        self.counters.commits.load(Ordering::SeqCst)
    }

    pub(crate) fn rollbacks(&self) -> usize {
        self.counters.rollbacks.load(Ordering::SeqCst)
    }

    /// Number of transports destroyed, i.e. discarded by pool teardown
    pub(crate) fn dropped(&self) -> usize {
        self.counters.dropped.load(Ordering::SeqCst)
    }
}

impl TransportFactory for MockFactory {
    fn create(&self, config: &SourceConfig) -> Box<dyn Transport> {
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        Box::new(MockTransport {
            host: config.host.clone(),
            connected: false,
            counters: Arc::clone(&self.counters),
        })
    }
}

struct MockTransport {
    host: String,
    connected: bool,
    counters: Arc<Counters>,
}

impl Transport for MockTransport {
    fn connect(&mut self, _config: &SourceConfig) -> Result<()> {
        if self.counters.fail_connect.load(Ordering::SeqCst) {
            return Err(SrcpoolError::ConnectFailure(TransportError::new(
                2003,
                format!("Can't connect to server on '{}'", self.host),
            )));
        }
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
        self.counters.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn execute(&mut self, _sql: &str, _params: &[Value]) -> Result<RowSet> {
        if let Some(err) = self.counters.execute_errors.lock().pop_front() {
            if err.is_fatal() {
                self.connected = false;
            }
            return Err(SrcpoolError::Transport(err));
        }
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

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.counters.dropped.fetch_add(1, Ordering::SeqCst);
    }
}
