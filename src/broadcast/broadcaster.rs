//! Process-wide WebSocket broadcaster (`spec.md` §4.4). Implements
//! [`BatchSink`] so the throttler can deliver batches directly to it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::domain::Bar;
use crate::error::UiErrorEnvelope;
use crate::progress::BarRegistry;
use crate::sync_ext::MutexExt;
use crate::throttle::{BatchSink, EventBatch};

use super::connection::Connection;
use super::wire::{DependencyCheck, ServerEvent};

/// Default per-connection outbound queue depth before eviction kicks in.
/// Not specified numerically by `spec.md` (an Open Question, resolved in
/// `DESIGN.md`): sized generously above a single throttle batch's typical
/// event count so a brief stall does not immediately start evicting.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

pub struct Broadcaster {
    connections: std::sync::Mutex<Vec<Arc<Connection>>>,
    next_id: AtomicU64,
    capacity: usize,
    bars: Arc<BarRegistry>,
}

impl Broadcaster {
    pub fn new(bars: Arc<BarRegistry>) -> Self {
        Self::with_capacity(bars, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(bars: Arc<BarRegistry>, capacity: usize) -> Self {
        Self {
            connections: std::sync::Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            capacity,
            bars,
        }
    }

    /// Registers a freshly-upgraded socket and immediately enqueues the
    /// `connected` snapshot (`spec.md` §4.4) so the UI can re-derive state
    /// without replaying history.
    pub fn connect(&self) -> Arc<Connection> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let conn = Arc::new(Connection::new(id, self.capacity));
        let snapshot: Vec<Bar> = self.bars.snapshot();
        conn.push(ServerEvent::Connected { bars: snapshot });
        self.connections.lock_unpoisoned().push(conn.clone());
        conn
    }

    pub fn disconnect(&self, id: u64) {
        let mut conns = self.connections.lock_unpoisoned();
        conns.retain(|c| c.id != id);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock_unpoisoned().len()
    }

    fn broadcast(&self, event: ServerEvent) {
        let conns = self.connections.lock_unpoisoned();
        for conn in conns.iter() {
            conn.push(event.clone());
        }
    }

    pub fn broadcast_dependency_status(&self, checks: Vec<DependencyCheck>) {
        self.broadcast(ServerEvent::DependencyStatus { checks });
    }

    pub fn broadcast_state_llm(&self, job_id: impl Into<String>, text: impl Into<String>) {
        self.broadcast(ServerEvent::StateLlm {
            job_id: job_id.into(),
            text: text.into(),
        });
    }

    pub fn broadcast_state_wasm(&self, payload: serde_json::Value) {
        self.broadcast(ServerEvent::StateWasm { payload });
    }

    pub fn broadcast_job_complete(&self, job_id: impl Into<String>) {
        self.broadcast(ServerEvent::JobComplete {
            job_id: job_id.into(),
        });
    }

    pub fn broadcast_job_cancelled(&self, job_id: impl Into<String>) {
        self.broadcast(ServerEvent::JobCancelled {
            job_id: job_id.into(),
        });
    }

    pub fn broadcast_job_failed(&self, job_id: impl Into<String>, error: &UiErrorEnvelope) {
        self.broadcast(ServerEvent::JobFailed {
            job_id: job_id.into(),
            error: error.clone(),
        });
    }
}

impl BatchSink for Broadcaster {
    /// Splits a throttle batch into up to three wire events: logs, and bars
    /// further split into non-terminal vs. terminal groups so the UI can
    /// apply `progress.terminal` specially (`spec.md` §6 names
    /// `progress.update`/`progress.terminal` as distinct events; §4.3
    /// invariant (c) says terminal bar states are never collapsed).
    ///
    /// Delivery to the process-wide broadcaster itself cannot fail — only
    /// individual sockets apply backpressure — so this always returns
    /// `true`; the throttler's retry path exists for the case where no
    /// broadcaster is wired up yet during startup.
    fn accept(&self, batch: EventBatch) -> bool {
        if !batch.logs.is_empty() {
            self.broadcast(ServerEvent::LogBatch {
                entries: batch.logs,
            });
        }
        if !batch.bars.is_empty() {
            let (terminal, running): (Vec<Bar>, Vec<Bar>) =
                batch.bars.into_iter().partition(|bar| bar.state.is_terminal());
            if !running.is_empty() {
                self.broadcast(ServerEvent::ProgressUpdate { bars: running });
            }
            if !terminal.is_empty() {
                self.broadcast(ServerEvent::ProgressTerminal { bars: terminal });
            }
        }
        true
    }
}
