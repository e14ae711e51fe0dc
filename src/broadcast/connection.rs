//! Per-connection outbound queue with backpressure eviction
//! (`spec.md` §4.4).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

use crate::sync_ext::MutexExt;

use super::wire::ServerEvent;

pub struct Connection {
    pub id: u64,
    queue: std::sync::Mutex<VecDeque<ServerEvent>>,
    capacity: usize,
    pub(super) notify: Notify,
    closed: AtomicBool,
}

impl Connection {
    pub fn new(id: u64, capacity: usize) -> Self {
        Self {
            id,
            queue: std::sync::Mutex::new(VecDeque::new()),
            capacity,
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
        self.notify.notify_waiters();
    }

    /// Non-blocking enqueue. Logs are never evicted to make room; progress
    /// and the connected snapshot are evicted oldest-first when the queue
    /// is saturated. If the queue is still full after evicting every
    /// evictable entry (i.e. it is full of un-evictable log events), the
    /// connection is closed rather than growing without bound.
    pub fn push(&self, event: ServerEvent) {
        if self.is_closed() {
            return;
        }
        let mut queue = self.queue.lock_unpoisoned();
        if queue.len() >= self.capacity {
            if let Some(pos) = queue.iter().position(|e| !e.is_log()) {
                queue.remove(pos);
            } else {
                drop(queue);
                self.close();
                return;
            }
        }
        queue.push_back(event);
        drop(queue);
        self.notify.notify_waiters();
    }

    /// Drain everything currently queued, for the writer task to flush to
    /// the socket.
    pub fn drain(&self) -> Vec<ServerEvent> {
        let mut queue = self.queue.lock_unpoisoned();
        queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock_unpoisoned().len()
    }
}
