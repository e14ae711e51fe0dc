//! Adaptive event throttler (`spec.md` §4.3).
//!
//! Grounded on the teacher's `queue_events` delta-coalescing pattern
//! (progress updates for the same id collapse to the latest value between
//! UI frames, terminal states always flush) generalised from Tauri's
//! frame-driven emit to a `tokio::time` tick loop with an adapting
//! interval, since this crate talks to the front-end over a WebSocket
//! instead of Tauri's IPC bridge.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::domain::{Bar, LogEntry};
use crate::sync_ext::MutexExt;

use super::events::{BatchSink, EventBatch};

/// Event rate (events/sec) above which the interval adapts toward
/// `max_interval`. Not specified numerically by `spec.md` (an Open
/// Question, resolved in `DESIGN.md`): chosen so that ordinary log
/// chatter (a few lines/sec) stays near-immediate while bulk STT token
/// streaming (hundreds/sec) coalesces aggressively.
const HIGH_RATE_EVENTS_PER_SEC: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    pub min_interval: Duration,
    pub max_interval: Duration,
    pub max_log_entries: usize,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(0),
            max_interval: Duration::from_millis(250),
            max_log_entries: 10_000,
        }
    }
}

struct ThrottlerState {
    pending_logs: Vec<LogEntry>,
    pending_bars: HashMap<String, Bar>,
    current_interval: Duration,
    last_tick: Instant,
}

pub struct AdaptiveThrottler {
    config: std::sync::Mutex<ThrottleConfig>,
    state: std::sync::Mutex<ThrottlerState>,
    events_since_tick: AtomicU64,
    idle: AtomicBool,
}

impl AdaptiveThrottler {
    pub fn new(config: ThrottleConfig) -> Self {
        let current_interval = config.max_interval;
        Self {
            config: std::sync::Mutex::new(config),
            state: std::sync::Mutex::new(ThrottlerState {
                pending_logs: Vec::new(),
                pending_bars: HashMap::new(),
                current_interval,
                last_tick: Instant::now(),
            }),
            events_since_tick: AtomicU64::new(0),
            idle: AtomicBool::new(false),
        }
    }

    /// Logs are never dropped (invariant (a)) except for the bounded
    /// `max_log_entries` cap, which evicts the oldest entry first —
    /// applies whether or not the broadcaster is currently connected.
    pub fn push_log(&self, entry: LogEntry) {
        let max = self.config.lock_unpoisoned().max_log_entries;
        let mut state = self.state.lock_unpoisoned();
        state.pending_logs.push(entry);
        state.pending_logs.sort_by_key(LogEntry::sort_key);
        while state.pending_logs.len() > max {
            state.pending_logs.remove(0);
        }
        self.events_since_tick.fetch_add(1, Ordering::Relaxed);
    }

    /// Progress updates for the same bar collapse to the latest value
    /// within a window; terminal states always survive to the next flush
    /// (invariant (c)). Relying on callers to only ever push a monotone
    /// `Bar` isn't enough to guarantee that on its own, so this also
    /// enforces it at the map: a non-terminal `Bar` is never allowed to
    /// overwrite a pending entry that already recorded a terminal state.
    pub fn push_bar(&self, bar: Bar) {
        let mut state = self.state.lock_unpoisoned();
        if let Some(existing) = state.pending_bars.get(&bar.id) {
            if existing.state.is_terminal() && !bar.state.is_terminal() {
                return;
            }
        }
        state.pending_bars.insert(bar.id.clone(), bar);
        self.events_since_tick.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_idle(&self, idle: bool) {
        self.idle.store(idle, Ordering::Relaxed);
    }

    /// Hot-update from `SaveSettings` (`spec.md` §4.8): new bounds apply to
    /// the next emitted batch without discarding whatever is pending.
    pub fn reconfigure(&self, min_interval: Duration, max_interval: Duration, max_log_entries: usize) {
        let mut config = self.config.lock_unpoisoned();
        config.min_interval = min_interval;
        config.max_interval = max_interval;
        config.max_log_entries = max_log_entries;
    }

    pub fn current_interval(&self) -> Duration {
        self.state.lock_unpoisoned().current_interval
    }

    /// Snapshot the pending buffer without clearing it — used to build a
    /// batch to attempt delivery of; the caller must call
    /// [`Self::clear_after_flush`] once delivery succeeds.
    fn snapshot_batch(&self) -> EventBatch {
        let state = self.state.lock_unpoisoned();
        let mut bars: Vec<Bar> = state.pending_bars.values().cloned().collect();
        bars.sort_by(|a, b| a.id.cmp(&b.id));
        EventBatch {
            logs: state.pending_logs.clone(),
            bars,
        }
    }

    fn clear_after_flush(&self) {
        let mut state = self.state.lock_unpoisoned();
        state.pending_logs.clear();
        state.pending_bars.clear();
    }

    /// Recompute `current_interval` from the event rate observed since the
    /// last tick, clamped to `[min_interval, max_interval]`; an idle user
    /// pins the interval at `max_interval` regardless of rate (invariant
    /// (d)).
    fn adapt_interval(&self) {
        let config = self.config.lock_unpoisoned().clone();
        let mut state = self.state.lock_unpoisoned();
        let elapsed = state.last_tick.elapsed().as_secs_f64().max(0.001);
        let events = self.events_since_tick.swap(0, Ordering::Relaxed) as f64;
        let rate = events / elapsed;

        let target = if self.idle.load(Ordering::Relaxed) {
            config.max_interval
        } else if rate > HIGH_RATE_EVENTS_PER_SEC {
            config.max_interval
        } else {
            config.min_interval
        };

        // Move a third of the way toward the target each tick so interval
        // changes are smooth rather than a step function.
        let current_ms = state.current_interval.as_millis() as i64;
        let target_ms = target.as_millis() as i64;
        let next_ms = current_ms + (target_ms - current_ms) / 3;
        state.current_interval = Duration::from_millis(next_ms.clamp(
            config.min_interval.as_millis() as i64,
            config.max_interval.as_millis() as i64,
        ) as u64);
        state.last_tick = Instant::now();
    }

    /// One throttle cycle: adapt the interval, attempt delivery if there is
    /// anything pending. Returns `true` if a (possibly empty) batch was
    /// successfully delivered to `sink`.
    pub fn tick(&self, sink: &dyn BatchSink) -> bool {
        self.adapt_interval();
        let batch = self.snapshot_batch();
        if batch.is_empty() {
            return true;
        }
        if sink.accept(batch) {
            self.clear_after_flush();
            true
        } else {
            false
        }
    }

    /// Runs the tick loop until `cancel` fires. Lives in its own task,
    /// constructed once per process and shared via `Arc` with every
    /// producer (`spec.md` §9 "Cyclic references").
    pub async fn run(self: Arc<Self>, sink: Arc<dyn BatchSink>, cancel: CancellationToken) {
        loop {
            let interval = self.current_interval().max(Duration::from_millis(1));
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
            self.tick(sink.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BarState;
    use std::sync::Mutex as StdMutex;

    struct RecordingSink {
        batches: StdMutex<Vec<EventBatch>>,
        accept: AtomicBool,
    }

    impl RecordingSink {
        fn new(accept: bool) -> Self {
            Self {
                batches: StdMutex::new(Vec::new()),
                accept: AtomicBool::new(accept),
            }
        }
    }

    impl BatchSink for RecordingSink {
        fn accept(&self, batch: EventBatch) -> bool {
            if self.accept.load(Ordering::Relaxed) {
                self.batches.lock().unwrap().push(batch);
                true
            } else {
                false
            }
        }
    }

    fn sample_log(seq: u64, time_ms: i64) -> LogEntry {
        LogEntry {
            level: 1,
            message: format!("m{seq}"),
            component: "engine".into(),
            operation: "run".into(),
            session_id: "s1".into(),
            context: Default::default(),
            sequence: seq,
            unix_time_ms: time_ms,
        }
    }

    #[test]
    fn logs_are_never_dropped_on_successful_flush() {
        let throttler = AdaptiveThrottler::new(ThrottleConfig::default());
        throttler.push_log(sample_log(2, 200));
        throttler.push_log(sample_log(1, 100));
        let sink = RecordingSink::new(true);
        assert!(throttler.tick(&sink));
        let batches = sink.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].logs.len(), 2);
        assert_eq!(batches[0].logs[0].sequence, 1);
        assert_eq!(batches[0].logs[1].sequence, 2);
    }

    #[test]
    fn failed_delivery_retains_pending_buffer() {
        let throttler = AdaptiveThrottler::new(ThrottleConfig::default());
        throttler.push_log(sample_log(1, 100));
        let sink = RecordingSink::new(false);
        assert!(!throttler.tick(&sink));

        let sink2 = RecordingSink::new(true);
        assert!(throttler.tick(&sink2));
        assert_eq!(sink2.batches.lock().unwrap()[0].logs.len(), 1);
    }

    #[test]
    fn bar_updates_for_same_id_collapse_to_latest() {
        let throttler = AdaptiveThrottler::new(ThrottleConfig::default());
        let mut bar = Bar::new("media-bar-job1", 100);
        bar.set_progress(10);
        throttler.push_bar(bar.clone());
        bar.set_progress(50);
        throttler.push_bar(bar);

        let sink = RecordingSink::new(true);
        throttler.tick(&sink);
        let batches = sink.batches.lock().unwrap();
        assert_eq!(batches[0].bars.len(), 1);
        assert_eq!(batches[0].bars[0].current, 50);
    }

    #[test]
    fn terminal_bar_state_survives_to_flush() {
        let throttler = AdaptiveThrottler::new(ThrottleConfig::default());
        let mut bar = Bar::new("media-bar-job1", 100);
        bar.set_state(BarState::Completed);
        throttler.push_bar(bar);

        let sink = RecordingSink::new(true);
        throttler.tick(&sink);
        let batches = sink.batches.lock().unwrap();
        assert_eq!(batches[0].bars[0].state, BarState::Completed);
    }

    #[test]
    fn push_bar_rejects_a_downgrade_from_terminal() {
        let throttler = AdaptiveThrottler::new(ThrottleConfig::default());
        let mut bar = Bar::new("media-bar-job1", 100);
        bar.set_state(BarState::Completed);
        throttler.push_bar(bar);

        // A late, stale non-terminal update for the same id (e.g. a
        // straggling progress tick racing the terminal one) must not
        // overwrite the terminal state already pending.
        let stale = Bar::new("media-bar-job1", 100);
        throttler.push_bar(stale);

        let sink = RecordingSink::new(true);
        throttler.tick(&sink);
        let batches = sink.batches.lock().unwrap();
        assert_eq!(batches[0].bars[0].state, BarState::Completed);
    }

    #[test]
    fn idle_user_clamps_interval_to_max() {
        let throttler = AdaptiveThrottler::new(ThrottleConfig::default());
        throttler.set_idle(true);
        for _ in 0..5 {
            throttler.adapt_interval();
        }
        assert_eq!(
            throttler.current_interval(),
            throttler.config.lock_unpoisoned().max_interval
        );
    }

    #[test]
    fn log_buffer_is_capped_by_max_log_entries() {
        let throttler = AdaptiveThrottler::new(ThrottleConfig {
            min_interval: Duration::from_millis(0),
            max_interval: Duration::from_millis(250),
            max_log_entries: 2,
        });
        throttler.push_log(sample_log(1, 100));
        throttler.push_log(sample_log(2, 200));
        throttler.push_log(sample_log(3, 300));
        let batch = throttler.snapshot_batch();
        assert_eq!(batch.logs.len(), 2);
        assert_eq!(batch.logs[0].sequence, 2);
    }
}
