//! Adaptive event throttler (`spec.md` §4.3): merges log/progress/state
//! events into rate-adapted batches for the broadcaster.

mod events;
mod throttler;

pub use events::{BatchSink, EventBatch};
pub use throttler::{AdaptiveThrottler, ThrottleConfig};
