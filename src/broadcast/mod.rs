//! WebSocket broadcaster (`spec.md` §4.4).

mod broadcaster;
mod connection;
mod wire;
mod ws;

pub use broadcaster::{Broadcaster, DEFAULT_QUEUE_CAPACITY};
pub use connection::Connection;
pub use wire::{DependencyCheck, ServerEvent};
pub use ws::ws_handler;
