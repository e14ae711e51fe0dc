//! Progress allocator and bar registry (`spec.md` §4.2).

mod allocator;
mod bars;

pub use allocator::{aggregate_percent, importance_for};
pub use bars::BarRegistry;
