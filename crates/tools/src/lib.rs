//! Developer tooling: fractal inspector and tick profiling.
//!
//! # Invariants
//! - Tools only read fractal state.

mod inspector;
mod profiler;

pub use inspector::{NodeInfo, TreeInspector, TreeSummary};
pub use profiler::TickProfiler;

pub fn crate_info() -> &'static str {
    "fractalspace-tools v0.1.0"
}
