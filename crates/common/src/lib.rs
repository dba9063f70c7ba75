//! Shared value types for the fractalspace engine.
//!
//! # Invariants
//! - Settings are plain data; validation happens before any tree is built.
//! - Types here carry no GPU or threading state.

mod error;
mod settings;
mod types;

pub use error::ConfigError;
pub use settings::{FractalSettings, MAX_DEPTH, level_sizes};
pub use types::{Bounds, Transform};

pub fn crate_info() -> &'static str {
    "fractalspace-common v0.1.0"
}
