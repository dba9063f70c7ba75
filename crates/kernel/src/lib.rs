//! Fractal kernel: hierarchy construction, per-frame transform updates, lifecycle.
//!
//! # Invariants
//! - The tree is flat per-level arrays; parents and children are index arithmetic.
//! - Levels update strictly in order; nodes within a level update in parallel.
//! - A failed build never leaves a partially built tree behind.

mod error;
mod fractal;
pub mod hierarchy;
pub mod updater;

pub use error::FractalError;
pub use fractal::Fractal;
pub use hierarchy::{FractalNode, FractalTree, Palette, build};
pub use updater::{StepParams, TransformUpdater, UpdaterConfig};

pub fn crate_info() -> &'static str {
    "fractalspace-kernel v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("kernel"));
    }
}
