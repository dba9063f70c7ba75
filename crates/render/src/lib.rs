//! Rendering adapter: per-level instance buffers for the fractal.
//!
//! # Invariants
//! - Rendering never mutates the fractal; buffers derive from the finished frame.
//! - One buffer per level, sized at build time, never resized.
//! - Every buffer is released exactly once.
//!
//! Draw submission belongs to the caller: each frame yields one
//! [`DrawBatch`] per level (buffer, instance count, bounds), ready for an
//! instanced draw with an externally supplied mesh and material.

mod backend;
mod publisher;
mod rendered;
mod renderer;

pub use backend::{BackendError, HostBackend, HostBufferId, InstanceBackend};
pub use publisher::{DrawBatch, INSTANCE_STRIDE, InstanceBufferPublisher, PublishError};
pub use rendered::RenderedFractal;
pub use renderer::{DebugTextRenderer, Renderer};

pub fn crate_info() -> &'static str {
    "fractalspace-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
