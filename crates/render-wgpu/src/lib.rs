//! wgpu backend for fractal instance buffers.
//!
//! Each level gets a `STORAGE | COPY_DST` buffer holding its world matrices,
//! refreshed every frame through the queue. Binding the buffers and issuing
//! the instanced draws is left to the application's render pass.
//!
//! # Invariants
//! - Buffers are never resized; a rebuild creates a new set.
//! - Released buffers are destroyed immediately.

mod gpu;

pub use gpu::{GpuSetupError, WgpuBufferHandle, WgpuInstanceBackend};
