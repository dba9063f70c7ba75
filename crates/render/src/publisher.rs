use fractalspace_common::Bounds;
use fractalspace_kernel::{FractalError, FractalTree};
use glam::{Mat4, Vec3};

use crate::backend::{BackendError, InstanceBackend};

/// Bytes per instance: one column-major `f32` 4x4 world matrix.
pub const INSTANCE_STRIDE: usize = std::mem::size_of::<Mat4>();

/// Errors from allocating or filling level buffers.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Fractal(#[from] FractalError),
    #[error("level {level} buffer: {source}")]
    Backend {
        level: usize,
        #[source]
        source: BackendError,
    },
    #[error("level {level} has {count} instances, more than one draw call supports")]
    TooManyInstances { level: usize, count: usize },
    #[error("publisher holds {buffers} level buffers but the tree has {levels} levels")]
    LevelMismatch { buffers: usize, levels: usize },
}

/// One instanced draw: a level's buffer, how many instances it holds, and
/// the volume used for culling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawBatch<H> {
    pub level: usize,
    pub buffer: H,
    pub instance_count: u32,
    pub bounds: Bounds,
}

/// Owns one instance buffer per level and refreshes them after each step.
///
/// Bounds are a fixed-size cube around the root rather than the true extent
/// of the fractal; the edge length is configurable.
///
/// A frame is only handed out once every level has been uploaded; a failed
/// publish leaves no current frame until the next successful one.
pub struct InstanceBufferPublisher<B: InstanceBackend> {
    backend: B,
    batches: Vec<DrawBatch<B::Handle>>,
    bounds_extent: f32,
    frame_complete: bool,
}

impl<B: InstanceBackend> InstanceBufferPublisher<B> {
    pub fn new(backend: B, bounds_extent: f32) -> Self {
        Self {
            backend,
            batches: Vec::new(),
            bounds_extent,
            frame_complete: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn bounds_extent(&self) -> f32 {
        self.bounds_extent
    }

    /// Takes effect on the next publish.
    pub fn set_bounds_extent(&mut self, extent: f32) {
        self.bounds_extent = extent;
    }

    pub fn is_allocated(&self) -> bool {
        !self.batches.is_empty()
    }

    /// One batch per allocated level, whatever their contents.
    pub fn batches(&self) -> &[DrawBatch<B::Handle>] {
        &self.batches
    }

    /// The batches of the last fully uploaded frame. `None` before the first
    /// publish, after teardown, and after a publish that failed part way.
    pub fn current_frame(&self) -> Option<&[DrawBatch<B::Handle>]> {
        self.frame_complete.then_some(self.batches.as_slice())
    }

    /// Create one buffer per level of `tree`, releasing any previous set.
    ///
    /// If any level fails, the buffers created so far are released before
    /// the error is returned.
    pub fn allocate(&mut self, tree: &FractalTree) -> Result<(), PublishError> {
        self.teardown();
        let bounds = Bounds::cube(Vec3::ZERO, self.bounds_extent);
        for level in 0..tree.level_count() {
            let count = tree.level(level).len();
            let instance_count = match u32::try_from(count) {
                Ok(n) => n,
                Err(_) => {
                    self.teardown();
                    return Err(PublishError::TooManyInstances { level, count });
                }
            };
            match self
                .backend
                .create_instance_buffer(level, count, INSTANCE_STRIDE)
            {
                Ok(buffer) => self.batches.push(DrawBatch {
                    level,
                    buffer,
                    instance_count,
                    bounds,
                }),
                Err(source) => {
                    tracing::debug!(level, count, %source, "level buffer allocation failed");
                    self.teardown();
                    return Err(PublishError::Backend { level, source });
                }
            }
        }
        tracing::debug!(levels = self.batches.len(), "instance buffers allocated");
        Ok(())
    }

    /// Upload every level's matrices and return the draws for this frame.
    ///
    /// Call only after the whole tree has been stepped for the frame.
    pub fn publish(&mut self, tree: &FractalTree) -> Result<&[DrawBatch<B::Handle>], PublishError> {
        let _span = tracing::info_span!("publish_instances", levels = tree.level_count()).entered();
        self.frame_complete = false;
        if self.batches.len() != tree.level_count() {
            return Err(PublishError::LevelMismatch {
                buffers: self.batches.len(),
                levels: tree.level_count(),
            });
        }

        let bounds = Bounds::cube(tree.root().world_position, self.bounds_extent);
        for batch in &mut self.batches {
            let matrices = tree.level_matrices(batch.level);
            debug_assert_eq!(matrices.len(), batch.instance_count as usize);
            self.backend
                .write_instances(batch.buffer, bytemuck::cast_slice(matrices))
                .map_err(|source| PublishError::Backend {
                    level: batch.level,
                    source,
                })?;
            batch.bounds = bounds;
        }
        self.frame_complete = true;
        Ok(&self.batches)
    }

    /// Release every level buffer. Calling this again is a no-op.
    pub fn teardown(&mut self) {
        self.frame_complete = false;
        if self.batches.is_empty() {
            return;
        }
        tracing::debug!(levels = self.batches.len(), "releasing instance buffers");
        for batch in self.batches.drain(..) {
            self.backend.release(batch.buffer);
        }
    }
}

impl<B: InstanceBackend> Drop for InstanceBufferPublisher<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
