use fractalspace_common::FractalSettings;
use fractalspace_kernel::{Fractal, FractalError, Palette};

use crate::backend::InstanceBackend;
use crate::publisher::{DrawBatch, InstanceBufferPublisher, PublishError};

/// A fractal together with its level buffers.
///
/// Tree and buffers are built, rebuilt and torn down together: either both
/// exist or neither does.
pub struct RenderedFractal<B: InstanceBackend> {
    fractal: Fractal,
    publisher: InstanceBufferPublisher<B>,
}

impl<B: InstanceBackend> RenderedFractal<B> {
    /// Validate settings and start the worker pool. Nothing is built yet.
    pub fn new(
        settings: FractalSettings,
        palette: Palette,
        backend: B,
    ) -> Result<Self, PublishError> {
        let bounds_extent = settings.bounds_extent;
        let fractal = Fractal::new(settings, palette)?;
        Ok(Self {
            fractal,
            publisher: InstanceBufferPublisher::new(backend, bounds_extent),
        })
    }

    pub fn fractal(&self) -> &Fractal {
        &self.fractal
    }

    pub fn backend(&self) -> &B {
        self.publisher.backend()
    }

    pub fn is_built(&self) -> bool {
        self.fractal.is_built() && self.publisher.is_allocated()
    }

    /// Build tree and buffers from the current settings.
    pub fn build(&mut self) -> Result<(), PublishError> {
        self.publisher.teardown();
        self.fractal.build()?;
        self.allocate()
    }

    /// Tear everything down and rebuild with a new depth.
    pub fn rebuild(&mut self, new_depth: u32) -> Result<(), PublishError> {
        let settings = FractalSettings {
            depth: new_depth,
            ..self.fractal.settings().clone()
        };
        self.apply_settings(settings)
    }

    /// Replace all settings, then tear down and rebuild.
    ///
    /// On failure nothing stays built and the previous settings, bounds
    /// extent included, are back in place so [`RenderedFractal::build`] can
    /// be retried.
    pub fn apply_settings(&mut self, settings: FractalSettings) -> Result<(), PublishError> {
        self.publisher.teardown();
        let previous = self.fractal.settings().clone();
        let bounds_extent = settings.bounds_extent;
        self.fractal.apply_settings(settings)?;
        self.publisher.set_bounds_extent(bounds_extent);
        if let Err(err) = self.allocate() {
            self.restore(previous);
            return Err(err);
        }
        Ok(())
    }

    pub fn set_speed_rotation(&mut self, degrees_per_second: f32) {
        self.fractal.set_speed_rotation(degrees_per_second);
    }

    /// Step every level, then upload all level buffers.
    pub fn tick(&mut self, delta_time: f32) -> Result<&[DrawBatch<B::Handle>], PublishError> {
        self.fractal.tick(delta_time)?;
        let tree = self.fractal.tree().ok_or(FractalError::NotBuilt)?;
        self.publisher.publish(tree)
    }

    /// Draws produced by the last tick. Empty until a tick has uploaded
    /// every level.
    pub fn draw_batches(&self) -> &[DrawBatch<B::Handle>] {
        self.publisher.current_frame().unwrap_or_default()
    }

    /// Release buffers and drop the tree. Calling this again is a no-op.
    pub fn teardown(&mut self) {
        self.publisher.teardown();
        self.fractal.teardown();
    }

    fn restore(&mut self, previous: FractalSettings) {
        self.publisher.set_bounds_extent(previous.bounds_extent);
        if let Err(err) = self.fractal.configure(previous) {
            tracing::warn!(%err, "previous fractal settings could not be restored");
        }
    }

    fn allocate(&mut self) -> Result<(), PublishError> {
        let tree = self.fractal.tree().ok_or(FractalError::NotBuilt)?;
        if let Err(err) = self.publisher.allocate(tree) {
            self.fractal.teardown();
            return Err(err);
        }
        Ok(())
    }
}
