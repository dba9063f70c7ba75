use fractalspace_render::{BackendError, InstanceBackend};

/// Errors from bringing up a device without a window.
#[derive(Debug, thiserror::Error)]
pub enum GpuSetupError {
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("device request failed: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
}

/// Handle to a level buffer owned by a [`WgpuInstanceBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WgpuBufferHandle(usize);

/// Level instance buffers in GPU memory.
pub struct WgpuInstanceBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    buffers: Vec<Option<wgpu::Buffer>>,
}

impl WgpuInstanceBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            buffers: Vec::new(),
        }
    }

    /// Request any adapter and a default device, no surface required.
    pub async fn headless() -> Result<Self, GpuSetupError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuSetupError::NoAdapter)?;
        tracing::info!(adapter = ?adapter.get_info().name, "gpu adapter selected");

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("fractalspace_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;
        Ok(Self::new(device, queue))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// The buffer to bind when drawing a level.
    pub fn buffer(&self, handle: WgpuBufferHandle) -> Option<&wgpu::Buffer> {
        self.buffers.get(handle.0).and_then(Option::as_ref)
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.iter().filter(|b| b.is_some()).count()
    }
}

impl InstanceBackend for WgpuInstanceBackend {
    type Handle = WgpuBufferHandle;

    fn create_instance_buffer(
        &mut self,
        level: usize,
        instance_count: usize,
        stride: usize,
    ) -> Result<WgpuBufferHandle, BackendError> {
        let limits = self.device.limits();
        let limit = (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size);
        let size = (instance_count as u64)
            .checked_mul(stride as u64)
            .ok_or(BackendError::TooLarge {
                size: u64::MAX,
                limit,
            })?;
        if size > limit {
            return Err(BackendError::TooLarge { size, limit });
        }

        let label = format!("fractal_level_{level}_matrices");
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&label),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        tracing::debug!(level, instance_count, size, "gpu instance buffer created");

        self.buffers.push(Some(buffer));
        Ok(WgpuBufferHandle(self.buffers.len() - 1))
    }

    fn write_instances(
        &mut self,
        handle: WgpuBufferHandle,
        bytes: &[u8],
    ) -> Result<(), BackendError> {
        let buffer = self
            .buffers
            .get(handle.0)
            .and_then(Option::as_ref)
            .ok_or(BackendError::UnknownBuffer)?;
        if bytes.len() as u64 > buffer.size() {
            return Err(BackendError::Overflow {
                len: bytes.len(),
                capacity: buffer.size() as usize,
            });
        }
        self.queue.write_buffer(buffer, 0, bytes);
        Ok(())
    }

    fn release(&mut self, handle: WgpuBufferHandle) {
        match self.buffers.get_mut(handle.0).and_then(Option::take) {
            Some(buffer) => buffer.destroy(),
            None => tracing::warn!(?handle, "release of unknown gpu buffer ignored"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fractalspace_common::FractalSettings;
    use fractalspace_kernel::Palette;
    use fractalspace_render::RenderedFractal;

    fn backend() -> Option<WgpuInstanceBackend> {
        match pollster::block_on(WgpuInstanceBackend::headless()) {
            Ok(b) => Some(b),
            Err(err) => {
                eprintln!("skipping gpu test: {err}");
                None
            }
        }
    }

    #[test]
    fn level_buffers_live_on_the_gpu() {
        let Some(backend) = backend() else {
            return;
        };
        let settings = FractalSettings {
            depth: 3,
            worker_threads: 1,
            ..FractalSettings::default()
        };
        let mut r = RenderedFractal::new(settings, Palette::standard(), backend).unwrap();
        r.build().unwrap();
        let handles: Vec<WgpuBufferHandle> =
            r.tick(1.0 / 60.0).unwrap().iter().map(|b| b.buffer).collect();

        assert_eq!(r.backend().live_buffers(), 3);
        let sizes: Vec<u64> = handles
            .iter()
            .map(|h| r.backend().buffer(*h).unwrap().size())
            .collect();
        assert_eq!(sizes, vec![64, 5 * 64, 25 * 64]);

        r.teardown();
        assert_eq!(r.backend().live_buffers(), 0);
    }
}
