/// Failures reported by an instance buffer backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("out of buffer memory: requested {requested} bytes, {available} available")]
    OutOfMemory { requested: u64, available: u64 },
    #[error("buffer of {size} bytes exceeds the backend limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },
    #[error("write of {len} bytes overflows a {capacity} byte buffer")]
    Overflow { len: usize, capacity: usize },
    #[error("unknown or released buffer")]
    UnknownBuffer,
}

/// Where level instance buffers live: GPU memory or a host-side stand-in.
///
/// The publisher creates one buffer per level at build time, rewrites its
/// contents every frame and releases it at teardown.
pub trait InstanceBackend {
    type Handle: Copy + Eq + std::fmt::Debug;

    /// Create a buffer holding `instance_count` elements of `stride` bytes.
    fn create_instance_buffer(
        &mut self,
        level: usize,
        instance_count: usize,
        stride: usize,
    ) -> Result<Self::Handle, BackendError>;

    /// Overwrite the start of the buffer with `bytes`.
    fn write_instances(&mut self, handle: Self::Handle, bytes: &[u8]) -> Result<(), BackendError>;

    /// Free the buffer. Unknown or already released handles are ignored.
    fn release(&mut self, handle: Self::Handle);
}

/// Handle into a [`HostBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostBufferId(usize);

/// Host-memory backend for headless runs and tests.
///
/// An optional byte budget makes allocation fail the way a GPU
/// out-of-memory condition would.
#[derive(Debug, Default)]
pub struct HostBackend {
    buffers: Vec<Option<Vec<u8>>>,
    budget: Option<usize>,
    allocated_bytes: usize,
    created: usize,
    released: usize,
}

impl HostBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that refuses to hold more than `bytes` at once.
    pub fn with_budget(bytes: usize) -> Self {
        Self {
            budget: Some(bytes),
            ..Self::default()
        }
    }

    /// Buffers created and not yet released.
    pub fn live_buffers(&self) -> usize {
        self.buffers.iter().filter(|b| b.is_some()).count()
    }

    pub fn created_count(&self) -> usize {
        self.created
    }

    pub fn released_count(&self) -> usize {
        self.released
    }

    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes
    }

    /// Current contents of a live buffer.
    pub fn contents(&self, id: HostBufferId) -> Option<&[u8]> {
        self.buffers.get(id.0).and_then(|b| b.as_deref())
    }
}

impl InstanceBackend for HostBackend {
    type Handle = HostBufferId;

    fn create_instance_buffer(
        &mut self,
        level: usize,
        instance_count: usize,
        stride: usize,
    ) -> Result<HostBufferId, BackendError> {
        let size = instance_count
            .checked_mul(stride)
            .ok_or(BackendError::TooLarge {
                size: u64::MAX,
                limit: usize::MAX as u64,
            })?;
        let available = self
            .budget
            .map_or(usize::MAX, |b| b.saturating_sub(self.allocated_bytes));
        if size > available {
            return Err(BackendError::OutOfMemory {
                requested: size as u64,
                available: available as u64,
            });
        }

        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(size)
            .map_err(|_| BackendError::OutOfMemory {
                requested: size as u64,
                available: available as u64,
            })?;
        bytes.resize(size, 0);

        self.buffers.push(Some(bytes));
        self.allocated_bytes += size;
        self.created += 1;
        tracing::trace!(level, instance_count, size, "host instance buffer created");
        Ok(HostBufferId(self.buffers.len() - 1))
    }

    fn write_instances(&mut self, id: HostBufferId, bytes: &[u8]) -> Result<(), BackendError> {
        let buffer = self
            .buffers
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(BackendError::UnknownBuffer)?;
        if bytes.len() > buffer.len() {
            return Err(BackendError::Overflow {
                len: bytes.len(),
                capacity: buffer.len(),
            });
        }
        buffer[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn release(&mut self, id: HostBufferId) {
        match self.buffers.get_mut(id.0).and_then(Option::take) {
            Some(bytes) => {
                self.allocated_bytes -= bytes.len();
                self.released += 1;
            }
            None => tracing::warn!(?id, "release of unknown host buffer ignored"),
        }
    }
}
