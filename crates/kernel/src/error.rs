use fractalspace_common::ConfigError;

/// Errors from building, rebuilding or ticking a fractal.
#[derive(Debug, thiserror::Error)]
pub enum FractalError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    #[error("failed to allocate {nodes} nodes for level {level}")]
    Allocation { level: usize, nodes: usize },
    #[error("worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    #[error("fractal has not been built")]
    NotBuilt,
    #[error("frame time must be finite and non-negative, got {delta_time}")]
    InvalidTimeStep { delta_time: f32 },
}
