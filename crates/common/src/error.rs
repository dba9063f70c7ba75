/// Configuration problems detected before a fractal tree is built.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("depth must be at least 1")]
    ZeroDepth,
    #[error("child count must be at least 1")]
    ZeroChildCount,
    #[error(
        "palette must have {expected} entries per slot, got {directions} directions and {rotations} rotations"
    )]
    PaletteMismatch {
        expected: usize,
        directions: usize,
        rotations: usize,
    },
    #[error("tree of depth {depth} with {child_count} children per node is too large")]
    TreeTooLarge { depth: u32, child_count: u32 },
    #[error("setting `{field}` must be a finite number")]
    NonFinite { field: &'static str },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
