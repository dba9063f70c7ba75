use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Deepest tree accepted by validation. Level sizes grow as `child_count^level`
/// so anything past this is either enormous or a degenerate single-child chain.
pub const MAX_DEPTH: u32 = 32;

/// All parameters a fractal is rebuilt from. Nothing else is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FractalSettings {
    /// Number of levels, root included.
    pub depth: u32,
    /// Children per non-leaf node. Must match the palette length.
    pub child_count: u32,
    /// Spin speed in degrees per second.
    pub speed_rotation: f32,
    /// Uniform scale of the root.
    pub base_scale: f32,
    /// Scale multiplier applied once per level.
    pub scale_bias: f32,
    /// Distance from parent to child, in units of the child's scale.
    pub position_offset: f32,
    /// Edge length of the bounding cube reported with every draw.
    pub bounds_extent: f32,
    /// Worker threads for the per-level batch job. 0 picks one per core.
    pub worker_threads: usize,
}

impl Default for FractalSettings {
    fn default() -> Self {
        Self {
            depth: 4,
            child_count: 5,
            speed_rotation: 80.0,
            base_scale: 1.0,
            scale_bias: 0.5,
            position_offset: 1.5,
            bounds_extent: 3.0,
            worker_threads: 0,
        }
    }
}

impl FractalSettings {
    /// Check every field that would make a build or a tick meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        level_sizes(self.depth, self.child_count)?;
        for (field, value) in [
            ("speed_rotation", self.speed_rotation),
            ("base_scale", self.base_scale),
            ("scale_bias", self.scale_bias),
            ("position_offset", self.position_offset),
            ("bounds_extent", self.bounds_extent),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field });
            }
        }
        Ok(())
    }

    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn load_json(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Write settings as pretty JSON.
    pub fn save_json(&self, path: &Path) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Spin increment in radians for a frame of `delta_time` seconds.
    pub fn frame_spin_delta(&self, delta_time: f32) -> f32 {
        self.speed_rotation.to_radians() * delta_time
    }

    /// Uniform scale shared by every node of `level`.
    pub fn level_scale(&self, level: usize) -> f32 {
        self.base_scale * self.scale_bias.powi(level as i32)
    }
}

/// Node count of every level, `child_count^level` for `level in 0..depth`.
///
/// Fails for zero depth or child count, and when the total node count
/// does not fit in `usize`.
pub fn level_sizes(depth: u32, child_count: u32) -> Result<Vec<usize>, ConfigError> {
    if depth == 0 {
        return Err(ConfigError::ZeroDepth);
    }
    if child_count == 0 {
        return Err(ConfigError::ZeroChildCount);
    }
    let too_large = ConfigError::TreeTooLarge { depth, child_count };
    if depth > MAX_DEPTH {
        return Err(too_large);
    }

    let mut sizes = Vec::with_capacity(depth as usize);
    let mut size = 1usize;
    let mut total = 0usize;
    for level in 0..depth {
        if level > 0 {
            size = match size.checked_mul(child_count as usize) {
                Some(s) => s,
                None => return Err(too_large),
            };
        }
        total = match total.checked_add(size) {
            Some(t) => t,
            None => return Err(too_large),
        };
        sizes.push(size);
    }
    Ok(sizes)
}
