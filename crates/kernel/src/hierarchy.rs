//! Fractal hierarchy: nodes stored as one flat array per level.
//!
//! Level `L` holds `child_count^L` nodes. The parent of node `i` at level `L`
//! is node `i / child_count` at level `L - 1`; its children are
//! `i * child_count .. (i + 1) * child_count` at level `L + 1`.

use std::collections::TryReserveError;
use std::f32::consts::FRAC_PI_2;
use std::ops::Range;

use fractalspace_common::{ConfigError, level_sizes};
use glam::{Mat4, Quat, Vec3};

use crate::FractalError;

/// One position in the fractal tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractalNode {
    /// Offset direction from the parent, fixed by the child slot.
    pub direction: Vec3,
    /// Orientation offset of the child slot. Never changes after build.
    pub local_rotation: Quat,
    pub world_position: Vec3,
    pub world_rotation: Quat,
    /// Accumulated spin in radians. Never wrapped.
    pub spin_angle: f32,
}

impl FractalNode {
    fn new(direction: Vec3, local_rotation: Quat) -> Self {
        Self {
            direction,
            local_rotation,
            world_position: Vec3::ZERO,
            world_rotation: Quat::IDENTITY,
            spin_angle: 0.0,
        }
    }
}

/// Per-slot direction and orientation, reused at every branching point.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub directions: Vec<Vec3>,
    pub rotations: Vec<Quat>,
}

impl Palette {
    /// Five slots: up, left, right, forward, back, each turned to face outward.
    pub fn standard() -> Self {
        Self {
            directions: vec![Vec3::Y, Vec3::NEG_X, Vec3::X, Vec3::Z, Vec3::NEG_Z],
            rotations: vec![
                Quat::IDENTITY,
                Quat::from_rotation_z(-FRAC_PI_2),
                Quat::from_rotation_z(FRAC_PI_2),
                Quat::from_rotation_x(FRAC_PI_2),
                Quat::from_rotation_x(-FRAC_PI_2),
            ],
        }
    }

    /// Number of child slots, or 0 when the two arrays disagree.
    pub fn child_count(&self) -> usize {
        if self.directions.len() == self.rotations.len() {
            self.directions.len()
        } else {
            0
        }
    }

    /// Build a tree using this palette's slots.
    pub fn build(&self, depth: u32) -> Result<FractalTree, FractalError> {
        build(
            depth,
            self.directions.len() as u32,
            &self.directions,
            &self.rotations,
        )
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::standard()
    }
}

/// The fractal: nodes and their world matrices, level by level.
///
/// `matrices[L][i]` is the world matrix of `levels[L][i]`, kept separately
/// because it is exactly what gets uploaded for instanced drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct FractalTree {
    child_count: usize,
    pub(crate) levels: Vec<Vec<FractalNode>>,
    pub(crate) matrices: Vec<Vec<Mat4>>,
}

impl FractalTree {
    pub fn child_count(&self) -> usize {
        self.child_count
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Total nodes over all levels.
    pub fn node_count(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    pub fn level(&self, level: usize) -> &[FractalNode] {
        &self.levels[level]
    }

    pub fn level_matrices(&self, level: usize) -> &[Mat4] {
        &self.matrices[level]
    }

    pub fn node(&self, level: usize, index: usize) -> Option<&FractalNode> {
        self.levels.get(level).and_then(|nodes| nodes.get(index))
    }

    pub fn root(&self) -> &FractalNode {
        &self.levels[0][0]
    }

    /// Index of the parent in the previous level. `None` for the root.
    pub fn parent_of(&self, level: usize, index: usize) -> Option<usize> {
        if level == 0 || self.node(level, index).is_none() {
            return None;
        }
        Some(index / self.child_count)
    }

    /// Indices of the children in the next level. `None` for leaves.
    pub fn children_of(&self, level: usize, index: usize) -> Option<Range<usize>> {
        if level + 1 >= self.levels.len() || self.node(level, index).is_none() {
            return None;
        }
        let first = index * self.child_count;
        Some(first..first + self.child_count)
    }

    /// FNV-1a over every node's spin and world transform.
    ///
    /// Bit-exact, so two trees hash equal only if every float matches.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        let mut mix = |value: f32| {
            for b in value.to_bits().to_le_bytes() {
                h ^= b as u64;
                h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        for node in self.levels.iter().flatten() {
            mix(node.spin_angle);
            node.world_position.to_array().into_iter().for_each(&mut mix);
            node.world_rotation.to_array().into_iter().for_each(&mut mix);
        }
        h
    }
}

/// Build a fresh tree of `depth` levels with `child_count` children per node.
///
/// `directions` and `local_rotations` must both have exactly `child_count`
/// entries. The root takes slot 0. World transforms stay at identity and the
/// matrices at zero until the first update.
pub fn build(
    depth: u32,
    child_count: u32,
    directions: &[Vec3],
    local_rotations: &[Quat],
) -> Result<FractalTree, FractalError> {
    let sizes = level_sizes(depth, child_count)?;
    let c = child_count as usize;
    if directions.len() != c || local_rotations.len() != c {
        return Err(ConfigError::PaletteMismatch {
            expected: c,
            directions: directions.len(),
            rotations: local_rotations.len(),
        }
        .into());
    }

    let mut levels = Vec::with_capacity(sizes.len());
    let mut matrices = Vec::with_capacity(sizes.len());
    for (level, &size) in sizes.iter().enumerate() {
        let alloc_failed = |_: TryReserveError| FractalError::Allocation { level, nodes: size };

        let mut nodes = Vec::new();
        nodes.try_reserve_exact(size).map_err(alloc_failed)?;
        let mut level_matrices = Vec::new();
        level_matrices.try_reserve_exact(size).map_err(alloc_failed)?;

        nodes.extend((0..size).map(|i| {
            let slot = i % c;
            FractalNode::new(directions[slot], local_rotations[slot])
        }));
        level_matrices.resize(size, Mat4::ZERO);

        levels.push(nodes);
        matrices.push(level_matrices);
    }

    tracing::debug!(depth, child_count, nodes = sizes.iter().sum::<usize>(), "fractal tree built");

    Ok(FractalTree {
        child_count: c,
        levels,
        matrices,
    })
}
