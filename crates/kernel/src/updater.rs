//! Per-frame world transform update.
//!
//! The root is updated on the calling thread. Every deeper level is one
//! batch job on a bounded worker pool: each node reads only its parent from
//! the already finished level above and writes only its own slot, so the
//! batch needs no locks. Levels never overlap; the join at the end of each
//! batch is the barrier before the next level starts.

use fractalspace_common::{FractalSettings, Transform};
use glam::{Mat4, Quat};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::FractalError;
use crate::hierarchy::{FractalNode, FractalTree};

/// Per-frame scalars, passed by value into every batch job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepParams {
    /// Spin added to every node this frame, in radians.
    pub spin_delta: f32,
    pub base_scale: f32,
    pub scale_bias: f32,
    pub position_offset: f32,
}

impl StepParams {
    /// Parameters for one frame of `delta_time` seconds.
    pub fn from_settings(settings: &FractalSettings, delta_time: f32) -> Self {
        Self {
            spin_delta: settings.frame_spin_delta(delta_time),
            base_scale: settings.base_scale,
            scale_bias: settings.scale_bias,
            position_offset: settings.position_offset,
        }
    }

    pub fn level_scale(&self, level: usize) -> f32 {
        self.base_scale * self.scale_bias.powi(level as i32)
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdaterConfig {
    /// Number of worker threads. 0 picks one per available core.
    pub worker_threads: usize,
    /// Smallest run of nodes handed to a single worker.
    pub min_batch_len: usize,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            min_batch_len: 32,
        }
    }
}

/// Recomputes world transforms level by level on a dedicated worker pool.
pub struct TransformUpdater {
    pool: ThreadPool,
    min_batch_len: usize,
}

impl std::fmt::Debug for TransformUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformUpdater")
            .field("workers", &self.pool.current_num_threads())
            .field("min_batch_len", &self.min_batch_len)
            .finish()
    }
}

impl TransformUpdater {
    pub fn new(config: UpdaterConfig) -> Result<Self, FractalError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("fractal-worker-{i}"))
            .build()?;
        tracing::debug!(
            workers = pool.current_num_threads(),
            min_batch_len = config.min_batch_len,
            "transform updater ready"
        );
        Ok(Self {
            pool,
            min_batch_len: config.min_batch_len.max(1),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Advance every node by one frame and rewrite all world matrices.
    pub fn step(&self, tree: &mut FractalTree, params: &StepParams) {
        let _span = tracing::info_span!("fractal_step", levels = tree.level_count()).entered();
        let child_count = tree.child_count();

        let root = &mut tree.levels[0][0];
        tree.matrices[0][0] = update_root(root, params);

        for level in 1..tree.levels.len() {
            let level_scale = params.level_scale(level);
            let (above, below) = tree.levels.split_at_mut(level);
            let parents = &above[level - 1];
            let nodes = &mut below[0];
            let matrices = &mut tree.matrices[level];
            debug_assert_eq!(nodes.len(), parents.len() * child_count);
            debug_assert_eq!(nodes.len(), matrices.len());

            let spin_delta = params.spin_delta;
            let position_offset = params.position_offset;
            self.pool.install(|| {
                nodes
                    .par_iter_mut()
                    .zip(matrices.par_iter_mut())
                    .enumerate()
                    .with_min_len(self.min_batch_len)
                    .for_each(|(i, (node, matrix))| {
                        *matrix = update_child(
                            node,
                            &parents[i / child_count],
                            spin_delta,
                            level_scale,
                            position_offset,
                        );
                    });
            });
            tracing::trace!(level, nodes = nodes.len(), level_scale, "level updated");
        }
    }
}

fn update_root(root: &mut FractalNode, params: &StepParams) -> Mat4 {
    root.spin_angle += params.spin_delta;
    root.world_rotation = root.local_rotation * Quat::from_rotation_y(root.spin_angle);
    Transform::uniform(root.world_position, root.world_rotation, params.base_scale).to_matrix()
}

fn update_child(
    node: &mut FractalNode,
    parent: &FractalNode,
    spin_delta: f32,
    level_scale: f32,
    position_offset: f32,
) -> Mat4 {
    node.spin_angle += spin_delta;
    // parent, then slot orientation, then own spin
    node.world_rotation =
        parent.world_rotation * (node.local_rotation * Quat::from_rotation_y(node.spin_angle));
    node.world_position = parent.world_position
        + parent.world_rotation * (position_offset * level_scale * node.direction);
    Transform::uniform(node.world_position, node.world_rotation, level_scale).to_matrix()
}
