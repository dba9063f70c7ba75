use fractalspace_common::FractalSettings;

use crate::FractalError;
use crate::hierarchy::{FractalTree, Palette, build};
use crate::updater::{StepParams, TransformUpdater, UpdaterConfig};

/// A fractal and everything needed to advance it: settings, palette, worker pool.
///
/// The tree only exists between a successful build and the next teardown.
/// Any parameter change that affects structure tears the tree down and
/// builds a new one from scratch.
#[derive(Debug)]
pub struct Fractal {
    settings: FractalSettings,
    palette: Palette,
    updater: TransformUpdater,
    min_batch_len: usize,
    tree: Option<FractalTree>,
    frame: u64,
}

impl Fractal {
    /// Validate settings and start the worker pool. The tree is not built yet.
    pub fn new(settings: FractalSettings, palette: Palette) -> Result<Self, FractalError> {
        Self::with_batch_len(settings, palette, UpdaterConfig::default().min_batch_len)
    }

    /// Like [`Fractal::new`] with an explicit per-worker batch size.
    pub fn with_batch_len(
        settings: FractalSettings,
        palette: Palette,
        min_batch_len: usize,
    ) -> Result<Self, FractalError> {
        settings.validate()?;
        let updater = TransformUpdater::new(UpdaterConfig {
            worker_threads: settings.worker_threads,
            min_batch_len,
        })?;
        Ok(Self {
            settings,
            palette,
            updater,
            min_batch_len,
            tree: None,
            frame: 0,
        })
    }

    pub fn settings(&self) -> &FractalSettings {
        &self.settings
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn worker_count(&self) -> usize {
        self.updater.worker_count()
    }

    pub fn is_built(&self) -> bool {
        self.tree.is_some()
    }

    pub fn tree(&self) -> Option<&FractalTree> {
        self.tree.as_ref()
    }

    /// Frames ticked since the last build.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Build the tree from the current settings, replacing any existing one.
    pub fn build(&mut self) -> Result<(), FractalError> {
        self.teardown();
        let tree = build(
            self.settings.depth,
            self.settings.child_count,
            &self.palette.directions,
            &self.palette.rotations,
        )?;
        tracing::debug!(
            depth = tree.level_count(),
            nodes = tree.node_count(),
            "fractal built"
        );
        self.tree = Some(tree);
        self.frame = 0;
        Ok(())
    }

    /// Tear down and rebuild with a new depth.
    pub fn rebuild(&mut self, new_depth: u32) -> Result<(), FractalError> {
        let settings = FractalSettings {
            depth: new_depth,
            ..self.settings.clone()
        };
        self.apply_settings(settings)
    }

    /// Replace every setting, then tear down and rebuild.
    ///
    /// On failure the tree stays torn down and the previous settings and
    /// worker pool are kept.
    pub fn apply_settings(&mut self, settings: FractalSettings) -> Result<(), FractalError> {
        let (previous, previous_updater) = self.swap_settings(settings)?;
        if let Err(err) = self.build() {
            self.settings = previous;
            if let Some(updater) = previous_updater {
                self.updater = updater;
            }
            return Err(err);
        }
        Ok(())
    }

    /// Tear down and replace every setting without building.
    ///
    /// On failure nothing but the teardown has happened.
    pub fn configure(&mut self, settings: FractalSettings) -> Result<(), FractalError> {
        self.swap_settings(settings).map(|_| ())
    }

    /// Returns the replaced settings, and the replaced pool if the worker
    /// count changed.
    fn swap_settings(
        &mut self,
        settings: FractalSettings,
    ) -> Result<(FractalSettings, Option<TransformUpdater>), FractalError> {
        self.teardown();
        settings.validate()?;
        let previous_updater = if settings.worker_threads != self.settings.worker_threads {
            let updater = TransformUpdater::new(UpdaterConfig {
                worker_threads: settings.worker_threads,
                min_batch_len: self.min_batch_len,
            })?;
            Some(std::mem::replace(&mut self.updater, updater))
        } else {
            None
        };
        let previous = std::mem::replace(&mut self.settings, settings);
        Ok((previous, previous_updater))
    }

    /// Change the spin speed. Takes effect on the next tick without a rebuild.
    pub fn set_speed_rotation(&mut self, degrees_per_second: f32) {
        self.settings.speed_rotation = degrees_per_second;
    }

    /// Advance the fractal by `delta_time` seconds.
    ///
    /// Negative or non-finite frame times are rejected before any node moves.
    pub fn tick(&mut self, delta_time: f32) -> Result<(), FractalError> {
        if !delta_time.is_finite() || delta_time < 0.0 {
            return Err(FractalError::InvalidTimeStep { delta_time });
        }
        let tree = self.tree.as_mut().ok_or(FractalError::NotBuilt)?;
        let params = StepParams::from_settings(&self.settings, delta_time);
        self.updater.step(tree, &params);
        self.frame += 1;
        Ok(())
    }

    /// Drop the tree. Calling this again is a no-op.
    pub fn teardown(&mut self) {
        if let Some(tree) = self.tree.take() {
            tracing::debug!(nodes = tree.node_count(), frames = self.frame, "fractal torn down");
            self.frame = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fractalspace_common::ConfigError;
    use glam::Vec3;

    fn fractal(depth: u32) -> Fractal {
        let settings = FractalSettings {
            depth,
            worker_threads: 2,
            ..FractalSettings::default()
        };
        Fractal::new(settings, Palette::standard()).unwrap()
    }

    #[test]
    fn new_fractal_is_not_built() {
        let f = fractal(3);
        assert!(!f.is_built());
        assert_eq!(f.worker_count(), 2);
    }

    #[test]
    fn tick_before_build_fails() {
        let mut f = fractal(3);
        assert!(matches!(f.tick(1.0 / 60.0), Err(FractalError::NotBuilt)));
    }

    #[test]
    fn one_tick_scenario() {
        let mut f = fractal(3);
        f.build().unwrap();
        f.tick(1.0 / 60.0).unwrap();

        let tree = f.tree().unwrap();
        let root = tree.root();
        assert!((root.spin_angle.to_degrees() - 80.0 / 60.0).abs() < 1e-4);

        let s = f.settings();
        let child = tree.level(1)[0];
        let offset = child.world_position - root.world_position;
        let expected = root.world_rotation * (s.position_offset * s.base_scale * 0.5 * child.direction);
        assert!((offset - expected).length() < 1e-6);
        assert!((offset.length() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn thousand_ticks_stay_finite() {
        let mut f = fractal(4);
        f.build().unwrap();
        let dt = 1.0 / 60.0;
        for _ in 0..1000 {
            f.tick(dt).unwrap();
        }
        assert_eq!(f.frame(), 1000);

        let delta = f.settings().frame_spin_delta(dt);
        let tree = f.tree().unwrap();
        for level in 0..tree.level_count() {
            for node in tree.level(level) {
                assert!(node.world_position.is_finite());
                assert!(node.world_rotation.is_finite());
                assert!((node.spin_angle - 1000.0 * delta).abs() < 1e-2);
            }
            for m in tree.level_matrices(level) {
                assert!(m.is_finite());
            }
        }
    }

    #[test]
    fn spin_grows_monotonically() {
        let mut f = fractal(2);
        f.build().unwrap();
        let mut last = 0.0;
        for _ in 0..100 {
            f.tick(1.0 / 30.0).unwrap();
            let spin = f.tree().unwrap().root().spin_angle;
            assert!(spin > last);
            last = spin;
        }
    }

    #[test]
    fn teardown_is_idempotent() {
        let mut f = fractal(3);
        f.build().unwrap();
        f.teardown();
        assert!(!f.is_built());
        f.teardown();
        assert!(!f.is_built());
        assert!(matches!(f.tick(0.1), Err(FractalError::NotBuilt)));
    }

    #[test]
    fn rebuild_matches_fresh_build() {
        let mut f = fractal(2);
        f.build().unwrap();
        for _ in 0..10 {
            f.tick(0.05).unwrap();
        }
        f.rebuild(4).unwrap();
        assert_eq!(f.settings().depth, 4);
        assert_eq!(f.frame(), 0);

        let fresh = Palette::standard().build(4).unwrap();
        assert_eq!(f.tree().unwrap(), &fresh);
    }

    #[test]
    fn failed_rebuild_leaves_fractal_empty() {
        let mut f = fractal(3);
        f.build().unwrap();
        let err = f.rebuild(0).unwrap_err();
        assert!(matches!(
            err,
            FractalError::InvalidConfiguration(ConfigError::ZeroDepth)
        ));
        assert!(!f.is_built());
        assert_eq!(f.settings().depth, 3);
        assert!(matches!(f.tick(0.1), Err(FractalError::NotBuilt)));

        f.build().unwrap();
        assert_eq!(f.tree().unwrap().level_count(), 3);
    }

    #[test]
    fn palette_mismatch_fails_build() {
        let settings = FractalSettings {
            child_count: 3,
            ..FractalSettings::default()
        };
        let mut f = Fractal::new(settings, Palette::standard()).unwrap();
        assert!(matches!(
            f.build(),
            Err(FractalError::InvalidConfiguration(
                ConfigError::PaletteMismatch { .. }
            ))
        ));
        assert!(!f.is_built());
    }

    #[test]
    fn invalid_settings_rejected_up_front() {
        let settings = FractalSettings {
            depth: 0,
            ..FractalSettings::default()
        };
        assert!(Fractal::new(settings, Palette::standard()).is_err());
    }

    #[test]
    fn speed_change_applies_without_rebuild() {
        let mut f = fractal(2);
        f.build().unwrap();
        f.set_speed_rotation(0.0);
        f.tick(1.0).unwrap();
        assert_eq!(f.tree().unwrap().root().spin_angle, 0.0);

        f.set_speed_rotation(90.0);
        f.tick(1.0).unwrap();
        let spin = f.tree().unwrap().root().spin_angle;
        assert!((spin - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert_eq!(f.frame(), 2);
    }

    #[test]
    fn apply_settings_switches_worker_pool() {
        let mut f = fractal(2);
        let settings = FractalSettings {
            worker_threads: 3,
            ..f.settings().clone()
        };
        f.apply_settings(settings).unwrap();
        assert_eq!(f.worker_count(), 3);
        assert!(f.is_built());
    }

    #[test]
    fn failed_apply_keeps_previous_worker_pool() {
        let mut f = fractal(2);
        let mismatched = FractalSettings {
            child_count: 3,
            worker_threads: 4,
            ..f.settings().clone()
        };
        assert!(f.apply_settings(mismatched).is_err());
        assert_eq!(f.settings().worker_threads, 2);
        assert_eq!(f.worker_count(), 2);

        let wider = FractalSettings {
            worker_threads: 4,
            ..f.settings().clone()
        };
        f.apply_settings(wider).unwrap();
        assert_eq!(f.worker_count(), 4);

        let back = FractalSettings {
            worker_threads: 2,
            ..f.settings().clone()
        };
        f.apply_settings(back).unwrap();
        assert_eq!(f.worker_count(), f.settings().worker_threads);
    }

    #[test]
    fn configure_replaces_settings_without_building() {
        let mut f = fractal(2);
        f.build().unwrap();
        let deeper = FractalSettings {
            depth: 4,
            worker_threads: 3,
            ..f.settings().clone()
        };
        f.configure(deeper).unwrap();
        assert!(!f.is_built());
        assert_eq!(f.settings().depth, 4);
        assert_eq!(f.worker_count(), 3);

        f.build().unwrap();
        assert_eq!(f.tree().unwrap().level_count(), 4);
    }

    #[test]
    fn bad_frame_time_is_rejected() {
        let mut f = fractal(2);
        f.build().unwrap();
        f.tick(0.1).unwrap();
        let hash = f.tree().unwrap().state_hash();

        for dt in [-0.1, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                f.tick(dt),
                Err(FractalError::InvalidTimeStep { .. })
            ));
        }
        assert_eq!(f.frame(), 1);
        assert_eq!(f.tree().unwrap().state_hash(), hash);

        f.tick(0.0).unwrap();
        assert_eq!(f.frame(), 2);
    }

    #[test]
    fn root_stays_at_origin() {
        let mut f = fractal(3);
        f.build().unwrap();
        for _ in 0..50 {
            f.tick(0.02).unwrap();
        }
        assert_eq!(f.tree().unwrap().root().world_position, Vec3::ZERO);
    }
}
