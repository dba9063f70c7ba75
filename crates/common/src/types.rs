use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Spatial transform: position, rotation, scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Transform with the same scale on every axis.
    pub fn uniform(position: Vec3, rotation: Quat, scale: f32) -> Self {
        Self {
            position,
            rotation,
            scale: Vec3::splat(scale),
        }
    }

    /// Column-major TRS matrix, the layout uploaded to instance buffers.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// Axis-aligned bounding volume handed to the renderer with each draw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub center: Vec3,
    /// Full edge lengths, not half extents.
    pub size: Vec3,
}

impl Bounds {
    /// Cube of edge `size` centred on `center`.
    pub fn cube(center: Vec3, size: f32) -> Self {
        Self {
            center,
            size: Vec3::splat(size),
        }
    }

    pub fn half_extents(&self) -> Vec3 {
        self.size * 0.5
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.half_extents()
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.half_extents()
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min()).all() && point.cmple(self.max()).all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Quat::IDENTITY);
        assert_eq!(t.scale, Vec3::ONE);
        assert_eq!(t.to_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn uniform_transform_matrix_has_scale_and_translation() {
        let t = Transform::uniform(Vec3::new(1.0, 2.0, 3.0), Quat::IDENTITY, 0.5);
        let m = t.to_matrix();
        assert_eq!(m.w_axis.truncate(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(m.x_axis.x, 0.5);
        assert_eq!(m.y_axis.y, 0.5);
        assert_eq!(m.z_axis.z, 0.5);
    }

    #[test]
    fn bounds_cube_contains_its_corners() {
        let b = Bounds::cube(Vec3::new(1.0, 0.0, 0.0), 3.0);
        assert_eq!(b.half_extents(), Vec3::splat(1.5));
        assert!(b.contains(Vec3::new(2.5, 1.5, -1.5)));
        assert!(!b.contains(Vec3::new(2.6, 0.0, 0.0)));
    }
}
