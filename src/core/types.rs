use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position, orientation, and non-uniform scale of a bone or body.
///
/// Composition follows parent-first order: `parent.combine(&local)` expresses
/// `local` in the parent's space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// Applies another transform on top of this one, returning the composition.
    pub fn combine(&self, other: &Transform) -> Transform {
        Transform {
            position: self.position + self.rotation * (self.scale * other.position),
            rotation: (self.rotation * other.rotation).normalize(),
            scale: self.scale * other.scale,
        }
    }

    /// Inverse transform. Exact for uniform scale.
    pub fn inverse(&self) -> Transform {
        let inv_scale = self.scale.recip();
        let inv_rotation = self.rotation.inverse();
        Transform {
            position: -(inv_scale * (inv_rotation * self.position)),
            rotation: inv_rotation,
            scale: inv_scale,
        }
    }

    /// This transform expressed relative to `base`.
    pub fn relative_to(&self, base: &Transform) -> Transform {
        base.inverse().combine(self)
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * (self.scale * point)
    }

    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        (self.rotation.inverse() * (point - self.position)) / self.scale
    }

    pub fn inverse_transform_vector(&self, vector: Vec3) -> Vec3 {
        (self.rotation.inverse() * vector) / self.scale
    }

    /// Rotates `vector` without applying scale.
    pub fn rotate_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation * vector
    }

    pub fn axis_z(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Blends two transforms; rotation uses shortest-path slerp.
    pub fn lerp(&self, other: &Transform, alpha: f32) -> Transform {
        Transform {
            position: self.position.lerp(other.position, alpha),
            rotation: self.rotation.slerp(other.rotation, alpha).normalize(),
            scale: self.scale.lerp(other.scale, alpha),
        }
    }
}

/// Helper methods for inertia calculations.
pub trait InertiaTensorExt {
    fn for_solid_box(half_extents: Vec3, mass: f32) -> Mat3;
}

impl InertiaTensorExt for Mat3 {
    fn for_solid_box(half_extents: Vec3, mass: f32) -> Mat3 {
        let lx = half_extents.x * 2.0;
        let ly = half_extents.y * 2.0;
        let lz = half_extents.z * 2.0;
        let factor = mass / 12.0;
        Mat3::from_diagonal(Vec3::new(
            factor * (ly * ly + lz * lz),
            factor * (lx * lx + lz * lz),
            factor * (lx * lx + ly * ly),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn inverse_undoes_combine() {
        let parent = Transform {
            position: Vec3::new(1.0, -2.0, 3.0),
            rotation: Quat::from_rotation_y(0.7) * Quat::from_rotation_x(-0.3),
            scale: Vec3::splat(2.0),
        };
        let local = Transform::from_position_rotation(Vec3::new(0.5, 0.25, -1.0), Quat::from_rotation_z(1.1));

        let back = parent.combine(&local).relative_to(&parent);
        assert_relative_eq!(back.position.x, local.position.x, epsilon = 1e-4);
        assert_relative_eq!(back.position.y, local.position.y, epsilon = 1e-4);
        assert_relative_eq!(back.position.z, local.position.z, epsilon = 1e-4);
        assert!(back.rotation.dot(local.rotation).abs() > 0.9999);
    }

    #[test]
    fn box_inertia_is_symmetric_for_cube() {
        let inertia = Mat3::for_solid_box(Vec3::splat(0.5), 6.0);
        assert_relative_eq!(inertia.x_axis.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(inertia.y_axis.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(inertia.z_axis.z, 1.0, epsilon = 1e-5);
    }
}
