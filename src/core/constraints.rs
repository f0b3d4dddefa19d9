use super::bones::BoneReference;
use super::types::Transform;
use crate::error::DynamicsError;
use crate::utils::{swing_twist, twist_angle, EasingType};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Whether a linear axis is left free or limited to a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LinearLimitType {
    Free,
    #[default]
    Limited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AngularConstraintType {
    /// Independent twist/swing ranges per axis.
    #[default]
    Angular,
    /// Single cone around the twist axis.
    Cone,
}

/// One of the three local axes of a bone or body frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TwistAxis {
    #[default]
    AxisX,
    AxisY,
    AxisZ,
}

impl TwistAxis {
    pub fn vector(self) -> Vec3 {
        match self {
            TwistAxis::AxisX => Vec3::X,
            TwistAxis::AxisY => Vec3::Y,
            TwistAxis::AxisZ => Vec3::Z,
        }
    }

    pub fn index(self) -> usize {
        match self {
            TwistAxis::AxisX => 0,
            TwistAxis::AxisY => 1,
            TwistAxis::AxisZ => 2,
        }
    }
}

const AXIS_NAMES: [char; 3] = ['x', 'y', 'z'];

/// Authored joint limits between a body and its parent.
///
/// Linear ranges are in simulation units; angular ranges and the cone angle are
/// in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintSetup {
    pub linear_x_limit_type: LinearLimitType,
    pub linear_y_limit_type: LinearLimitType,
    pub linear_z_limit_type: LinearLimitType,
    pub linear_axes_min: Vec3,
    pub linear_axes_max: Vec3,
    /// Set by [`ConstraintSetup::update_locked_state`] when every axis is limited
    /// to a zero-width range.
    pub linear_fully_locked: bool,
    pub angular_constraint_type: AngularConstraintType,
    pub twist_axis: TwistAxis,
    pub cone_angle: f32,
    pub angular_limits_min: Vec3,
    pub angular_limits_max: Vec3,
    /// Body axis the angular spring tries to align with `angular_target`.
    pub angular_target_axis: TwistAxis,
    /// Spring target direction in the joint frame; zero keeps the rest alignment.
    pub angular_target: Vec3,
    pub rotation_retargeting: RotationRetargeting,
}

impl Default for ConstraintSetup {
    fn default() -> Self {
        Self {
            linear_x_limit_type: LinearLimitType::Limited,
            linear_y_limit_type: LinearLimitType::Limited,
            linear_z_limit_type: LinearLimitType::Limited,
            linear_axes_min: Vec3::ZERO,
            linear_axes_max: Vec3::ZERO,
            linear_fully_locked: true,
            angular_constraint_type: AngularConstraintType::Angular,
            twist_axis: TwistAxis::AxisX,
            cone_angle: 45.0,
            angular_limits_min: Vec3::splat(-45.0),
            angular_limits_max: Vec3::splat(45.0),
            angular_target_axis: TwistAxis::AxisX,
            angular_target: Vec3::ZERO,
            rotation_retargeting: RotationRetargeting::default(),
        }
    }
}

impl ConstraintSetup {
    pub fn linear_limit_types(&self) -> [LinearLimitType; 3] {
        [
            self.linear_x_limit_type,
            self.linear_y_limit_type,
            self.linear_z_limit_type,
        ]
    }

    /// Recomputes `linear_fully_locked` from the per-axis settings.
    pub fn update_locked_state(&mut self) {
        let all_limited = self
            .linear_limit_types()
            .iter()
            .all(|ty| *ty == LinearLimitType::Limited);
        self.linear_fully_locked = all_limited && self.linear_axes_min == self.linear_axes_max;
    }

    /// Limited linear axes as `(local axis, min, max)`.
    pub fn linear_axis_ranges(&self) -> impl Iterator<Item = (Vec3, f32, f32)> + '_ {
        let axes = [Vec3::X, Vec3::Y, Vec3::Z];
        self.linear_limit_types()
            .into_iter()
            .enumerate()
            .filter(|(_, ty)| *ty == LinearLimitType::Limited)
            .map(move |(k, _)| {
                let min = self.linear_axes_min[k];
                let max = self.linear_axes_max[k];
                (axes[k], min.min(max), min.max(max))
            })
    }

    /// Angular range of axis `k` in radians, or `None` when the authored range is
    /// inverted and the axis is treated as free.
    pub fn angular_axis_range(&self, k: usize) -> Option<(f32, f32)> {
        let min = self.angular_limits_min[k];
        let max = self.angular_limits_max[k];
        (min <= max).then(|| (min.to_radians(), max.to_radians()))
    }

    pub fn validate(&self) -> Vec<DynamicsError> {
        if self.angular_constraint_type != AngularConstraintType::Angular {
            return Vec::new();
        }
        (0..3)
            .filter(|&k| self.angular_limits_min[k] > self.angular_limits_max[k])
            .map(|k| DynamicsError::InvalidAngularRange {
                axis: AXIS_NAMES[k],
                min: self.angular_limits_min[k],
                max: self.angular_limits_max[k],
            })
            .collect()
    }
}

/// Remaps the simulated twist about one bone axis onto another axis of the
/// written-back bone, through an eased angle range. Angles are in degrees.
///
/// Only the output pose is affected; the simulated bodies keep their own
/// orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationRetargeting {
    pub enabled: bool,
    pub source_axis: TwistAxis,
    pub target_axis: TwistAxis,
    pub source_min: f32,
    pub source_max: f32,
    pub target_min: f32,
    pub target_max: f32,
    pub easing: EasingType,
}

impl Default for RotationRetargeting {
    fn default() -> Self {
        Self {
            enabled: false,
            source_axis: TwistAxis::AxisX,
            target_axis: TwistAxis::AxisX,
            source_min: -45.0,
            source_max: 45.0,
            target_min: -45.0,
            target_max: 45.0,
            easing: EasingType::Linear,
        }
    }
}

impl RotationRetargeting {
    /// Target-axis angle for a source twist angle, both in degrees.
    pub fn map_angle(&self, source: f32) -> f32 {
        let span = self.source_max - self.source_min;
        let alpha = if span.abs() <= f32::EPSILON {
            if source >= self.source_max {
                1.0
            } else {
                0.0
            }
        } else {
            (source - self.source_min) / span
        };
        self.easing.ease(self.target_min, self.target_max, alpha)
    }

    /// Output rotation of a bone whose animated rotation is `animated` and whose
    /// simulated rotation is `simulated`.
    pub fn retarget(&self, animated: Quat, simulated: Quat) -> Quat {
        if !self.enabled {
            return simulated;
        }
        let source = self.source_axis.vector();
        let relative = (animated.inverse() * simulated).normalize();
        let (swing, twist) = swing_twist(relative, source);
        let angle = self.map_angle(twist_angle(twist, source).to_degrees());
        let remapped = Quat::from_axis_angle(self.target_axis.vector(), angle.to_radians());
        (animated * swing * remapped).normalize()
    }
}

/// Plane that bodies must stay on the positive side of. The plane normal is the
/// local Z axis of `plane_transform`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanarLimit {
    pub driving_bone: BoneReference,
    pub plane_transform: Transform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SphericalLimitType {
    /// Keep bodies inside the sphere.
    #[default]
    Inner,
    /// Keep bodies outside the sphere.
    Outer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SphericalLimit {
    pub driving_bone: BoneReference,
    pub sphere_local_offset: Vec3,
    pub limit_radius: f32,
    pub limit_type: SphericalLimitType,
}

impl Default for SphericalLimit {
    fn default() -> Self {
        Self {
            driving_bone: BoneReference::default(),
            sphere_local_offset: Vec3::ZERO,
            limit_radius: 1.0,
            limit_type: SphericalLimitType::Inner,
        }
    }
}

/// Frame a transient constraint is expressed against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LimitAnchor {
    /// Kinematic frame in simulation space (bone driven or static).
    Fixed(Transform),
    /// Frame attached to another body, given in that body's local space.
    Body { index: usize, frame: Transform },
}

impl LimitAnchor {
    pub fn body_index(&self) -> Option<usize> {
        match self {
            LimitAnchor::Fixed(_) => None,
            LimitAnchor::Body { index, .. } => Some(*index),
        }
    }

    /// Simulation-space frame given the pose of the anchoring body.
    pub fn resolve(&self, body_pose: Option<&Transform>) -> Transform {
        match (self, body_pose) {
            (LimitAnchor::Fixed(frame), _) => *frame,
            (LimitAnchor::Body { frame, .. }, Some(pose)) => pose.combine(frame),
            (LimitAnchor::Body { frame, .. }, None) => *frame,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinearLimitKind {
    /// Child anchor pinned to `offset` in the anchor frame.
    Nailed { offset: Vec3 },
    /// Child anchor kept within `[min, max]` along a local axis of the anchor frame.
    Axis { axis: Vec3, min: f32, max: f32 },
    /// Child anchor kept `margin` above the anchor frame's XY plane.
    Plane { margin: f32 },
    /// Child anchor kept within `radius - margin` of the anchor frame origin.
    SphereInner { radius: f32, margin: f32 },
    /// Child anchor kept beyond `radius + margin` of the anchor frame origin.
    SphereOuter { radius: f32, margin: f32 },
}

/// Per-step linear constraint. Never cached across frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearLimit {
    pub anchor: LimitAnchor,
    pub child: usize,
    /// Constrained point on the child, in the child's local space.
    pub child_anchor: Vec3,
    pub kind: LinearLimitKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AngularLimitKind {
    /// Per-axis ranges in radians; `None` leaves the axis free.
    Range {
        twist_axis: TwistAxis,
        ranges: [Option<(f32, f32)>; 3],
    },
    /// Child `axis` must stay within `angle` radians of the anchor frame's `axis`.
    Cone { axis: Vec3, angle: f32 },
}

/// Per-step angular constraint on the child's orientation relative to the anchor frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngularLimit {
    pub anchor: LimitAnchor,
    pub child: usize,
    pub kind: AngularLimitKind,
}

/// Per-step soft constraint pulling the child towards its anchor frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spring {
    pub anchor: LimitAnchor,
    pub child: usize,
    pub child_anchor: Vec3,
    pub linear_constant: f32,
    pub angular_constant: f32,
    pub apply_linear: bool,
    pub apply_angular: bool,
    pub target_axis: TwistAxis,
    pub angular_target: Vec3,
}

impl Spring {
    /// Direction the child's target axis is pulled towards, in simulation space.
    pub fn target_direction(&self, anchor_frame: &Transform) -> Vec3 {
        let local = if self.angular_target.length_squared() > f32::EPSILON {
            self.angular_target.normalize()
        } else {
            self.target_axis.vector()
        };
        anchor_frame.rotation * local
    }

    pub fn current_direction(&self, child_rotation: Quat) -> Vec3 {
        child_rotation * self.target_axis.vector()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_setup_is_fully_locked() {
        let mut setup = ConstraintSetup::default();
        setup.update_locked_state();
        assert!(setup.linear_fully_locked);

        setup.linear_axes_max.y = 0.5;
        setup.update_locked_state();
        assert!(!setup.linear_fully_locked);

        setup.linear_axes_max.y = 0.0;
        setup.linear_z_limit_type = LinearLimitType::Free;
        setup.update_locked_state();
        assert!(!setup.linear_fully_locked);
        assert_eq!(setup.linear_axis_ranges().count(), 2);
    }

    #[test]
    fn inverted_angular_range_is_free_and_reported() {
        let setup = ConstraintSetup {
            angular_limits_min: Vec3::new(-10.0, 30.0, -5.0),
            angular_limits_max: Vec3::new(10.0, 20.0, 5.0),
            ..ConstraintSetup::default()
        };
        assert!(setup.angular_axis_range(0).is_some());
        assert!(setup.angular_axis_range(1).is_none());

        let warnings = setup.validate();
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            warnings[0],
            DynamicsError::InvalidAngularRange { axis: 'y', .. }
        ));
    }

    #[test]
    fn retargeting_moves_twist_onto_the_target_axis() {
        let retargeting = RotationRetargeting {
            enabled: true,
            source_axis: TwistAxis::AxisX,
            target_axis: TwistAxis::AxisY,
            source_min: -60.0,
            source_max: 60.0,
            target_min: 0.0,
            target_max: 90.0,
            easing: EasingType::Linear,
        };
        let simulated = Quat::from_rotation_x(30f32.to_radians());
        let out = retargeting.retarget(Quat::IDENTITY, simulated);
        let expected = Quat::from_rotation_y(67.5f32.to_radians());
        assert!(out.dot(expected).abs() > 0.9999, "got {out:?}");
    }

    #[test]
    fn retargeting_keeps_swing_and_is_relative_to_the_animated_pose() {
        let retargeting = RotationRetargeting {
            enabled: true,
            target_min: 10.0,
            target_max: 10.0,
            ..RotationRetargeting::default()
        };
        let animated = Quat::from_rotation_z(0.7);
        let swing = Quat::from_rotation_y(0.3);
        let simulated = animated * swing * Quat::from_rotation_x(0.5);
        let out = retargeting.retarget(animated, simulated);
        let expected = animated * swing * Quat::from_rotation_x(10f32.to_radians());
        assert!(out.dot(expected).abs() > 0.9999, "got {out:?}");

        let disabled = RotationRetargeting::default();
        assert_eq!(disabled.retarget(animated, simulated), simulated);
    }

    #[test]
    fn retarget_angle_is_eased_and_clamped() {
        let retargeting = RotationRetargeting {
            source_min: 0.0,
            source_max: 90.0,
            target_min: 0.0,
            target_max: 40.0,
            easing: EasingType::SinusoidalIn,
            ..RotationRetargeting::default()
        };
        assert!(retargeting.map_angle(45.0) < 20.0);
        assert_eq!(retargeting.map_angle(-30.0), 0.0);
        assert!((retargeting.map_angle(200.0) - 40.0).abs() < 1e-4);
    }

    #[test]
    fn body_anchor_follows_body_pose() {
        let anchor = LimitAnchor::Body {
            index: 0,
            frame: Transform::from_position(Vec3::X),
        };
        let pose = Transform::from_position(Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(anchor.resolve(Some(&pose)).position, Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(anchor.body_index(), Some(0));
    }
}
