//! Builds the transient limits and springs consumed by one integration step.

use crate::core::{
    AngularConstraintType, AngularLimit, AngularLimitKind, BoneContainer, LimitAnchor,
    LinearLimit, LinearLimitKind, SphericalLimitType, Spring, Transform,
};
use crate::dynamics::chain::BodyChain;
use crate::node::AnimDynamicsSettings;
use crate::space::SpaceConverter;
use glam::Vec3;

/// Sphere limit resolved into simulation space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereTarget {
    pub centre: Vec3,
    pub radius: f32,
    pub limit_type: SphericalLimitType,
}

/// Bone-driven frames sampled once per evaluation, in simulation space.
#[derive(Debug, Clone, Default)]
pub struct LimitTargets {
    /// Bound bone of each body; `None` while the bone is invalid.
    pub bone_frames: Vec<Option<Transform>>,
    pub planes: Vec<Transform>,
    pub spheres: Vec<SphereTarget>,
}

impl LimitTargets {
    pub fn resolve(
        settings: &AnimDynamicsSettings,
        chain: &BodyChain,
        bones: &dyn BoneContainer,
        pose: &[Transform],
        converter: &SpaceConverter,
    ) -> Self {
        let driving = |index: Option<usize>| -> Transform {
            index
                .and_then(|bone| pose.get(bone).copied())
                .unwrap_or(Transform::IDENTITY)
        };

        let planes = if settings.use_planar_limits {
            settings
                .planar_limits
                .iter()
                .map(|limit| {
                    let bone = driving(limit.driving_bone.valid_index(bones));
                    converter.to_simulation(&bone.combine(&limit.plane_transform))
                })
                .collect()
        } else {
            Vec::new()
        };

        let spheres = if settings.use_spherical_limits {
            settings
                .spherical_limits
                .iter()
                .map(|limit| {
                    let bone = driving(limit.driving_bone.valid_index(bones));
                    SphereTarget {
                        centre: converter
                            .point_to_simulation(bone.transform_point(limit.sphere_local_offset)),
                        radius: limit.limit_radius,
                        limit_type: limit.limit_type,
                    }
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            bone_frames: chain.bone_frames(bones, pose, converter),
            planes,
            spheres,
        }
    }
}

/// Limits and springs for one step. Buffers are reused across steps.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    pub linear: Vec<LinearLimit>,
    pub angular: Vec<AngularLimit>,
    pub springs: Vec<Spring>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.linear.clear();
        self.angular.clear();
        self.springs.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.linear.is_empty() && self.angular.is_empty() && self.springs.is_empty()
    }

    /// Replaces the contents with constraints for every active body with a valid bone.
    pub fn rebuild(
        &mut self,
        settings: &AnimDynamicsSettings,
        chain: &BodyChain,
        targets: &LimitTargets,
    ) {
        self.clear();
        let setup = &settings.constraint_setup;

        for &index in &chain.active {
            let Some(bone_frame) = targets.bone_frames.get(index).copied().flatten() else {
                continue;
            };
            let anchor = match chain.bodies[index].parent {
                None => LimitAnchor::Fixed(bone_frame),
                Some(parent) => LimitAnchor::Body {
                    index: parent,
                    frame: chain.rest_frames[index],
                },
            };
            let child_anchor = -chain.joint_offsets[index];

            if setup.linear_fully_locked {
                self.linear.push(LinearLimit {
                    anchor,
                    child: index,
                    child_anchor,
                    kind: LinearLimitKind::Nailed {
                        offset: setup.linear_axes_min,
                    },
                });
            } else {
                for (axis, min, max) in setup.linear_axis_ranges() {
                    self.linear.push(LinearLimit {
                        anchor,
                        child: index,
                        child_anchor,
                        kind: LinearLimitKind::Axis { axis, min, max },
                    });
                }
            }

            let kind = match setup.angular_constraint_type {
                AngularConstraintType::Angular => AngularLimitKind::Range {
                    twist_axis: setup.twist_axis,
                    ranges: [
                        setup.angular_axis_range(0),
                        setup.angular_axis_range(1),
                        setup.angular_axis_range(2),
                    ],
                },
                AngularConstraintType::Cone => AngularLimitKind::Cone {
                    axis: setup.twist_axis.vector(),
                    angle: setup.cone_angle.max(0.0).to_radians(),
                },
            };
            self.angular.push(AngularLimit {
                anchor,
                child: index,
                kind,
            });

            let margin = chain.bodies[index].collision_radius;
            for plane in &targets.planes {
                self.linear.push(LinearLimit {
                    anchor: LimitAnchor::Fixed(*plane),
                    child: index,
                    child_anchor: Vec3::ZERO,
                    kind: LinearLimitKind::Plane { margin },
                });
            }
            for sphere in &targets.spheres {
                let kind = match sphere.limit_type {
                    SphericalLimitType::Inner => LinearLimitKind::SphereInner {
                        radius: sphere.radius,
                        margin,
                    },
                    SphericalLimitType::Outer => LinearLimitKind::SphereOuter {
                        radius: sphere.radius,
                        margin,
                    },
                };
                self.linear.push(LinearLimit {
                    anchor: LimitAnchor::Fixed(Transform::from_position(sphere.centre)),
                    child: index,
                    child_anchor: Vec3::ZERO,
                    kind,
                });
            }

            if settings.use_linear_spring || settings.use_angular_spring {
                self.springs.push(Spring {
                    anchor,
                    child: index,
                    child_anchor,
                    linear_constant: settings.linear_spring_constant,
                    angular_constant: settings.angular_spring_constant,
                    apply_linear: settings.use_linear_spring,
                    apply_angular: settings.use_angular_spring,
                    target_axis: setup.angular_target_axis,
                    angular_target: setup.angular_target,
                });
            }
        }
    }
}
