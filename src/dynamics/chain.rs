//! Construction and bookkeeping of the simulated body chain.

use crate::config::WIND_ADAPTION_RANGE;
use crate::core::{AnimRigidBody, BoneContainer, BoneReference, Transform, WindData};
use crate::error::{DynamicsError, Result};
use crate::node::AnimDynamicsSettings;
use crate::space::SpaceConverter;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::Rng;

const NEARLY_ZERO_OFFSET_SQ: f32 = 1e-8;

/// Bodies ordered root to end, with their bone bindings and joint offsets.
///
/// All per-body vectors are parallel and have the same length.
#[derive(Debug, Clone, Default)]
pub struct BodyChain {
    pub bodies: Vec<AnimRigidBody>,
    pub bones: Vec<BoneReference>,
    /// Body centre relative to its bound bone, in the bone's local frame.
    pub joint_offsets: Vec<Vec3>,
    /// Rest pose of each bound bone relative to the previous body. Identity for the root.
    pub rest_frames: Vec<Transform>,
    /// Indices of bodies whose bound bone is valid at the current LOD.
    pub active: Vec<usize>,
    active_mask: Vec<bool>,
}

impl BodyChain {
    /// Builds the chain from the bound bone down to the optional chain end.
    pub fn build(
        settings: &AnimDynamicsSettings,
        bones: &dyn BoneContainer,
        pose: &[Transform],
        converter: &SpaceConverter,
        rng: &mut StdRng,
    ) -> Result<BodyChain> {
        let bone_indices = chain_bone_indices(settings, bones)?;

        let mut chain = BodyChain::default();
        for (i, &bone_index) in bone_indices.iter().enumerate() {
            let bone_sim = converter.to_simulation(&component_pose(pose, bone_index));

            let joint_offset = match chain.previous_anchor() {
                None => settings.local_joint_offset,
                Some(anchor) => {
                    derive_joint_offset(settings.local_joint_offset, anchor, &bone_sim)
                }
            };

            let mut body = AnimRigidBody::new(
                settings.box_extents,
                settings.collision_type,
                settings.sphere_collision_radius,
            );
            body.linear_damping = settings.linear_damping_override;
            body.angular_damping = settings.angular_damping_override;
            body.gravity_scale = settings.gravity_scale;
            body.gravity_override = settings.gravity_override;
            body.wind_enabled = settings.enable_wind;
            body.wind = WindData {
                adaption: rng.gen_range(0.0..WIND_ADAPTION_RANGE),
                body_scale: settings.wind_scale,
                ..WindData::default()
            };
            body.parent = i.checked_sub(1);
            body.reset_to(body_pose_from_bone(&bone_sim, joint_offset));

            let rest_frame = match chain.bodies.last() {
                Some(parent) => bone_sim.relative_to(&parent.pose),
                None => Transform::IDENTITY,
            };

            let mut reference =
                BoneReference::new(bones.bone_name(bone_index).unwrap_or_default());
            reference.resolve(bones);

            chain.bodies.push(body);
            chain.bones.push(reference);
            chain.joint_offsets.push(joint_offset);
            chain.rest_frames.push(Transform {
                scale: Vec3::ONE,
                ..rest_frame
            });
        }

        chain.active_mask = vec![false; chain.bodies.len()];
        chain.refresh_active(bones);

        log::debug!(
            "built anim dynamics chain of {} bodies from '{}'",
            chain.len(),
            settings.bound_bone.name
        );
        Ok(chain)
    }

    /// Joint anchor of the last body built: the point its child attaches to.
    fn previous_anchor(&self) -> Option<Vec3> {
        let body = self.bodies.last()?;
        let offset = self.joint_offsets.last()?;
        Some(body.pose.transform_point(-*offset))
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn is_active(&self, body: usize) -> bool {
        self.active_mask.get(body).copied().unwrap_or(false)
    }

    pub fn active_mask(&self) -> &[bool] {
        &self.active_mask
    }

    /// Mutable bodies alongside the active mask, for the solver.
    pub fn bodies_and_mask(&mut self) -> (&mut [AnimRigidBody], &[bool]) {
        (&mut self.bodies, &self.active_mask)
    }

    /// Re-resolves every binding. Returns `false` when a bound bone no longer
    /// exists in the skeleton.
    pub fn resolve_bones(&mut self, bones: &dyn BoneContainer) -> bool {
        self.bones
            .iter_mut()
            .fold(true, |all, reference| reference.resolve(bones) && all)
    }

    /// Recomputes the active set and returns bodies that just became active.
    pub fn refresh_active(&mut self, bones: &dyn BoneContainer) -> Vec<usize> {
        let mut newly_active = Vec::new();
        self.active.clear();
        for (i, reference) in self.bones.iter().enumerate() {
            let valid = reference.is_valid_to_evaluate(bones);
            if valid {
                if !self.active_mask[i] {
                    newly_active.push(i);
                }
                self.active.push(i);
            }
            self.active_mask[i] = valid;
        }
        newly_active
    }

    /// Simulation-space transform of each body's bound bone; `None` while invalid.
    pub fn bone_frames(
        &self,
        bones: &dyn BoneContainer,
        pose: &[Transform],
        converter: &SpaceConverter,
    ) -> Vec<Option<Transform>> {
        self.bones
            .iter()
            .map(|reference| {
                reference
                    .valid_index(bones)
                    .map(|index| converter.to_simulation(&component_pose(pose, index)))
            })
            .collect()
    }

    /// Snaps body `index` to its bound bone and clears its motion.
    pub fn reset_body(&mut self, index: usize, bone_sim: &Transform) {
        let pose = body_pose_from_bone(bone_sim, self.joint_offsets[index]);
        self.bodies[index].reset_to(pose);
    }

    /// Pose of the bone bound to body `index`, derived from the body's pose.
    pub fn bone_pose(&self, index: usize) -> Transform {
        bone_pose_from_body(&self.bodies[index].pose, self.joint_offsets[index])
    }
}

/// Skeleton indices of the chain bones, root first.
fn chain_bone_indices(
    settings: &AnimDynamicsSettings,
    bones: &dyn BoneContainer,
) -> Result<Vec<usize>> {
    let bound = bones
        .find_bone(&settings.bound_bone.name)
        .ok_or_else(|| DynamicsError::BoneNotFound(settings.bound_bone.name.clone()))?;

    if !settings.chain_end.is_set() {
        return Ok(vec![bound]);
    }

    let end = bones
        .find_bone(&settings.chain_end.name)
        .ok_or_else(|| DynamicsError::BoneNotFound(settings.chain_end.name.clone()))?;

    let mut indices = vec![end];
    let mut current = end;
    while current != bound {
        current = bones
            .parent_index(current)
            .ok_or_else(|| DynamicsError::ChainEndNotReachable {
                bound_bone: settings.bound_bone.name.clone(),
                chain_end: settings.chain_end.name.clone(),
            })?;
        indices.push(current);
    }
    indices.reverse();
    Ok(indices)
}

fn derive_joint_offset(authored: Vec3, previous_anchor: Vec3, bone: &Transform) -> Vec3 {
    let to_previous = previous_anchor - bone.position;
    if authored.length_squared() < NEARLY_ZERO_OFFSET_SQ {
        bone.inverse_transform_vector(to_previous * 0.5)
    } else {
        authored.normalize() * (0.5 * to_previous.length())
    }
}

fn component_pose(pose: &[Transform], bone: usize) -> Transform {
    pose.get(bone).copied().unwrap_or(Transform::IDENTITY)
}

/// Body pose for a bone pose and joint offset.
pub fn body_pose_from_bone(bone: &Transform, joint_offset: Vec3) -> Transform {
    Transform::from_position_rotation(
        bone.position + bone.rotation * joint_offset,
        bone.rotation,
    )
}

/// Inverse of [`body_pose_from_bone`].
pub fn bone_pose_from_body(body: &Transform, joint_offset: Vec3) -> Transform {
    Transform::from_position_rotation(body.position - body.rotation * joint_offset, body.rotation)
}
