use super::types::{InertiaTensorExt, Transform};
use crate::config::DEFAULT_BODY_MASS;
use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// How a body's collision sphere radius is derived for planar and spherical limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollisionType {
    /// Limits act on the centre of mass only.
    #[default]
    CenterOfMass,
    /// Uses the authored sphere radius.
    CustomSphere,
    /// Sphere inscribed in the box: half the smallest extent.
    InnerSphere,
    /// Sphere enclosing the box: half the largest extent.
    OuterSphere,
}

impl CollisionType {
    pub fn radius(self, box_extents: Vec3, custom_radius: f32) -> f32 {
        match self {
            CollisionType::CenterOfMass => 0.0,
            CollisionType::CustomSphere => custom_radius.max(0.0),
            CollisionType::InnerSphere => 0.5 * box_extents.min_element(),
            CollisionType::OuterSphere => 0.5 * box_extents.max_element(),
        }
    }
}

/// Cached wind sample for a single body, in simulation space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindData {
    pub direction: Vec3,
    pub speed: f32,
    /// Per-body random multiplier so neighbouring bodies do not move in lockstep.
    pub adaption: f32,
    pub body_scale: f32,
}

impl Default for WindData {
    fn default() -> Self {
        Self {
            direction: Vec3::ZERO,
            speed: 0.0,
            adaption: 1.0,
            body_scale: 1.0,
        }
    }
}

impl WindData {
    /// Velocity of the air around the body.
    pub fn velocity(&self) -> Vec3 {
        self.direction * (self.speed * self.adaption * self.body_scale)
    }
}

/// Rigid body driven by an animated bone through a joint offset.
#[derive(Debug, Clone)]
pub struct AnimRigidBody {
    pub pose: Transform,
    pub previous_pose: Transform,
    /// Predicted pose for the step currently being solved.
    pub next_pose: Transform,
    pub linear_momentum: Vec3,
    pub angular_momentum: Vec3,
    pub mass: f32,
    pub inverse_mass: f32,
    pub local_inertia: Mat3,
    pub inverse_local_inertia: Mat3,
    pub box_extents: Vec3,
    pub collision_type: CollisionType,
    pub collision_radius: f32,
    pub linear_damping: Option<f32>,
    pub angular_damping: Option<f32>,
    pub gravity_scale: f32,
    /// World-space gravity replacing the scaled world gravity when set.
    pub gravity_override: Option<Vec3>,
    pub wind_enabled: bool,
    pub wind: WindData,
    /// Force accumulated for the current frame, in simulation space.
    pub external_force: Vec3,
    /// Impulse applied once at the start of the next step, in simulation space.
    pub pending_impulse: Vec3,
    pub parent: Option<usize>,
}

impl AnimRigidBody {
    pub fn new(box_extents: Vec3, collision_type: CollisionType, custom_radius: f32) -> Self {
        let mut body = Self {
            pose: Transform::IDENTITY,
            previous_pose: Transform::IDENTITY,
            next_pose: Transform::IDENTITY,
            linear_momentum: Vec3::ZERO,
            angular_momentum: Vec3::ZERO,
            mass: DEFAULT_BODY_MASS,
            inverse_mass: 1.0 / DEFAULT_BODY_MASS,
            local_inertia: Mat3::IDENTITY,
            inverse_local_inertia: Mat3::IDENTITY,
            box_extents,
            collision_type,
            collision_radius: collision_type.radius(box_extents, custom_radius),
            linear_damping: None,
            angular_damping: None,
            gravity_scale: 1.0,
            gravity_override: None,
            wind_enabled: false,
            wind: WindData::default(),
            external_force: Vec3::ZERO,
            pending_impulse: Vec3::ZERO,
            parent: None,
        };
        body.recompute_inertia();
        body
    }

    fn recompute_inertia(&mut self) {
        let inertia = Mat3::for_solid_box(self.box_extents * 0.5, self.mass);
        let diagonal = Vec3::new(inertia.x_axis.x, inertia.y_axis.y, inertia.z_axis.z);
        if diagonal.min_element() <= 1e-9 {
            // Degenerate box: fall back to a unit-sized solid.
            self.local_inertia = Mat3::IDENTITY * self.mass;
            self.inverse_local_inertia = Mat3::IDENTITY * self.inverse_mass;
        } else {
            self.local_inertia = inertia;
            self.inverse_local_inertia = inertia.inverse();
        }
    }

    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    pub fn orientation(&self) -> Quat {
        self.pose.rotation
    }

    pub fn linear_velocity(&self) -> Vec3 {
        self.linear_momentum * self.inverse_mass
    }

    /// Inverse inertia tensor rotated into simulation space for `orientation`.
    pub fn world_inverse_inertia(&self, orientation: Quat) -> Mat3 {
        let rotation = Mat3::from_quat(orientation);
        rotation * self.inverse_local_inertia * rotation.transpose()
    }

    pub fn world_inertia(&self, orientation: Quat) -> Mat3 {
        let rotation = Mat3::from_quat(orientation);
        rotation * self.local_inertia * rotation.transpose()
    }

    pub fn angular_velocity(&self) -> Vec3 {
        self.world_inverse_inertia(self.pose.rotation) * self.angular_momentum
    }

    /// Sets momentum from linear and angular velocity at the current pose.
    pub fn set_velocity(&mut self, linear: Vec3, angular: Vec3) {
        self.linear_momentum = linear * self.mass;
        self.angular_momentum = self.world_inertia(self.pose.rotation) * angular;
    }

    pub fn apply_force(&mut self, force: Vec3) {
        self.external_force += force;
    }

    pub fn apply_impulse(&mut self, impulse: Vec3) {
        self.pending_impulse += impulse;
    }

    /// Snaps the body to `pose` and clears all motion.
    pub fn reset_to(&mut self, pose: Transform) {
        let pose = Transform {
            scale: Vec3::ONE,
            ..pose
        };
        self.pose = pose;
        self.previous_pose = pose;
        self.next_pose = pose;
        self.linear_momentum = Vec3::ZERO;
        self.angular_momentum = Vec3::ZERO;
        self.external_force = Vec3::ZERO;
        self.pending_impulse = Vec3::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collision_radius_follows_type() {
        let extents = Vec3::new(2.0, 4.0, 6.0);
        assert_eq!(CollisionType::CenterOfMass.radius(extents, 5.0), 0.0);
        assert_eq!(CollisionType::CustomSphere.radius(extents, 5.0), 5.0);
        assert_eq!(CollisionType::InnerSphere.radius(extents, 5.0), 1.0);
        assert_eq!(CollisionType::OuterSphere.radius(extents, 5.0), 3.0);
    }

    #[test]
    fn velocity_round_trips_through_momentum() {
        let mut body = AnimRigidBody::new(Vec3::new(0.2, 0.4, 0.6), CollisionType::CenterOfMass, 0.0);
        body.pose.rotation = Quat::from_rotation_z(0.4);
        body.set_velocity(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.5, -0.5, 0.25));

        assert!((body.linear_velocity() - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-4);
        assert!((body.angular_velocity() - Vec3::new(0.5, -0.5, 0.25)).length() < 1e-3);
    }

    #[test]
    fn reset_clears_motion() {
        let mut body = AnimRigidBody::new(Vec3::ONE, CollisionType::CenterOfMass, 0.0);
        body.set_velocity(Vec3::X, Vec3::Y);
        body.apply_impulse(Vec3::Z);
        body.reset_to(Transform::from_position(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(body.linear_momentum, Vec3::ZERO);
        assert_eq!(body.angular_momentum, Vec3::ZERO);
        assert_eq!(body.pending_impulse, Vec3::ZERO);
        assert_eq!(body.previous_pose, body.pose);
    }
}
