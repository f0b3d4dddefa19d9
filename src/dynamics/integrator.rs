use glam::{Quat, Vec3};

use crate::config::{DEFAULT_ANGULAR_DAMPING, DEFAULT_LINEAR_DAMPING, DEFAULT_WIND_DRAG};
use crate::core::AnimRigidBody;
use crate::utils::math::{angular_velocity_between, angular_velocity_to_quat};

/// Frame-wide forcing terms, already expressed in simulation space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepForces {
    /// World gravity rotated into simulation space, before per-body scaling.
    pub gravity: Vec3,
    /// Rotation from world space into simulation space, for per-body gravity overrides.
    pub world_to_simulation: Quat,
    pub external_force: Vec3,
    /// Acceleration induced by component motion; scaled by each body's mass.
    pub drag_acceleration: Vec3,
    /// Whether wind samples apply this frame.
    pub wind: bool,
}

impl Default for StepForces {
    fn default() -> Self {
        Self {
            gravity: Vec3::ZERO,
            world_to_simulation: Quat::IDENTITY,
            external_force: Vec3::ZERO,
            drag_acceleration: Vec3::ZERO,
            wind: false,
        }
    }
}

impl StepForces {
    pub fn body_gravity(&self, body: &AnimRigidBody) -> Vec3 {
        match body.gravity_override {
            Some(gravity) => self.world_to_simulation * gravity,
            None => self.gravity * body.gravity_scale,
        }
    }
}

/// Semi-implicit integration of momentum and the predicted pose.
#[derive(Debug, Clone, Copy, Default)]
pub struct Integrator;

impl Integrator {
    /// Accumulates forces and damping into the body's momentum.
    pub fn integrate_momentum(&self, body: &mut AnimRigidBody, forces: &StepForces, dt: f32) {
        let mut force = forces.body_gravity(body) * body.mass
            + forces.external_force
            + body.external_force
            + forces.drag_acceleration * body.mass;

        if forces.wind && body.wind_enabled {
            force += (body.wind.velocity() - body.linear_velocity()) * DEFAULT_WIND_DRAG * body.mass;
        }

        body.linear_momentum += force * dt + body.pending_impulse;
        body.pending_impulse = Vec3::ZERO;

        let linear_damping = body.linear_damping.unwrap_or(DEFAULT_LINEAR_DAMPING);
        let angular_damping = body.angular_damping.unwrap_or(DEFAULT_ANGULAR_DAMPING);
        body.linear_momentum *= (1.0 - linear_damping * dt).max(0.0);
        body.angular_momentum *= (1.0 - angular_damping * dt).max(0.0);
    }

    /// Writes the pose reached by coasting on the current momentum into `next_pose`.
    pub fn predict(&self, body: &mut AnimRigidBody, dt: f32) {
        let velocity = body.linear_velocity();
        let omega = body.angular_velocity();
        body.next_pose = body.pose;
        body.next_pose.position += velocity * dt;
        body.next_pose.rotation =
            (angular_velocity_to_quat(omega, dt) * body.pose.rotation).normalize();
    }

    /// Commits `next_pose`, deriving momentum from the distance travelled.
    pub fn apply_predicted(&self, body: &mut AnimRigidBody, dt: f32) {
        let next = body.next_pose;
        if dt > 0.0 {
            let velocity = (next.position - body.pose.position) / dt;
            let omega = angular_velocity_between(body.pose.rotation, next.rotation, dt);
            body.linear_momentum = velocity * body.mass;
            body.angular_momentum = body.world_inertia(next.rotation) * omega;
        }
        body.previous_pose = body.pose;
        body.pose = next;
    }
}
