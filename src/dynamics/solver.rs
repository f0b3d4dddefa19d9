use glam::{Quat, Vec3};

use crate::config::{DEFAULT_POST_UPDATE_ITERATIONS, DEFAULT_PRE_UPDATE_ITERATIONS};
use crate::core::{
    AngularLimit, AngularLimitKind, AnimRigidBody, LimitAnchor, LinearLimit, LinearLimitKind,
    Spring, Transform, TwistAxis,
};
use crate::dynamics::constraint_builder::ConstraintSet;
use crate::dynamics::integrator::{Integrator, StepForces};
use crate::utils::math::{angular_velocity_to_quat, rotation_vector, swing_twist, twist_angle};

const LINEAR_TOLERANCE: f32 = 1e-6;
const ANGULAR_TOLERANCE: f32 = 1e-6;

/// Which pose a projection pass corrects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoseSlot {
    Current,
    Predicted,
}

impl PoseSlot {
    fn get(self, body: &AnimRigidBody) -> &Transform {
        match self {
            PoseSlot::Current => &body.pose,
            PoseSlot::Predicted => &body.next_pose,
        }
    }

    fn get_mut(self, body: &mut AnimRigidBody) -> &mut Transform {
        match self {
            PoseSlot::Current => &mut body.pose,
            PoseSlot::Predicted => &mut body.next_pose,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Projection {
    /// Both bodies move; corrections rotate as well as translate.
    Coupled,
    /// Only the child translates onto the limit.
    Settle,
}

/// Position-based limit solver with pre- and post-integration projection passes.
#[derive(Debug, Clone)]
pub struct LimitSolver {
    pub pre_iterations: u32,
    pub post_iterations: u32,
    integrator: Integrator,
}

impl Default for LimitSolver {
    fn default() -> Self {
        Self::new(DEFAULT_PRE_UPDATE_ITERATIONS, DEFAULT_POST_UPDATE_ITERATIONS)
    }
}

impl LimitSolver {
    pub fn new(pre_iterations: u32, post_iterations: u32) -> Self {
        Self {
            pre_iterations,
            post_iterations,
            integrator: Integrator,
        }
    }

    /// Advances the active bodies by `dt` under `forces` and the given constraints.
    pub fn step(
        &self,
        bodies: &mut [AnimRigidBody],
        active: &[bool],
        constraints: &ConstraintSet,
        forces: &StepForces,
        dt: f32,
    ) {
        if dt <= 0.0 {
            return;
        }

        for (index, body) in bodies.iter_mut().enumerate() {
            if is_active(active, index) {
                self.integrator.integrate_momentum(body, forces, dt);
            }
        }

        apply_springs(bodies, active, &constraints.springs, dt);

        for (index, body) in bodies.iter_mut().enumerate() {
            if is_active(active, index) {
                self.integrator.predict(body, dt);
            } else {
                body.next_pose = body.pose;
            }
        }

        self.project(bodies, active, constraints, PoseSlot::Predicted, self.pre_iterations);

        for (index, body) in bodies.iter_mut().enumerate() {
            if is_active(active, index) {
                self.integrator.apply_predicted(body, dt);
            }
        }

        self.project(bodies, active, constraints, PoseSlot::Current, self.post_iterations);
    }

    fn project(
        &self,
        bodies: &mut [AnimRigidBody],
        active: &[bool],
        constraints: &ConstraintSet,
        slot: PoseSlot,
        iterations: u32,
    ) {
        if iterations == 0 {
            return;
        }
        for _ in 0..iterations {
            for limit in &constraints.linear {
                solve_linear(bodies, active, limit, slot, Projection::Coupled);
            }
            for limit in &constraints.angular {
                solve_angular(bodies, active, limit, slot);
            }
        }
        for limit in &constraints.linear {
            solve_linear(bodies, active, limit, slot, Projection::Settle);
        }
    }
}

fn is_active(active: &[bool], index: usize) -> bool {
    active.get(index).copied().unwrap_or(false)
}

/// Index of the dynamic body on the anchor side of a constraint, if any.
fn anchor_body(anchor_index: Option<usize>, child: usize, active: &[bool]) -> Option<usize> {
    anchor_index.filter(|&index| index != child && is_active(active, index))
}

fn get_pair_mut(
    bodies: &mut [AnimRigidBody],
    a: usize,
    b: usize,
) -> Option<(&mut AnimRigidBody, &mut AnimRigidBody)> {
    if a == b || a >= bodies.len() || b >= bodies.len() {
        return None;
    }
    if a < b {
        let (left, right) = bodies.split_at_mut(b);
        Some((&mut left[a], &mut right[0]))
    } else {
        let (left, right) = bodies.split_at_mut(a);
        Some((&mut right[0], &mut left[b]))
    }
}

fn anchor_frame(bodies: &[AnimRigidBody], anchor: &LimitAnchor, slot: PoseSlot) -> Transform {
    let pose = anchor
        .body_index()
        .and_then(|index| bodies.get(index))
        .map(|body| slot.get(body));
    anchor.resolve(pose)
}

/// Point the child anchor must be moved to, or `None` when the limit is satisfied.
fn linear_target(kind: &LinearLimitKind, frame: &Transform, point: Vec3) -> Option<Vec3> {
    match *kind {
        LinearLimitKind::Nailed { offset } => Some(frame.transform_point(offset)),
        LinearLimitKind::Axis { axis, min, max } => {
            let axis = frame.rotate_vector(axis);
            let distance = (point - frame.position).dot(axis);
            let clamped = distance.clamp(min, max);
            (clamped != distance).then(|| point + axis * (clamped - distance))
        }
        LinearLimitKind::Plane { margin } => {
            let normal = frame.axis_z();
            let height = (point - frame.position).dot(normal);
            (height < margin).then(|| point + normal * (margin - height))
        }
        LinearLimitKind::SphereInner { radius, margin } => {
            let limit = (radius - margin).max(0.0);
            let offset = point - frame.position;
            let distance = offset.length();
            (distance > limit).then(|| frame.position + offset * (limit / distance))
        }
        LinearLimitKind::SphereOuter { radius, margin } => {
            let limit = radius + margin;
            let offset = point - frame.position;
            let distance = offset.length();
            (distance < limit).then(|| {
                let direction = offset.try_normalize().unwrap_or_else(|| frame.axis_z());
                frame.position + direction * limit
            })
        }
    }
}

fn generalized_inverse_mass(body: &AnimRigidBody, pose: &Transform, arm: Vec3, normal: Vec3) -> f32 {
    let torque_arm = arm.cross(normal);
    body.inverse_mass + torque_arm.dot(body.world_inverse_inertia(pose.rotation) * torque_arm)
}

/// Moves `body` by a positional impulse applied at `arm` from its centre.
fn apply_positional(body: &mut AnimRigidBody, slot: PoseSlot, arm: Vec3, impulse: Vec3) {
    let inverse_inertia = body.world_inverse_inertia(slot.get(body).rotation);
    let inverse_mass = body.inverse_mass;
    let pose = slot.get_mut(body);
    pose.position += impulse * inverse_mass;
    let rotation = inverse_inertia * arm.cross(impulse);
    pose.rotation = (angular_velocity_to_quat(rotation, 1.0) * pose.rotation).normalize();
}

fn solve_linear(
    bodies: &mut [AnimRigidBody],
    active: &[bool],
    limit: &LinearLimit,
    slot: PoseSlot,
    projection: Projection,
) {
    let child_index = limit.child;
    if !is_active(active, child_index) || child_index >= bodies.len() {
        return;
    }

    let frame = anchor_frame(bodies, &limit.anchor, slot);
    let child_pose = *slot.get(&bodies[child_index]);
    let point = child_pose.transform_point(limit.child_anchor);
    let Some(target) = linear_target(&limit.kind, &frame, point) else {
        return;
    };
    let error = target - point;
    let distance = error.length();
    if distance < LINEAR_TOLERANCE {
        return;
    }

    if projection == Projection::Settle {
        slot.get_mut(&mut bodies[child_index]).position += error;
        return;
    }

    let normal = error / distance;
    let child_arm = point - child_pose.position;
    let parent_index = anchor_body(limit.anchor.body_index(), child_index, active);

    match parent_index.and_then(|parent| get_pair_mut(bodies, child_index, parent)) {
        Some((child, parent)) => {
            let parent_pose = *slot.get(parent);
            let parent_arm = target - parent_pose.position;
            let w_child = generalized_inverse_mass(child, &child_pose, child_arm, normal);
            let w_parent = generalized_inverse_mass(parent, &parent_pose, parent_arm, normal);
            let total = w_child + w_parent;
            if total <= f32::EPSILON {
                return;
            }
            let lambda = distance / total;
            apply_positional(child, slot, child_arm, normal * lambda);
            apply_positional(parent, slot, parent_arm, -normal * lambda);
        }
        None => {
            let child = &mut bodies[child_index];
            let w_child = generalized_inverse_mass(child, &child_pose, child_arm, normal);
            if w_child <= f32::EPSILON {
                return;
            }
            apply_positional(child, slot, child_arm, normal * (distance / w_child));
        }
    }
}

/// Relative rotation clamped to per-axis twist and swing ranges.
pub fn clamp_range(
    relative: Quat,
    twist_axis: TwistAxis,
    ranges: &[Option<(f32, f32)>; 3],
) -> Quat {
    let axis = twist_axis.vector();
    let twist_index = twist_axis.index();
    let (swing, twist) = swing_twist(relative, axis);

    let mut twist_angle = twist_angle(twist, axis);
    if let Some((min, max)) = ranges[twist_index] {
        twist_angle = twist_angle.clamp(min, max);
    }

    let mut swing_vector = rotation_vector(swing);
    swing_vector[twist_index] = 0.0;
    for (k, range) in ranges.iter().enumerate() {
        if k == twist_index {
            continue;
        }
        if let Some((min, max)) = range {
            swing_vector[k] = swing_vector[k].clamp(*min, *max);
        }
    }

    (Quat::from_scaled_axis(swing_vector) * Quat::from_axis_angle(axis, twist_angle)).normalize()
}

/// Relative rotation with `axis` pulled back inside a cone of half-angle `angle`.
pub fn clamp_cone(relative: Quat, axis: Vec3, angle: f32) -> Quat {
    let rotated = relative * axis;
    let current = rotated.angle_between(axis);
    if !current.is_finite() || current <= angle {
        return relative;
    }
    let pivot = rotated
        .cross(axis)
        .try_normalize()
        .unwrap_or_else(|| axis.any_orthonormal_vector());
    (Quat::from_axis_angle(pivot, current - angle) * relative).normalize()
}

fn solve_angular(bodies: &mut [AnimRigidBody], active: &[bool], limit: &AngularLimit, slot: PoseSlot) {
    let child_index = limit.child;
    if !is_active(active, child_index) || child_index >= bodies.len() {
        return;
    }

    let frame = anchor_frame(bodies, &limit.anchor, slot);
    let child_rotation = slot.get(&bodies[child_index]).rotation;
    let relative = frame.rotation.inverse() * child_rotation;
    let target = match &limit.kind {
        AngularLimitKind::Range { twist_axis, ranges } => clamp_range(relative, *twist_axis, ranges),
        AngularLimitKind::Cone { axis, angle } => clamp_cone(relative, *axis, *angle),
    };

    let correction =
        (frame.rotation * (target * relative.inverse()) * frame.rotation.inverse()).normalize();
    let rotation = rotation_vector(correction);
    let angle = rotation.length();
    if angle < ANGULAR_TOLERANCE {
        return;
    }
    let axis = rotation / angle;

    let weight = |body: &AnimRigidBody| {
        let rotation = slot.get(body).rotation;
        axis.dot(body.world_inverse_inertia(rotation) * axis)
    };

    let parent_index = anchor_body(limit.anchor.body_index(), child_index, active);
    match parent_index.and_then(|parent| get_pair_mut(bodies, child_index, parent)) {
        Some((child, parent)) => {
            let w_child = weight(child);
            let w_parent = weight(parent);
            let total = w_child + w_parent;
            if total <= f32::EPSILON {
                return;
            }
            rotate_pose(slot.get_mut(child), axis, angle * w_child / total);
            rotate_pose(slot.get_mut(parent), axis, -angle * w_parent / total);
        }
        None => rotate_pose(slot.get_mut(&mut bodies[child_index]), axis, angle),
    }
}

fn rotate_pose(pose: &mut Transform, axis: Vec3, angle: f32) {
    pose.rotation = (Quat::from_axis_angle(axis, angle) * pose.rotation).normalize();
}

fn apply_springs(bodies: &mut [AnimRigidBody], active: &[bool], springs: &[Spring], dt: f32) {
    for spring in springs {
        let child_index = spring.child;
        if !is_active(active, child_index) || child_index >= bodies.len() {
            continue;
        }

        let frame = anchor_frame(bodies, &spring.anchor, PoseSlot::Current);
        let child_pose = bodies[child_index].pose;

        let linear = if spring.apply_linear {
            let point = child_pose.transform_point(spring.child_anchor);
            (frame.position - point) * spring.linear_constant * dt
        } else {
            Vec3::ZERO
        };
        let angular = if spring.apply_angular {
            let current = spring.current_direction(child_pose.rotation);
            current.cross(spring.target_direction(&frame)) * spring.angular_constant * dt
        } else {
            Vec3::ZERO
        };

        let parent_index = anchor_body(spring.anchor.body_index(), child_index, active);
        match parent_index.and_then(|parent| get_pair_mut(bodies, child_index, parent)) {
            Some((child, parent)) => {
                child.linear_momentum += linear;
                child.angular_momentum += angular;
                parent.linear_momentum -= linear;
                parent.angular_momentum -= angular;
            }
            None => {
                let child = &mut bodies[child_index];
                child.linear_momentum += linear;
                child.angular_momentum += angular;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CollisionType;
    use approx::assert_relative_eq;

    fn hanging_body(bone: Transform, joint_offset: Vec3) -> AnimRigidBody {
        let mut body = AnimRigidBody::new(Vec3::new(0.1, 0.1, 0.5), CollisionType::CenterOfMass, 0.0);
        body.reset_to(Transform::from_position_rotation(
            bone.position + bone.rotation * joint_offset,
            bone.rotation,
        ));
        body
    }

    #[test]
    fn locked_body_stays_on_its_joint() {
        let bone = Transform::from_position_rotation(Vec3::new(0.0, 0.0, 1.0), Quat::from_rotation_x(0.3));
        let joint_offset = Vec3::new(0.0, 0.0, -0.25);
        let mut bodies = vec![hanging_body(bone, joint_offset)];
        bodies[0].set_velocity(Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 5.0, 0.0));

        let mut constraints = ConstraintSet::new();
        constraints.linear.push(LinearLimit {
            anchor: LimitAnchor::Fixed(bone),
            child: 0,
            child_anchor: -joint_offset,
            kind: LinearLimitKind::Nailed { offset: Vec3::ZERO },
        });
        constraints.angular.push(AngularLimit {
            anchor: LimitAnchor::Fixed(bone),
            child: 0,
            kind: AngularLimitKind::Range {
                twist_axis: TwistAxis::AxisX,
                ranges: [Some((0.0, 0.0)); 3],
            },
        });

        let forces = StepForces {
            gravity: Vec3::new(0.0, 0.0, -9.81),
            ..StepForces::default()
        };
        let solver = LimitSolver::default();
        for _ in 0..30 {
            solver.step(&mut bodies, &[true], &constraints, &forces, 1.0 / 60.0);
        }

        let expected = bone.position + bone.rotation * joint_offset;
        assert!((bodies[0].position() - expected).length() < 1e-3);
        assert!(bodies[0].orientation().dot(bone.rotation).abs() > 0.9999);
    }

    #[test]
    fn inactive_bodies_do_not_move() {
        let mut bodies = vec![hanging_body(Transform::IDENTITY, Vec3::ZERO)];
        let forces = StepForces {
            gravity: Vec3::new(0.0, 0.0, -9.81),
            ..StepForces::default()
        };
        LimitSolver::default().step(&mut bodies, &[false], &ConstraintSet::new(), &forces, 0.1);
        assert_eq!(bodies[0].position(), Vec3::ZERO);
    }

    #[test]
    fn cone_clamps_to_its_angle() {
        let relative = Quat::from_rotation_y(1.0);
        let clamped = clamp_cone(relative, Vec3::X, 0.5);
        assert_relative_eq!((clamped * Vec3::X).angle_between(Vec3::X), 0.5, epsilon = 1e-4);
        assert_eq!(clamp_cone(Quat::from_rotation_y(0.2), Vec3::X, 0.5), Quat::from_rotation_y(0.2));
    }

    #[test]
    fn spinning_body_stays_inside_its_cone() {
        let bone = Transform::from_position(Vec3::new(0.0, 0.0, 1.0));
        let mut bodies = vec![hanging_body(bone, Vec3::ZERO)];
        bodies[0].set_velocity(Vec3::ZERO, Vec3::new(0.0, 6.0, 2.0));

        let cone = 0.3;
        let mut constraints = ConstraintSet::new();
        constraints.angular.push(AngularLimit {
            anchor: LimitAnchor::Fixed(bone),
            child: 0,
            kind: AngularLimitKind::Cone {
                axis: Vec3::X,
                angle: cone,
            },
        });

        let solver = LimitSolver::default();
        for _ in 0..60 {
            solver.step(&mut bodies, &[true], &constraints, &StepForces::default(), 1.0 / 60.0);
            let axis = bodies[0].orientation() * Vec3::X;
            assert!(axis.angle_between(Vec3::X) <= cone + 1e-3);
        }
    }

    #[test]
    fn free_axes_survive_range_clamp() {
        let relative = Quat::from_rotation_x(0.8);
        let ranges = [None, Some((-0.1, 0.1)), Some((-0.1, 0.1))];
        let clamped = clamp_range(relative, TwistAxis::AxisX, &ranges);
        assert!(clamped.dot(relative).abs() > 0.9999);

        let limited = clamp_range(relative, TwistAxis::AxisX, &[Some((-0.2, 0.2)); 3]);
        assert!(limited.dot(Quat::from_rotation_x(0.2)).abs() > 0.9999);
    }

    #[test]
    fn plane_pushes_point_above_margin() {
        let frame = Transform::IDENTITY;
        let target = linear_target(&LinearLimitKind::Plane { margin: 0.1 }, &frame, Vec3::new(1.0, 0.0, -0.5))
            .expect("point below plane");
        assert_relative_eq!(target.x, 1.0);
        assert_relative_eq!(target.z, 0.1, epsilon = 1e-6);
        assert!(linear_target(&LinearLimitKind::Plane { margin: 0.1 }, &frame, Vec3::Z).is_none());
    }
}
