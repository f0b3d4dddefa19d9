//! Additional math helpers layered on top of `glam`.

use glam::{Quat, Vec3};

/// Converts angular velocity vector (radians/sec) into a quaternion delta.
pub fn angular_velocity_to_quat(angular: Vec3, dt: f32) -> Quat {
    let angle = angular.length() * dt;
    if angle.abs() < 1e-6 {
        return Quat::IDENTITY;
    }
    let axis = angular.normalize();
    Quat::from_axis_angle(axis, angle)
}

/// Rotation vector (axis × angle) of the shortest rotation represented by `q`.
pub fn rotation_vector(q: Quat) -> Vec3 {
    let q = if q.w < 0.0 { -q } else { q };
    q.to_scaled_axis()
}

/// Angular velocity that rotates `from` into `to` over `dt`.
pub fn angular_velocity_between(from: Quat, to: Quat, dt: f32) -> Vec3 {
    if dt <= 0.0 {
        return Vec3::ZERO;
    }
    rotation_vector(to * from.inverse()) / dt
}

/// Splits `q` into `swing * twist`, where `twist` rotates about `axis`.
pub fn swing_twist(q: Quat, axis: Vec3) -> (Quat, Quat) {
    let imaginary = Vec3::new(q.x, q.y, q.z);
    let projected = axis * imaginary.dot(axis);
    let twist = Quat::from_xyzw(projected.x, projected.y, projected.z, q.w);
    if twist.length_squared() < 1e-12 {
        // Swing of exactly 180 degrees: twist is undefined.
        return (q, Quat::IDENTITY);
    }
    let twist = twist.normalize();
    let swing = q * twist.inverse();
    (swing, twist)
}

/// Signed angle of a twist quaternion about `axis`, in `[-PI, PI]`.
pub fn twist_angle(twist: Quat, axis: Vec3) -> f32 {
    let twist = if twist.w < 0.0 { -twist } else { twist };
    let sin_half = Vec3::new(twist.x, twist.y, twist.z).dot(axis);
    2.0 * sin_half.atan2(twist.w)
}

/// Component-wise clamp of `v` to `[-limit, limit]`.
pub fn clamp_symmetric(v: Vec3, limit: Vec3) -> Vec3 {
    let limit = limit.abs();
    v.clamp(-limit, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swing_twist_recomposes() {
        let q = Quat::from_rotation_y(0.4) * Quat::from_rotation_x(0.9);
        let (swing, twist) = swing_twist(q, Vec3::X);
        assert!((swing * twist).dot(q).abs() > 0.9999);
        assert!((twist_angle(twist, Vec3::X) - 0.9).abs() < 1e-4);
    }

    #[test]
    fn angular_velocity_matches_rotation() {
        let from = Quat::from_rotation_z(0.2);
        let to = Quat::from_rotation_z(0.5);
        let omega = angular_velocity_between(from, to, 0.1);
        assert!((omega - Vec3::new(0.0, 0.0, 3.0)).length() < 1e-3);
    }

    #[test]
    fn clamp_symmetric_uses_magnitude() {
        let clamped = clamp_symmetric(Vec3::new(5.0, -5.0, 0.5), Vec3::new(1.0, -2.0, 1.0));
        assert_eq!(clamped, Vec3::new(1.0, -2.0, 0.5));
    }
}
