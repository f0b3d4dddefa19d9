//! Simulation spaces and conversions between them and component space.

use crate::core::{AnimRigidBody, Transform};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Frame of reference the bodies are simulated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SimulationSpace {
    /// Relative to the skeletal mesh component.
    #[default]
    Component,
    /// Relative to the owning actor.
    Actor,
    World,
    /// Relative to the skeleton root bone.
    RootRelative,
    /// Relative to a configured bone; identity while that bone is invalid.
    BoneRelative,
}

/// Transforms a space conversion depends on, captured once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpaceBasis {
    pub component_to_world: Transform,
    pub actor_to_world: Transform,
    /// Component-space transform of the skeleton root bone.
    pub root_bone: Transform,
    /// Component-space transform of the relative-space bone, when valid.
    pub relative_bone: Option<Transform>,
}

impl Default for SpaceBasis {
    fn default() -> Self {
        Self {
            component_to_world: Transform::IDENTITY,
            actor_to_world: Transform::IDENTITY,
            root_bone: Transform::IDENTITY,
            relative_bone: None,
        }
    }
}

impl SpaceBasis {
    /// Frame of `space` expressed in component space, so that
    /// `component = frame ∘ simulation`.
    pub fn space_frame(&self, space: SimulationSpace) -> Transform {
        match space {
            SimulationSpace::Component => Transform::IDENTITY,
            SimulationSpace::World => self.component_to_world.inverse(),
            SimulationSpace::Actor => self
                .component_to_world
                .inverse()
                .combine(&self.actor_to_world),
            SimulationSpace::RootRelative => self.root_bone,
            SimulationSpace::BoneRelative => self.relative_bone.unwrap_or(Transform::IDENTITY),
        }
    }
}

/// Converts poses, points and vectors between a simulation space and component space.
///
/// Converted poses are rigid: the result always carries unit scale.
#[derive(Debug, Clone, Copy)]
pub struct SpaceConverter {
    pub space: SimulationSpace,
    pub basis: SpaceBasis,
    frame: Transform,
    frame_inverse: Transform,
}

impl SpaceConverter {
    pub fn new(space: SimulationSpace, basis: SpaceBasis) -> Self {
        let frame = basis.space_frame(space);
        Self {
            space,
            basis,
            frame,
            frame_inverse: frame.inverse(),
        }
    }

    pub fn frame(&self) -> &Transform {
        &self.frame
    }

    pub fn to_simulation(&self, component: &Transform) -> Transform {
        rigid(self.frame_inverse.combine(component))
    }

    pub fn to_component(&self, simulation: &Transform) -> Transform {
        rigid(self.frame.combine(simulation))
    }

    pub fn point_to_simulation(&self, point: Vec3) -> Vec3 {
        self.frame.inverse_transform_point(point)
    }

    pub fn point_to_component(&self, point: Vec3) -> Vec3 {
        self.frame.transform_point(point)
    }

    /// Rotation taking world-space directions into simulation space.
    pub fn world_to_simulation_rotation(&self) -> Quat {
        (self.frame.rotation.inverse() * self.basis.component_to_world.rotation.inverse())
            .normalize()
    }

    pub fn world_vector_to_simulation(&self, vector: Vec3) -> Vec3 {
        self.world_to_simulation_rotation() * vector
    }

    pub fn world_point_to_simulation(&self, point: Vec3) -> Vec3 {
        let component = self.basis.component_to_world.inverse_transform_point(point);
        self.point_to_simulation(component)
    }

    pub fn simulation_point_to_world(&self, point: Vec3) -> Vec3 {
        self.basis
            .component_to_world
            .transform_point(self.point_to_component(point))
    }
}

fn rigid(transform: Transform) -> Transform {
    Transform {
        scale: Vec3::ONE,
        ..transform
    }
}

/// Re-expresses every body from the `from` space into the `to` space, rotating
/// momentum so motion carries over.
pub fn convert_bodies(bodies: &mut [AnimRigidBody], from: &SpaceConverter, to: &SpaceConverter) {
    let delta = (to.frame.rotation.inverse() * from.frame.rotation).normalize();
    for body in bodies.iter_mut() {
        body.pose = to.to_simulation(&from.to_component(&body.pose));
        body.previous_pose = to.to_simulation(&from.to_component(&body.previous_pose));
        body.next_pose = body.pose;
        body.linear_momentum = delta * body.linear_momentum;
        body.angular_momentum = delta * body.angular_momentum;
    }
    log::debug!(
        "converted {} bodies from {:?} to {:?} space",
        bodies.len(),
        from.space,
        to.space
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CollisionType;
    use approx::assert_relative_eq;

    fn basis() -> SpaceBasis {
        SpaceBasis {
            component_to_world: Transform::from_position_rotation(
                Vec3::new(10.0, 0.0, 1.0),
                Quat::from_rotation_z(0.5),
            ),
            actor_to_world: Transform::from_position(Vec3::new(10.0, 0.0, 0.0)),
            root_bone: Transform::from_position(Vec3::new(0.0, 0.0, 0.3)),
            relative_bone: None,
        }
    }

    #[test]
    fn world_frame_maps_component_origin_to_world() {
        let converter = SpaceConverter::new(SimulationSpace::World, basis());
        let sim = converter.to_simulation(&Transform::IDENTITY);
        assert_relative_eq!(sim.position.x, 10.0, epsilon = 1e-5);
        assert_relative_eq!(sim.position.z, 1.0, epsilon = 1e-5);
        assert_relative_eq!(
            converter.simulation_point_to_world(Vec3::new(1.0, 2.0, 3.0)).x,
            1.0,
            epsilon = 1e-5
        );
    }

    #[test]
    fn invalid_relative_bone_uses_identity() {
        let converter = SpaceConverter::new(SimulationSpace::BoneRelative, basis());
        assert_eq!(*converter.frame(), Transform::IDENTITY);
    }

    #[test]
    fn world_vectors_ignore_translation() {
        let converter = SpaceConverter::new(SimulationSpace::Component, basis());
        let down = converter.world_vector_to_simulation(Vec3::NEG_Z);
        assert_relative_eq!(down.z, -1.0, epsilon = 1e-6);
        let forward = converter.world_vector_to_simulation(Vec3::X);
        assert_relative_eq!(forward.x, 0.5f32.cos(), epsilon = 1e-5);
        assert_relative_eq!(forward.y, -(0.5f32.sin()), epsilon = 1e-5);
    }

    #[test]
    fn converting_bodies_rotates_momentum() {
        let mut bodies = vec![AnimRigidBody::new(Vec3::ONE, CollisionType::CenterOfMass, 0.0)];
        bodies[0].linear_momentum = Vec3::X;
        let component = SpaceConverter::new(SimulationSpace::Component, basis());
        let world = SpaceConverter::new(SimulationSpace::World, basis());
        convert_bodies(&mut bodies, &component, &world);

        let expected = Quat::from_rotation_z(0.5) * Vec3::X;
        assert_relative_eq!(bodies[0].linear_momentum.x, expected.x, epsilon = 1e-5);
        assert_relative_eq!(bodies[0].linear_momentum.y, expected.y, epsilon = 1e-5);
        assert_relative_eq!(bodies[0].position().x, 10.0, epsilon = 1e-5);
    }
}
