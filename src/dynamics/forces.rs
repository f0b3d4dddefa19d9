use crate::config::WIND_ADAPTION_RANGE;
use crate::core::{AnimRigidBody, Transform};
use crate::space::{SimulationSpace, SpaceConverter};
use crate::utils::math::clamp_symmetric;
use crate::world::WorldServices;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Trait describing an external force generator applied to simulated bodies.
pub trait ForceGenerator: Send + Sync {
    fn apply(&self, body: &mut AnimRigidBody, converter: &SpaceConverter);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RadialFalloff {
    #[default]
    Constant,
    /// Strength fades to zero at the radius.
    Linear,
}

/// Force or impulse pushing bodies away from a world-space origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadialForce {
    pub origin: Vec3,
    pub radius: f32,
    pub strength: f32,
    pub falloff: RadialFalloff,
    /// Treat `strength` as an acceleration (or velocity change) instead of a force.
    pub mass_independent: bool,
    pub impulse: bool,
}

impl RadialForce {
    /// Push along `direction` at `distance` from the origin, or `None` when out of range.
    fn push(&self, offset: Vec3) -> Option<Vec3> {
        let distance = offset.length();
        if distance > self.radius {
            return None;
        }
        let direction = offset.try_normalize()?;
        let scale = match self.falloff {
            RadialFalloff::Constant => 1.0,
            RadialFalloff::Linear if self.radius > 0.0 => 1.0 - distance / self.radius,
            RadialFalloff::Linear => 0.0,
        };
        Some(direction * (self.strength * scale))
    }
}

impl ForceGenerator for RadialForce {
    fn apply(&self, body: &mut AnimRigidBody, converter: &SpaceConverter) {
        let origin = converter.world_point_to_simulation(self.origin);
        let Some(mut push) = self.push(body.position() - origin) else {
            return;
        };
        if self.mass_independent {
            push *= body.mass;
        }
        if self.impulse {
            body.apply_impulse(push);
        } else {
            body.apply_force(push);
        }
    }
}

/// Forces queued for the next evaluation. Drained once applied.
pub struct ForceRegistry {
    forces: Vec<Box<dyn ForceGenerator>>,
}

impl Default for ForceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ForceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForceRegistry")
            .field("pending", &self.forces.len())
            .finish()
    }
}

impl ForceRegistry {
    pub fn new() -> Self {
        Self { forces: Vec::new() }
    }

    pub fn add_force<F: ForceGenerator + 'static>(&mut self, force: F) {
        self.forces.push(Box::new(force));
    }

    pub fn len(&self) -> usize {
        self.forces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }

    /// Applies every queued force to the active bodies, then clears the queue.
    pub fn apply_all(
        &mut self,
        bodies: &mut [AnimRigidBody],
        active: &[usize],
        converter: &SpaceConverter,
    ) {
        for force in self.forces.drain(..) {
            for &index in active {
                if let Some(body) = bodies.get_mut(index) {
                    force.apply(body, converter);
                }
            }
        }
    }
}

/// Authored response of the chain to the component's own movement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentDrag {
    pub velocity_scale: Vec3,
    pub acceleration_scale: Vec3,
    /// Component-wise bound of the resulting acceleration.
    pub acceleration_clamp: Vec3,
}

impl Default for ComponentDrag {
    fn default() -> Self {
        Self {
            velocity_scale: Vec3::ZERO,
            acceleration_scale: Vec3::ONE,
            acceleration_clamp: Vec3::splat(10_000.0),
        }
    }
}

/// Finite-differenced world-space motion of the component.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ComponentMotion {
    previous_position: Option<Vec3>,
    velocity: Option<Vec3>,
}

impl ComponentMotion {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Records the component position on a frame that does not integrate.
    ///
    /// Velocity history is dropped so the next sample reports no acceleration
    /// for motion that happened while the chain was held.
    pub fn hold(&mut self, position: Vec3) {
        self.previous_position = Some(position);
        self.velocity = None;
    }

    /// Samples the component position and returns `(velocity, acceleration)`.
    pub fn sample(&mut self, component_to_world: &Transform, elapsed: f32) -> (Vec3, Vec3) {
        let position = component_to_world.position;
        let previous = self.previous_position.replace(position);
        let (Some(previous), true) = (previous, elapsed > 0.0) else {
            self.velocity = None;
            return (Vec3::ZERO, Vec3::ZERO);
        };
        let velocity = (position - previous) / elapsed;
        let acceleration = self
            .velocity
            .map_or(Vec3::ZERO, |last| (velocity - last) / elapsed);
        self.velocity = Some(velocity);
        (velocity, acceleration)
    }

    /// Acceleration opposing the component's motion, in simulation space. Zero in
    /// world space, where bodies already lag behind the component naturally.
    pub fn drag_acceleration(
        &mut self,
        drag: &ComponentDrag,
        converter: &SpaceConverter,
        elapsed: f32,
    ) -> Vec3 {
        let (velocity, acceleration) = self.sample(&converter.basis.component_to_world, elapsed);
        if converter.space == SimulationSpace::World {
            return Vec3::ZERO;
        }
        let world = -(velocity * drag.velocity_scale) - acceleration * drag.acceleration_scale;
        converter.world_vector_to_simulation(clamp_symmetric(world, drag.acceleration_clamp))
    }
}

/// Per-node wind bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindState {
    was_enabled: bool,
}

impl WindState {
    pub fn was_enabled(&self) -> bool {
        self.was_enabled
    }

    /// Samples wind for the active bodies. When wind turns on every body rolls a
    /// new adaption factor; when it turns off the per-body flags are cleared once.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        enabled: bool,
        bodies: &mut [AnimRigidBody],
        active: &[usize],
        world: &dyn WorldServices,
        converter: &SpaceConverter,
        wind_scale: f32,
        rng: &mut StdRng,
    ) {
        if !enabled {
            if self.was_enabled {
                for body in bodies.iter_mut() {
                    body.wind_enabled = false;
                    body.wind.speed = 0.0;
                }
                log::debug!("wind disabled for {} bodies", bodies.len());
            }
            self.was_enabled = false;
            return;
        }

        if !self.was_enabled {
            for body in bodies.iter_mut() {
                body.wind.adaption = rng.gen_range(0.0..WIND_ADAPTION_RANGE);
            }
        }
        self.was_enabled = true;

        for &index in active {
            let Some(body) = bodies.get_mut(index) else {
                continue;
            };
            body.wind_enabled = true;
            body.wind.body_scale = wind_scale;
            let world_position = converter.simulation_point_to_world(body.position());
            match world.sample_wind(world_position) {
                Some(sample) => {
                    body.wind.direction = converter.world_vector_to_simulation(sample.direction);
                    body.wind.speed = sample.speed;
                }
                None => {
                    body.wind.direction = Vec3::ZERO;
                    body.wind.speed = 0.0;
                }
            }
        }
    }
}
