//! Services the solver queries from the hosting world.

use crate::config::{PhysicsConstants, DEFAULT_GRAVITY_Z};
use glam::Vec3;

/// Wind at a point, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindSample {
    pub direction: Vec3,
    pub speed: f32,
}

/// World-level queries: gravity, wind and physics timing constants.
pub trait WorldServices: Sync {
    /// Gravity along the world up axis.
    fn gravity_z(&self) -> f32;

    /// Wind at `world_position`, or `None` when the world has no wind field.
    fn sample_wind(&self, world_position: Vec3) -> Option<WindSample>;

    /// Timing constants, or `None` when the world does not provide them.
    fn physics_constants(&self) -> Option<PhysicsConstants>;
}

/// World with uniform gravity, an optional uniform wind and optional constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticWorld {
    pub gravity_z: f32,
    pub wind: Option<WindSample>,
    pub constants: Option<PhysicsConstants>,
}

impl Default for StaticWorld {
    fn default() -> Self {
        Self {
            gravity_z: DEFAULT_GRAVITY_Z,
            wind: None,
            constants: None,
        }
    }
}

impl StaticWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wind(mut self, direction: Vec3, speed: f32) -> Self {
        self.wind = Some(WindSample {
            direction: direction.normalize_or_zero(),
            speed,
        });
        self
    }

    pub fn with_constants(mut self, constants: PhysicsConstants) -> Self {
        self.constants = Some(constants);
        self
    }
}

impl WorldServices for StaticWorld {
    fn gravity_z(&self) -> f32 {
        self.gravity_z
    }

    fn sample_wind(&self, _world_position: Vec3) -> Option<WindSample> {
        self.wind
    }

    fn physics_constants(&self) -> Option<PhysicsConstants> {
        self.constants
    }
}
