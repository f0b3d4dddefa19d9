//! Global configuration constants and process-wide toggles for the Anim Dynamics solver.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Default world gravity along the world up axis (Z-up, metres per second squared).
pub const DEFAULT_GRAVITY_Z: f32 = -9.81;

/// Default damping applied to linear momentum when a body has no override.
pub const DEFAULT_LINEAR_DAMPING: f32 = 0.7;

/// Default damping applied to angular momentum when a body has no override.
pub const DEFAULT_ANGULAR_DAMPING: f32 = 0.7;

/// Number of limit projection passes run before the integrated motion is applied.
pub const DEFAULT_PRE_UPDATE_ITERATIONS: u32 = 4;

/// Number of limit projection passes run after the integrated motion is applied.
pub const DEFAULT_POST_UPDATE_ITERATIONS: u32 = 1;

/// Mass given to every simulated body.
pub const DEFAULT_BODY_MASS: f32 = 1.0;

/// How strongly a body's velocity is pulled towards the local wind velocity (1/s).
pub const DEFAULT_WIND_DRAG: f32 = 0.5;

/// Upper bound (exclusive) of the per-body random wind adaption scalar.
pub const WIND_ADAPTION_RANGE: f32 = 2.0;

/// Number of nominal frames of simulation time that may be carried as debt.
pub const DEFAULT_DEBT_FRAMES: u32 = 5;

/// Fallback minimum frame delta below which no simulation happens.
pub const FALLBACK_MIN_DELTA_TIME: f32 = 0.0;

/// Fallback maximum delta handed to the integrator in a single step.
pub const FALLBACK_MAX_PHYSICS_DELTA_TIME: f32 = 1.0 / 30.0;

/// Fallback fixed sub-step size.
pub const FALLBACK_MAX_SUBSTEP_DELTA_TIME: f32 = 1.0 / 60.0;

/// Fallback cap on the number of sub-steps per frame.
pub const FALLBACK_MAX_SUBSTEPS: u32 = 4;

/// Physics timing constants normally provided by the hosting engine's physics settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConstants {
    pub min_delta_time: f32,
    pub max_physics_delta_time: f32,
    pub max_substep_delta_time: f32,
    pub max_substeps: u32,
}

impl Default for PhysicsConstants {
    fn default() -> Self {
        Self {
            min_delta_time: FALLBACK_MIN_DELTA_TIME,
            max_physics_delta_time: FALLBACK_MAX_PHYSICS_DELTA_TIME,
            max_substep_delta_time: FALLBACK_MAX_SUBSTEP_DELTA_TIME,
            max_substeps: FALLBACK_MAX_SUBSTEPS,
        }
    }
}

impl PhysicsConstants {
    /// Returns the provided constants, or the fallback defaults when the provider has none.
    pub fn or_fallback(provided: Option<PhysicsConstants>) -> Self {
        match provided {
            Some(constants) => constants,
            None => {
                log::debug!("physics constants unavailable, using fallback defaults");
                Self::default()
            }
        }
    }
}

/// Process-wide switches shared by every node instance.
///
/// Nodes never read the global store directly during simulation: callers take a
/// snapshot with [`DynamicsConfig::global`] once per phase and pass it in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicsConfig {
    /// Master switch; when off every node passes its input pose through.
    pub enabled: bool,
    /// Highest LOD level that still simulates. `None` means no restriction.
    pub lod_threshold: Option<usize>,
    pub wind_enabled: bool,
    /// Allows fixed sub-stepping; when off nodes use a single variable step.
    pub adaptive_substep_enabled: bool,
    /// Time debt is clamped to this many nominal frames.
    pub debt_frames: u32,
}

impl DynamicsConfig {
    pub const DEFAULT: DynamicsConfig = DynamicsConfig {
        enabled: true,
        lod_threshold: None,
        wind_enabled: true,
        adaptive_substep_enabled: true,
        debt_frames: DEFAULT_DEBT_FRAMES,
    };

    /// Snapshot of the current process-wide configuration.
    pub fn global() -> DynamicsConfig {
        *GLOBAL_CONFIG.read()
    }

    /// Replaces the process-wide configuration.
    pub fn set_global(config: DynamicsConfig) {
        *GLOBAL_CONFIG.write() = config;
    }

    /// Restores the process-wide configuration to its defaults.
    pub fn reset_global() {
        Self::set_global(Self::DEFAULT);
    }

    /// Whether simulation may run at `lod`, given an optional node-level threshold
    /// that takes precedence over the global one.
    pub fn allows_lod(&self, lod: usize, node_threshold: Option<usize>) -> bool {
        match node_threshold.or(self.lod_threshold) {
            Some(threshold) => lod <= threshold,
            None => true,
        }
    }
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

static GLOBAL_CONFIG: RwLock<DynamicsConfig> = RwLock::new(DynamicsConfig::DEFAULT);
