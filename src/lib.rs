//! Anim Dynamics – secondary-motion physics for skeletal animation.
//!
//! This crate simulates short chains of rigid bodies bound to skeleton bones
//! (hair, tails, antennae, dangling props) so they react to character motion,
//! gravity, wind and external forces, and writes the simulated poses back into
//! the evaluated animation pose.

pub mod config;
pub mod core;
pub mod dynamics;
pub mod error;
pub mod node;
pub mod space;
pub mod utils;
pub mod world;

pub use glam::{Mat3, Quat, Vec3};

pub use config::{DynamicsConfig, PhysicsConstants};
pub use crate::core::{
    blend_bone_transforms, AngularConstraintType, AnimRigidBody, BoneContainer, BoneReference,
    BoneTransform, CollisionType, ConstraintSetup, LinearLimitType, PlanarLimit,
    RotationRetargeting, Skeleton, SphericalLimit, SphericalLimitType, TeleportRequest,
    TeleportType, Transform, TwistAxis,
};
pub use dynamics::{BodyChain, LimitSolver, RadialFalloff, StepPlan, TimeStepState};
pub use error::{DynamicsError, Result};
pub use utils::EasingType;
pub use node::{
    AnimDynamicsNode, AnimDynamicsSettings, AnimNode, EvaluationContext, PreUpdateContext,
    UpdateContext,
};
pub use space::{SimulationSpace, SpaceBasis, SpaceConverter};
pub use world::{StaticWorld, WindSample, WorldServices};

#[cfg(feature = "parallel")]
pub use dynamics::{EvaluationJob, ParallelEvaluator};

/// High-level convenience wrapper that owns one [`AnimDynamicsNode`] and runs a
/// full frame against the current global configuration.
pub struct AnimDynamics {
    node: AnimDynamicsNode,
}

impl AnimDynamics {
    /// Creates and initializes a node for the given settings.
    pub fn new(settings: AnimDynamicsSettings) -> Self {
        let mut node = AnimDynamicsNode::new(settings);
        node.initialize();
        Self { node }
    }

    /// Re-resolves bone bindings after the required-bone set changed.
    pub fn cache_bones(&mut self, bones: &dyn BoneContainer) {
        self.node.cache_bones(bones);
    }

    /// Runs pre-update, update and evaluate for one frame and returns the
    /// simulated bone transforms.
    #[allow(clippy::too_many_arguments)]
    pub fn step(
        &mut self,
        delta_time: f32,
        bones: &dyn BoneContainer,
        pose: &[Transform],
        component_to_world: Transform,
        actor_to_world: Transform,
        world: &dyn WorldServices,
    ) -> Vec<BoneTransform> {
        let config = DynamicsConfig::global();
        self.node.pre_update(&PreUpdateContext {
            world,
            config: &config,
        });
        self.node.update(&UpdateContext {
            delta_time,
            time_dilation: 1.0,
            config: &config,
        });
        let mut output = Vec::new();
        self.node.evaluate(
            &EvaluationContext {
                bones,
                pose,
                component_to_world,
                actor_to_world,
                world,
                config: &config,
            },
            &mut output,
        );
        output
    }

    /// Requests a teleport or full reset at the next step.
    pub fn reset(&self, kind: TeleportType) {
        self.node.reset_dynamics(kind);
    }

    pub fn node(&self) -> &AnimDynamicsNode {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut AnimDynamicsNode {
        &mut self.node
    }
}
