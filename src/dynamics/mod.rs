//! Chain construction, constraint generation, time stepping and the limit solver.

pub mod chain;
pub mod constraint_builder;
pub mod forces;
pub mod integrator;
#[cfg(feature = "parallel")]
pub mod parallel;
pub mod solver;
pub mod timestep;

pub use chain::{body_pose_from_bone, bone_pose_from_body, BodyChain};
pub use constraint_builder::{ConstraintSet, LimitTargets, SphereTarget};
pub use forces::{
    ComponentDrag, ComponentMotion, ForceGenerator, ForceRegistry, RadialFalloff, RadialForce,
    WindState,
};
pub use integrator::{Integrator, StepForces};
pub use solver::{clamp_cone, clamp_range, LimitSolver};
pub use timestep::{StepPlan, TimeStepState};

#[cfg(feature = "parallel")]
pub use parallel::{EvaluationJob, ParallelEvaluator};
