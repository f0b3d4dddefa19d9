//! Pipeline-facing animation node that drives the body chain each frame.

use std::sync::Arc;

use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::{
    DynamicsConfig, PhysicsConstants, DEFAULT_POST_UPDATE_ITERATIONS,
    DEFAULT_PRE_UPDATE_ITERATIONS,
};
use crate::core::{
    AnimRigidBody, BoneContainer, BoneReference, BoneTransform, CollisionType, ConstraintSetup,
    PlanarLimit, SphericalLimit, TeleportRequest, TeleportType, Transform,
};
use crate::dynamics::{
    BodyChain, ComponentDrag, ComponentMotion, ConstraintSet, ForceRegistry, LimitSolver,
    LimitTargets, RadialFalloff, RadialForce, StepForces, StepPlan, TimeStepState, WindState,
};
use crate::space::{convert_bodies, SimulationSpace, SpaceBasis, SpaceConverter};
use crate::utils::logging::{log_once, ScopedTimer};
use crate::world::WorldServices;

/// Authored settings of one dynamics node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimDynamicsSettings {
    /// First bone of the chain.
    pub bound_bone: BoneReference,
    /// Last bone of the chain; unset for a single body.
    pub chain_end: BoneReference,
    pub box_extents: Vec3,
    /// Body centre relative to its bone, in the bone's frame.
    pub local_joint_offset: Vec3,
    pub collision_type: CollisionType,
    pub sphere_collision_radius: f32,
    pub gravity_scale: f32,
    /// World-space gravity used instead of the scaled world gravity.
    pub gravity_override: Option<Vec3>,
    pub linear_damping_override: Option<f32>,
    pub angular_damping_override: Option<f32>,
    pub linear_spring_constant: f32,
    pub angular_spring_constant: f32,
    pub use_linear_spring: bool,
    pub use_angular_spring: bool,
    pub constraint_setup: ConstraintSetup,
    pub planar_limits: Vec<PlanarLimit>,
    pub use_planar_limits: bool,
    pub spherical_limits: Vec<SphericalLimit>,
    pub use_spherical_limits: bool,
    pub simulation_space: SimulationSpace,
    /// Frame of [`SimulationSpace::BoneRelative`].
    pub relative_space_bone: BoneReference,
    pub enable_wind: bool,
    pub wind_scale: f32,
    pub use_adaptive_substeps: bool,
    pub pre_iterations: u32,
    pub post_iterations: u32,
    pub component_drag: ComponentDrag,
    /// Constant world-space force applied to every body.
    pub external_force: Vec3,
    /// When off the chain holds its last pose.
    pub do_update: bool,
    /// Overrides the global LOD threshold.
    pub lod_threshold: Option<usize>,
    pub wind_seed: u64,
}

impl Default for AnimDynamicsSettings {
    fn default() -> Self {
        Self {
            bound_bone: BoneReference::default(),
            chain_end: BoneReference::default(),
            box_extents: Vec3::splat(0.1),
            local_joint_offset: Vec3::ZERO,
            collision_type: CollisionType::CenterOfMass,
            sphere_collision_radius: 0.05,
            gravity_scale: 1.0,
            gravity_override: None,
            linear_damping_override: None,
            angular_damping_override: None,
            linear_spring_constant: 0.0,
            angular_spring_constant: 0.0,
            use_linear_spring: false,
            use_angular_spring: false,
            constraint_setup: ConstraintSetup::default(),
            planar_limits: Vec::new(),
            use_planar_limits: false,
            spherical_limits: Vec::new(),
            use_spherical_limits: false,
            simulation_space: SimulationSpace::Component,
            relative_space_bone: BoneReference::default(),
            enable_wind: false,
            wind_scale: 1.0,
            use_adaptive_substeps: false,
            pre_iterations: DEFAULT_PRE_UPDATE_ITERATIONS,
            post_iterations: DEFAULT_POST_UPDATE_ITERATIONS,
            component_drag: ComponentDrag::default(),
            external_force: Vec3::ZERO,
            do_update: true,
            lod_threshold: None,
            wind_seed: 0,
        }
    }
}

impl AnimDynamicsSettings {
    fn resolve_auxiliary_bones(&mut self, bones: &dyn BoneContainer) {
        self.bound_bone.resolve(bones);
        self.chain_end.resolve(bones);
        self.relative_space_bone.resolve(bones);
        for limit in &mut self.planar_limits {
            limit.driving_bone.resolve(bones);
        }
        for limit in &mut self.spherical_limits {
            limit.driving_bone.resolve(bones);
        }
    }
}

pub struct UpdateContext<'a> {
    pub delta_time: f32,
    pub time_dilation: f32,
    pub config: &'a DynamicsConfig,
}

pub struct PreUpdateContext<'a> {
    pub world: &'a dyn WorldServices,
    pub config: &'a DynamicsConfig,
}

/// Everything one evaluation reads from the host.
pub struct EvaluationContext<'a> {
    pub bones: &'a dyn BoneContainer,
    /// Component-space input pose indexed by skeleton bone.
    pub pose: &'a [Transform],
    pub component_to_world: Transform,
    pub actor_to_world: Transform,
    pub world: &'a dyn WorldServices,
    pub config: &'a DynamicsConfig,
}

/// Lifecycle the animation pipeline drives every frame.
pub trait AnimNode: Send + Sync {
    fn initialize(&mut self);

    /// Called whenever the required-bone set changes.
    fn cache_bones(&mut self, bones: &dyn BoneContainer);

    fn pre_update(&mut self, ctx: &PreUpdateContext<'_>);

    fn update(&mut self, ctx: &UpdateContext<'_>);

    /// Appends the simulated component-space transforms to `output`. Appends
    /// nothing when the node passes its input through.
    fn evaluate(&mut self, ctx: &EvaluationContext<'_>, output: &mut Vec<BoneTransform>);

    /// Requests a teleport or full reset at the next evaluation.
    fn reset_dynamics(&self, kind: TeleportType);
}

/// Secondary-motion chain of rigid bodies bound to skeleton bones.
#[derive(Debug)]
pub struct AnimDynamicsNode {
    pub settings: AnimDynamicsSettings,
    chain: BodyChain,
    needs_build: bool,
    failed: bool,
    failure_logged: bool,
    bound_bone_available: Option<bool>,
    constants: PhysicsConstants,
    time: TimeStepState,
    time_dilation: f32,
    reset_request: Arc<TeleportRequest>,
    newly_active: Vec<usize>,
    previous_converter: Option<SpaceConverter>,
    lod_suspended: bool,
    constraints: ConstraintSet,
    forces: ForceRegistry,
    motion: ComponentMotion,
    wind: WindState,
    rng: StdRng,
}

impl AnimDynamicsNode {
    pub fn new(settings: AnimDynamicsSettings) -> Self {
        let rng = StdRng::seed_from_u64(settings.wind_seed);
        Self {
            settings,
            chain: BodyChain::default(),
            needs_build: true,
            failed: false,
            failure_logged: false,
            bound_bone_available: None,
            constants: PhysicsConstants::default(),
            time: TimeStepState::new(),
            time_dilation: 1.0,
            reset_request: Arc::new(TeleportRequest::new()),
            newly_active: Vec::new(),
            previous_converter: None,
            lod_suspended: false,
            constraints: ConstraintSet::new(),
            forces: ForceRegistry::new(),
            motion: ComponentMotion::default(),
            wind: WindState::default(),
            rng,
        }
    }

    pub fn chain(&self) -> &BodyChain {
        &self.chain
    }

    pub fn bodies(&self) -> &[AnimRigidBody] {
        &self.chain.bodies
    }

    /// Whether the chain failed to build and the node is passing its input through.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn time_state(&self) -> &TimeStepState {
        &self.time
    }

    pub fn physics_constants(&self) -> &PhysicsConstants {
        &self.constants
    }

    /// Reset request not yet consumed by an evaluation.
    pub fn pending_reset(&self) -> TeleportType {
        self.reset_request.peek()
    }

    /// Shared handle other threads can use to request a reset.
    pub fn reset_handle(&self) -> Arc<TeleportRequest> {
        Arc::clone(&self.reset_request)
    }

    pub fn set_simulation_space(&mut self, space: SimulationSpace) {
        self.settings.simulation_space = space;
    }

    /// Queues a radial force, applied once at the next simulated evaluation.
    pub fn add_radial_force(
        &mut self,
        origin: Vec3,
        radius: f32,
        strength: f32,
        falloff: RadialFalloff,
        mass_independent: bool,
    ) {
        self.forces.add_force(RadialForce {
            origin,
            radius,
            strength,
            falloff,
            mass_independent,
            impulse: false,
        });
    }

    /// Queues a radial impulse, applied once at the next simulated evaluation.
    pub fn add_radial_impulse(
        &mut self,
        origin: Vec3,
        radius: f32,
        strength: f32,
        falloff: RadialFalloff,
        velocity_change: bool,
    ) {
        self.forces.add_force(RadialForce {
            origin,
            radius,
            strength,
            falloff,
            mass_independent: velocity_change,
            impulse: true,
        });
    }

    fn space_basis(&self, ctx: &EvaluationContext<'_>) -> SpaceBasis {
        let relative_bone = self
            .settings
            .relative_space_bone
            .valid_index(ctx.bones)
            .and_then(|index| ctx.pose.get(index).copied());
        SpaceBasis {
            component_to_world: ctx.component_to_world,
            actor_to_world: ctx.actor_to_world,
            root_bone: ctx.pose.first().copied().unwrap_or(Transform::IDENTITY),
            relative_bone,
        }
    }

    /// Rebuilds the chain from scratch. Returns whether a usable chain exists.
    fn rebuild(&mut self, ctx: &EvaluationContext<'_>, converter: &SpaceConverter) -> bool {
        let _timer = ScopedTimer::new("anim_dynamics::build");
        self.needs_build = false;
        self.settings.resolve_auxiliary_bones(ctx.bones);
        self.settings.constraint_setup.update_locked_state();
        for warning in self.settings.constraint_setup.validate() {
            log::warn!("{warning}");
        }

        self.constants = PhysicsConstants::or_fallback(ctx.world.physics_constants());
        self.time.reset();
        self.motion.reset();
        self.newly_active.clear();

        match BodyChain::build(&self.settings, ctx.bones, ctx.pose, converter, &mut self.rng) {
            Ok(chain) => {
                self.chain = chain;
                self.failed = false;
                self.failure_logged = false;
                true
            }
            Err(err) => {
                self.chain = BodyChain::default();
                self.failed = true;
                log_once(
                    &mut self.failure_logged,
                    log::Level::Error,
                    format_args!("anim dynamics disabled: {err}"),
                );
                false
            }
        }
    }

    fn simulate(
        &mut self,
        ctx: &EvaluationContext<'_>,
        converter: &SpaceConverter,
        targets: &LimitTargets,
        elapsed: f32,
    ) -> bool {
        let fixed_substeps =
            self.settings.use_adaptive_substeps && ctx.config.adaptive_substep_enabled;
        let plan = self.time.plan(
            elapsed,
            &self.constants,
            self.time_dilation,
            fixed_substeps,
            ctx.config.debt_frames,
        );
        if plan == StepPlan::Skip {
            return false;
        }

        let _timer = ScopedTimer::new("anim_dynamics::solve");
        self.forces
            .apply_all(&mut self.chain.bodies, &self.chain.active, converter);
        let forces = StepForces {
            gravity: converter.world_vector_to_simulation(Vec3::new(0.0, 0.0, ctx.world.gravity_z())),
            world_to_simulation: converter.world_to_simulation_rotation(),
            external_force: converter.world_vector_to_simulation(self.settings.external_force),
            drag_acceleration: self.motion.drag_acceleration(
                &self.settings.component_drag,
                converter,
                elapsed,
            ),
            wind: self.wind.was_enabled(),
        };

        let solver = LimitSolver::new(self.settings.pre_iterations, self.settings.post_iterations);
        for step in plan.steps() {
            self.constraints.rebuild(&self.settings, &self.chain, targets);
            let (bodies, active) = self.chain.bodies_and_mask();
            solver.step(bodies, active, &self.constraints, &forces, step);
        }

        for body in &mut self.chain.bodies {
            body.external_force = Vec3::ZERO;
        }
        true
    }

    fn write_back(
        &self,
        ctx: &EvaluationContext<'_>,
        converter: &SpaceConverter,
        targets: &LimitTargets,
        output: &mut Vec<BoneTransform>,
    ) {
        let _timer = ScopedTimer::new("anim_dynamics::write_back");
        let retargeting = &self.settings.constraint_setup.rotation_retargeting;
        for &index in &self.chain.active {
            let Some(bone) = self.chain.bones[index].index() else {
                continue;
            };
            let mut simulated = self.chain.bone_pose(index);
            if let Some(Some(animated)) = targets.bone_frames.get(index) {
                simulated.rotation = retargeting.retarget(animated.rotation, simulated.rotation);
            }
            let component = converter.to_component(&simulated);
            let scale = ctx.pose.get(bone).map_or(Vec3::ONE, |input| input.scale);
            output.push(BoneTransform {
                bone,
                transform: Transform { scale, ..component },
            });
        }
    }
}

impl AnimNode for AnimDynamicsNode {
    fn initialize(&mut self) {
        self.needs_build = true;
        self.failed = false;
        self.failure_logged = false;
        self.bound_bone_available = None;
        self.chain = BodyChain::default();
        self.time.reset();
        self.reset_request.take();
        self.newly_active.clear();
        self.previous_converter = None;
        self.lod_suspended = false;
        self.motion.reset();
        self.wind = WindState::default();
        self.rng = StdRng::seed_from_u64(self.settings.wind_seed);
    }

    fn cache_bones(&mut self, bones: &dyn BoneContainer) {
        self.settings.resolve_auxiliary_bones(bones);

        let available = self.settings.bound_bone.index().is_some();
        if matches!(self.bound_bone_available, Some(was) if was != available) {
            log::debug!(
                "bound bone '{}' availability changed, rebuilding chain",
                self.settings.bound_bone.name
            );
            self.needs_build = true;
        }
        self.bound_bone_available = Some(available);

        if self.chain.is_empty() {
            return;
        }
        if !self.chain.resolve_bones(bones) {
            self.needs_build = true;
            return;
        }
        for index in self.chain.refresh_active(bones) {
            if !self.newly_active.contains(&index) {
                self.newly_active.push(index);
            }
        }
    }

    fn pre_update(&mut self, ctx: &PreUpdateContext<'_>) {
        if self.chain.is_empty() {
            return;
        }
        let converter = self.previous_converter.unwrap_or_else(|| {
            SpaceConverter::new(self.settings.simulation_space, SpaceBasis::default())
        });
        self.wind.update(
            self.settings.enable_wind && ctx.config.wind_enabled,
            &mut self.chain.bodies,
            &self.chain.active,
            ctx.world,
            &converter,
            self.settings.wind_scale,
            &mut self.rng,
        );
    }

    fn update(&mut self, ctx: &UpdateContext<'_>) {
        self.time.accumulate(ctx.delta_time);
        self.time_dilation = ctx.time_dilation;
    }

    fn evaluate(&mut self, ctx: &EvaluationContext<'_>, output: &mut Vec<BoneTransform>) {
        let _timer = ScopedTimer::new("anim_dynamics::evaluate");
        let elapsed = self.time.take_delta();

        if !self.evaluate_chain(ctx, elapsed, output) {
            self.motion.hold(ctx.component_to_world.position);
        }
    }

    fn reset_dynamics(&self, kind: TeleportType) {
        self.reset_request.escalate(kind);
    }
}

impl AnimDynamicsNode {
    /// One evaluation after the time delta was taken. Returns whether the chain
    /// integrated this frame.
    fn evaluate_chain(
        &mut self,
        ctx: &EvaluationContext<'_>,
        elapsed: f32,
        output: &mut Vec<BoneTransform>,
    ) -> bool {
        if !ctx.config.enabled {
            return false;
        }
        if !ctx
            .config
            .allows_lod(ctx.bones.lod_level(), self.settings.lod_threshold)
        {
            if !self.lod_suspended {
                log::debug!("anim dynamics suspended at LOD {}", ctx.bones.lod_level());
                self.lod_suspended = true;
            }
            return false;
        }
        if self.lod_suspended {
            self.lod_suspended = false;
            self.reset_request.escalate(TeleportType::FullReset);
        }

        let request = self.reset_request.take();
        let build = self.needs_build || request == TeleportType::FullReset;
        if build {
            // The relative-space bone must be resolved before the frame is taken.
            self.settings.resolve_auxiliary_bones(ctx.bones);
        }
        let converter = SpaceConverter::new(self.settings.simulation_space, self.space_basis(ctx));

        let rebuilt = if build {
            if request == TeleportType::FullReset {
                log::debug!("anim dynamics full reset");
            }
            if !self.rebuild(ctx, &converter) {
                self.previous_converter = Some(converter);
                return false;
            }
            true
        } else {
            false
        };

        if self.failed || self.chain.is_empty() {
            self.previous_converter = Some(converter);
            return false;
        }

        if !rebuilt {
            if let Some(previous) = self.previous_converter {
                if previous.space != converter.space {
                    convert_bodies(&mut self.chain.bodies, &previous, &converter);
                } else if request == TeleportType::Teleport {
                    log::debug!("anim dynamics teleport");
                    convert_bodies(&mut self.chain.bodies, &previous, &converter);
                    self.motion.reset();
                }
            }
        }

        let targets = LimitTargets::resolve(
            &self.settings,
            &self.chain,
            ctx.bones,
            ctx.pose,
            &converter,
        );

        for index in std::mem::take(&mut self.newly_active) {
            if let Some(Some(bone_frame)) = targets.bone_frames.get(index) {
                self.chain.reset_body(index, bone_frame);
            }
        }

        let simulated =
            !rebuilt && self.settings.do_update && self.simulate(ctx, &converter, &targets, elapsed);

        self.write_back(ctx, &converter, &targets, output);
        self.previous_converter = Some(converter);
        simulated
    }
}
