#![allow(dead_code)]

use anim_dynamics::*;

pub const DT: f32 = 1.0 / 60.0;

pub const ROOT: usize = 0;
pub const HEAD: usize = 1;
pub const HAIR_A: usize = 2;
pub const HAIR_B: usize = 3;
pub const HAIR_C: usize = 4;
pub const JAW: usize = 5;

/// Small head-and-hair skeleton plus the host state a node evaluates against.
pub struct Rig {
    pub skeleton: Skeleton,
    pub pose: Vec<Transform>,
    pub component_to_world: Transform,
    pub actor_to_world: Transform,
    pub world: StaticWorld,
    pub config: DynamicsConfig,
}

impl Rig {
    pub fn new() -> Self {
        let mut skeleton = Skeleton::new();
        let root = skeleton.add_bone("root", None);
        let head = skeleton.add_bone("head", Some(root));
        let hair_a = skeleton.add_bone("hair_a", Some(head));
        let hair_b = skeleton.add_bone("hair_b", Some(hair_a));
        skeleton.add_bone("hair_c", Some(hair_b));
        skeleton.add_bone("jaw", Some(head));

        let pose = vec![
            Transform::IDENTITY,
            Transform::from_position(Vec3::new(0.0, 0.0, 1.6)),
            Transform::from_position(Vec3::new(0.0, 0.0, 1.5)),
            Transform::from_position(Vec3::new(0.0, 0.0, 1.3)),
            Transform::from_position(Vec3::new(0.0, 0.0, 1.1)),
            Transform::from_position(Vec3::new(0.1, 0.0, 1.55)),
        ];

        Self {
            skeleton,
            pose,
            component_to_world: Transform::IDENTITY,
            actor_to_world: Transform::IDENTITY,
            world: StaticWorld::new(),
            config: DynamicsConfig::DEFAULT,
        }
    }

    pub fn evaluate(&self, node: &mut AnimDynamicsNode) -> Vec<BoneTransform> {
        let mut output = Vec::new();
        node.evaluate(
            &EvaluationContext {
                bones: &self.skeleton,
                pose: &self.pose,
                component_to_world: self.component_to_world,
                actor_to_world: self.actor_to_world,
                world: &self.world,
                config: &self.config,
            },
            &mut output,
        );
        output
    }

    /// Runs pre-update, update and evaluate for one frame of `delta_time` seconds.
    pub fn frame(&self, node: &mut AnimDynamicsNode, delta_time: f32) -> Vec<BoneTransform> {
        node.pre_update(&PreUpdateContext {
            world: &self.world,
            config: &self.config,
        });
        node.update(&UpdateContext {
            delta_time,
            time_dilation: 1.0,
            config: &self.config,
        });
        self.evaluate(node)
    }

    pub fn run(&self, node: &mut AnimDynamicsNode, frames: usize) -> Vec<BoneTransform> {
        let mut output = Vec::new();
        for _ in 0..frames {
            output = self.frame(node, DT);
        }
        output
    }
}

pub fn single_body(offset: Vec3) -> AnimDynamicsSettings {
    AnimDynamicsSettings {
        bound_bone: BoneReference::new("hair_a"),
        local_joint_offset: offset,
        ..AnimDynamicsSettings::default()
    }
}

pub fn hair_chain() -> AnimDynamicsSettings {
    AnimDynamicsSettings {
        bound_bone: BoneReference::new("hair_a"),
        chain_end: BoneReference::new("hair_c"),
        ..AnimDynamicsSettings::default()
    }
}

/// Settings whose bodies can translate freely.
pub fn loose(mut settings: AnimDynamicsSettings) -> AnimDynamicsSettings {
    settings.constraint_setup.linear_x_limit_type = LinearLimitType::Free;
    settings.constraint_setup.linear_y_limit_type = LinearLimitType::Free;
    settings.constraint_setup.linear_z_limit_type = LinearLimitType::Free;
    settings
}

pub fn assert_vec_near(actual: Vec3, expected: Vec3, tolerance: f32) {
    assert!(
        (actual - expected).length() <= tolerance,
        "expected {expected:?}, got {actual:?}"
    );
}
