mod common;

use anim_dynamics::dynamics::BodyChain;
use anim_dynamics::*;
use approx::assert_relative_eq;
use common::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn build(rig: &Rig, settings: &AnimDynamicsSettings) -> Result<BodyChain> {
    let converter = SpaceConverter::new(SimulationSpace::Component, SpaceBasis::default());
    let mut rng = StdRng::seed_from_u64(3);
    BodyChain::build(settings, &rig.skeleton, &rig.pose, &converter, &mut rng)
}

#[test]
fn chain_has_one_body_per_bone_with_parent_links() {
    let rig = Rig::new();
    let chain = build(&rig, &hair_chain()).unwrap();

    assert_eq!(chain.len(), 3);
    assert_eq!(chain.bones.len(), 3);
    assert_eq!(chain.joint_offsets.len(), 3);
    assert_eq!(chain.rest_frames.len(), 3);
    assert_eq!(chain.active, vec![0, 1, 2]);
    assert_eq!(chain.bodies[0].parent, None);
    for (i, body) in chain.bodies.iter().enumerate().skip(1) {
        assert_eq!(body.parent, Some(i - 1));
    }

    let names: Vec<_> = chain.bones.iter().map(|bone| bone.name.as_str()).collect();
    assert_eq!(names, ["hair_a", "hair_b", "hair_c"]);
    assert_eq!(chain.bones[2].index(), Some(HAIR_C));
}

#[test]
fn derived_offsets_centre_bodies_between_bones() {
    let rig = Rig::new();
    let chain = build(&rig, &hair_chain()).unwrap();

    // hair_b sits 0.2 below hair_a, so its body centre is 0.1 above hair_b.
    assert_vec_near(chain.joint_offsets[1], Vec3::new(0.0, 0.0, 0.1), 1e-5);
    assert_vec_near(chain.bodies[1].position(), Vec3::new(0.0, 0.0, 1.4), 1e-5);
    assert_eq!(chain.joint_offsets[0], Vec3::ZERO);
}

#[test]
fn bent_chain_centres_each_body_on_the_previous_joint_anchor() {
    let mut rig = Rig::new();
    rig.pose[HAIR_A] = Transform::from_position_rotation(
        Vec3::new(0.0, 0.0, 1.5),
        Quat::from_rotation_y(0.6),
    );
    rig.pose[HAIR_B] = Transform::from_position_rotation(
        Vec3::new(0.15, 0.05, 1.35),
        Quat::from_rotation_x(-0.4),
    );
    rig.pose[HAIR_C] = Transform::from_position_rotation(
        Vec3::new(0.25, -0.1, 1.2),
        Quat::from_rotation_z(1.1),
    );
    let chain = build(&rig, &hair_chain()).unwrap();

    for i in 1..chain.len() {
        let anchor = chain.bodies[i - 1]
            .pose
            .transform_point(-chain.joint_offsets[i - 1]);
        assert_vec_near(anchor, chain.bone_pose(i - 1).position, 1e-5);

        let bone = rig.pose[HAIR_A + i].position;
        assert_vec_near(chain.bodies[i].position(), (anchor + bone) * 0.5, 1e-5);
    }
}

#[test]
fn chain_without_end_is_a_single_body() {
    let rig = Rig::new();
    let chain = build(&rig, &single_body(Vec3::new(0.0, 0.0, -0.05))).unwrap();
    assert_eq!(chain.len(), 1);
    assert_relative_eq!(chain.bodies[0].position().z, 1.45, epsilon = 1e-6);
}

#[test]
fn chain_end_outside_the_subtree_fails() {
    let rig = Rig::new();
    let settings = AnimDynamicsSettings {
        chain_end: BoneReference::new("jaw"),
        ..hair_chain()
    };
    assert!(matches!(
        build(&rig, &settings),
        Err(DynamicsError::ChainEndNotReachable { .. })
    ));
}

#[test]
fn unknown_bound_bone_fails() {
    let rig = Rig::new();
    let settings = AnimDynamicsSettings {
        bound_bone: BoneReference::new("tail"),
        ..AnimDynamicsSettings::default()
    };
    assert_eq!(
        build(&rig, &settings).unwrap_err(),
        DynamicsError::BoneNotFound("tail".into())
    );
}

#[test]
fn lod_changes_update_the_active_set() {
    let mut rig = Rig::new();
    let mut chain = build(&rig, &hair_chain()).unwrap();

    rig.skeleton.set_required(HAIR_C, false);
    assert!(chain.refresh_active(&rig.skeleton).is_empty());
    assert_eq!(chain.active, vec![0, 1]);
    assert!(!chain.is_active(2));

    rig.skeleton.set_required(HAIR_C, true);
    assert_eq!(chain.refresh_active(&rig.skeleton), vec![2]);
    assert_eq!(chain.active, vec![0, 1, 2]);
}

#[test]
fn collision_radius_comes_from_settings() {
    let rig = Rig::new();
    let settings = AnimDynamicsSettings {
        box_extents: Vec3::new(0.1, 0.2, 0.4),
        collision_type: CollisionType::OuterSphere,
        ..hair_chain()
    };
    let chain = build(&rig, &settings).unwrap();
    assert!(chain
        .bodies
        .iter()
        .all(|body| (body.collision_radius - 0.2).abs() < 1e-6));
}
