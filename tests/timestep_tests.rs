use anim_dynamics::config::DEFAULT_DEBT_FRAMES;
use anim_dynamics::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn time_debt_stays_bounded_under_erratic_frame_times() {
    let constants = PhysicsConstants::default();
    let max_debt = TimeStepState::max_debt(&constants, DEFAULT_DEBT_FRAMES);
    let mut state = TimeStepState::new();
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..2_000 {
        let elapsed = rng.gen_range(0.0..0.5);
        match state.plan(elapsed, &constants, 1.0, true, DEFAULT_DEBT_FRAMES) {
            StepPlan::Fixed { count, .. } => assert!(count <= constants.max_substeps),
            StepPlan::Skip => {}
            StepPlan::Variable { .. } => panic!("fixed sub-stepping requested"),
        }
        assert!(state.time_debt() >= 0.0);
        assert!(state.time_debt() <= max_debt + 1e-6);
    }
    assert!((max_debt - 5.0 / 60.0).abs() < 1e-6);
}

#[test]
fn small_frames_accumulate_into_a_step() {
    let constants = PhysicsConstants::default();
    let mut state = TimeStepState::new();
    let first = state.plan(0.01, &constants, 1.0, true, DEFAULT_DEBT_FRAMES);
    assert_eq!(
        first,
        StepPlan::Fixed {
            step: 1.0 / 60.0,
            count: 0
        }
    );
    let second = state.plan(0.01, &constants, 1.0, true, DEFAULT_DEBT_FRAMES);
    assert!(matches!(second, StepPlan::Fixed { count: 1, .. }));
}

#[test]
fn time_dilation_scales_the_fixed_step() {
    let constants = PhysicsConstants::default();
    let mut state = TimeStepState::new();
    match state.plan(0.1, &constants, 0.5, true, DEFAULT_DEBT_FRAMES) {
        StepPlan::Fixed { step, count } => {
            assert!((step - 0.5 / 60.0).abs() < 1e-7);
            assert_eq!(count, constants.max_substeps);
        }
        other => panic!("unexpected plan {other:?}"),
    }
}

#[test]
fn variable_step_runs_once() {
    let constants = PhysicsConstants::default();
    let mut state = TimeStepState::new();
    let plan = state.plan(0.02, &constants, 1.0, false, DEFAULT_DEBT_FRAMES);
    assert_eq!(plan.steps().collect::<Vec<_>>(), vec![0.02]);
}
