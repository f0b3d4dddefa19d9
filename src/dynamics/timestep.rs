//! Adaptive time stepping: fixed sub-steps with bounded time debt, or one
//! clamped variable step.

use crate::config::PhysicsConstants;

/// How a frame's elapsed time is turned into integration steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepPlan {
    /// Nothing to integrate this frame.
    Skip,
    /// `count` steps of exactly `step` seconds. `count` may be zero while debt builds up.
    Fixed { step: f32, count: u32 },
    /// One step of `step` seconds.
    Variable { step: f32 },
}

impl StepPlan {
    /// Step sizes to run, in order.
    pub fn steps(&self) -> impl Iterator<Item = f32> {
        let (step, count) = match *self {
            StepPlan::Skip => (0.0, 0),
            StepPlan::Fixed { step, count } => (step, count),
            StepPlan::Variable { step } => (step, 1),
        };
        std::iter::repeat(step).take(count as usize)
    }
}

/// Elapsed time cached by `update` and the debt carried between frames.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeStepState {
    next_delta: f32,
    time_debt: f32,
}

impl TimeStepState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds frame time to be consumed by the next evaluation.
    pub fn accumulate(&mut self, delta_time: f32) {
        self.next_delta += delta_time.max(0.0);
    }

    /// Returns the accumulated elapsed time and clears it.
    pub fn take_delta(&mut self) -> f32 {
        std::mem::take(&mut self.next_delta)
    }

    pub fn pending_delta(&self) -> f32 {
        self.next_delta
    }

    pub fn time_debt(&self) -> f32 {
        self.time_debt
    }

    pub fn reset(&mut self) {
        self.next_delta = 0.0;
        self.time_debt = 0.0;
    }

    /// Upper bound of the time debt: `debt_frames` nominal frames.
    pub fn max_debt(constants: &PhysicsConstants, debt_frames: u32) -> f32 {
        debt_frames as f32 * constants.max_substep_delta_time
    }

    /// Plans the steps for `elapsed` seconds. Only fixed sub-stepping touches the debt.
    pub fn plan(
        &mut self,
        elapsed: f32,
        constants: &PhysicsConstants,
        time_dilation: f32,
        fixed_substeps: bool,
        debt_frames: u32,
    ) -> StepPlan {
        if elapsed <= constants.min_delta_time {
            return StepPlan::Skip;
        }

        if !fixed_substeps {
            let step = elapsed.min(constants.max_physics_delta_time);
            return if step > 0.0 {
                StepPlan::Variable { step }
            } else {
                StepPlan::Skip
            };
        }

        let step = (constants.max_substep_delta_time * time_dilation)
            .min(constants.max_physics_delta_time);
        if step <= 0.0 {
            return StepPlan::Skip;
        }

        let available = elapsed + self.time_debt;
        let count = ((available / step).floor().max(0.0) as u32).min(constants.max_substeps);
        let remaining = available - count as f32 * step;
        self.time_debt = remaining.clamp(0.0, Self::max_debt(constants, debt_frames));

        StepPlan::Fixed { step, count }
    }
}
