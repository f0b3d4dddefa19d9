//! Easing curves mapping a normalized alpha onto a shaped alpha.

use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI};

/// Shape of an interpolation over `[0, 1]`.
///
/// Every curve maps 0 to 0 and 1 to 1 and is monotonic in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingType {
    #[default]
    Linear,
    SinusoidalIn,
    SinusoidalOut,
    SinusoidalInOut,
    /// Quarter circle, slow start.
    CircularIn,
    CircularOut,
    CircularInOut,
}

impl EasingType {
    /// Eased value of `alpha`, clamped to `[0, 1]` first.
    pub fn apply(self, alpha: f32) -> f32 {
        let t = alpha.clamp(0.0, 1.0);
        match self {
            EasingType::Linear => t,
            EasingType::SinusoidalIn => 1.0 - (t * FRAC_PI_2).cos(),
            EasingType::SinusoidalOut => (t * FRAC_PI_2).sin(),
            EasingType::SinusoidalInOut => 0.5 * (1.0 - (t * PI).cos()),
            EasingType::CircularIn => 1.0 - (1.0 - t * t).max(0.0).sqrt(),
            EasingType::CircularOut => (1.0 - (t - 1.0) * (t - 1.0)).max(0.0).sqrt(),
            EasingType::CircularInOut => {
                if t < 0.5 {
                    let u = 2.0 * t;
                    0.5 * (1.0 - (1.0 - u * u).max(0.0).sqrt())
                } else {
                    let u = 2.0 * t - 2.0;
                    0.5 * ((1.0 - u * u).max(0.0).sqrt() + 1.0)
                }
            }
        }
    }

    /// Interpolates from `a` to `b` along this curve.
    pub fn ease(self, a: f32, b: f32, alpha: f32) -> f32 {
        a + (b - a) * self.apply(alpha)
    }
}
