//! Utility helpers including math extensions and logging.

pub mod easing;
pub mod logging;
pub mod math;

pub use easing::EasingType;
pub use logging::ScopedTimer;
pub use math::*;
