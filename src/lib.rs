//! Sequencing conveyor - the base-pairing matching game core
//!
//! Core modules:
//! - `sim`: Deterministic conveyor simulation (tokens, pairing, easing, lanes, scoring)
//! - `render`: Renderer capability the core drives, plus a headless implementation
//! - `session`: Explicit level context wiring settings, scheduler and renderer together
//! - `level`: Level configuration loading
//! - `settings`: Data-driven tuning

pub mod error;
pub mod level;
pub mod render;
pub mod session;
pub mod settings;
pub mod sim;

pub use error::ConveyorError;
pub use level::{LevelConfig, LevelPack};
pub use render::{DrawableHandle, HeadlessRenderer, Renderer};
pub use session::Session;
pub use settings::{AttritionPolicy, Settings};
pub use sim::{ConveyorEvent, LevelSummary, SequenceConveyor, Submission};

use glam::Vec2;

/// Lane geometry on the 360 x 740 logical canvas
pub mod consts {
    use glam::Vec2;

    /// Horizontal input row the template strand enters on
    pub const STRAND_ROW_START: Vec2 = Vec2::new(0.0, 140.0);
    pub const STRAND_ROW_END: Vec2 = Vec2::new(175.0, 140.0);
    /// Windows (logical bases) that fit on the input row
    pub const STRAND_ROW_WINDOWS: usize = 13;

    /// Complement preview row, just above the input row
    pub const COMPLEMENT_ROW_START: Vec2 = Vec2::new(0.0, 126.0);
    pub const COMPLEMENT_ROW_END: Vec2 = Vec2::new(363.461_54, 126.0);
    pub const COMPLEMENT_ROW_WINDOWS: usize = 27;

    /// Merge curve carrying the strand down into the binding pocket
    pub const STRAND_CURVE_START: Vec2 = Vec2::new(182.0, 147.0);
    pub const STRAND_CURVE_C1: Vec2 = Vec2::new(25.0, 640.0);
    pub const STRAND_CURVE_C2: Vec2 = Vec2::new(320.0, 320.0);
    pub const STRAND_CURVE_END: Vec2 = Vec2::new(15.0, 440.0);
    /// The curve is sampled over 8 windows, only the first 6 are used
    pub const STRAND_CURVE_SAMPLED_WINDOWS: usize = 8;
    pub const STRAND_CURVE_WINDOWS: usize = 6;

    /// Output merge curve leaving the binding pocket
    pub const OUTPUT_CURVE_START: Vec2 = Vec2::new(245.0, 450.0);
    pub const OUTPUT_CURVE_C1: Vec2 = Vec2::new(145.0, 710.0);
    pub const OUTPUT_CURVE_C2: Vec2 = Vec2::new(180.0, 600.0);
    pub const OUTPUT_CURVE_END: Vec2 = Vec2::new(100.0, 700.0);
    pub const OUTPUT_CURVE_WINDOWS: usize = 5;
    /// Leading output curve points skipped by queued output tokens
    pub const OUTPUT_CURVE_SKIP: usize = 2;

    /// Output row the finished strand drifts along
    pub const OUTPUT_ROW_START: Vec2 = Vec2::new(155.0, 710.0);
    pub const OUTPUT_ROW_END: Vec2 = Vec2::new(400.0, 710.0);
    pub const OUTPUT_ROW_WINDOWS: usize = 30;
}

/// Normalize an angle in degrees to [0, 360)
#[inline]
pub fn normalize_degrees(angle: f32) -> f32 {
    let a = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if a >= 360.0 { 0.0 } else { a }
}

/// Linear blend between two scalars
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Largest per-axis distance between two points
#[inline]
pub fn axis_gap(a: Vec2, b: Vec2) -> f32 {
    let d = (a - b).abs();
    d.x.max(d.y)
}
