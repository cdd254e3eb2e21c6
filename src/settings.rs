//! Tuning and preferences
//!
//! Every gameplay constant the conveyor uses lives here so levels can be
//! rebalanced from JSON without touching code.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::ConveyorError;
use crate::sim::Base;

/// What happens when a template base rolls off the front unmatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttritionPolicy {
    /// A missed base costs accuracy exactly like a wrong match
    #[default]
    CountAsWrong,
    /// Missed bases are tallied but do not affect accuracy
    Ignore,
}

impl AttritionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttritionPolicy::CountAsWrong => "count_as_wrong",
            AttritionPolicy::Ignore => "ignore",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "count_as_wrong" | "wrong" => Some(AttritionPolicy::CountAsWrong),
            "ignore" | "none" => Some(AttritionPolicy::Ignore),
            _ => None,
        }
    }

    /// Whether misses are charged against accuracy
    pub fn penalizes(&self) -> bool {
        matches!(self, AttritionPolicy::CountAsWrong)
    }
}

/// Easing cadences and convergence thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationTuning {
    /// Animation frame period (ms); every tween period is stepped on this grid
    pub frame_ms: u32,
    pub position_period_ms: u32,
    /// Per-axis snap distance (px)
    pub position_epsilon: f32,
    pub scale_period_ms: u32,
    pub scale_epsilon: f32,
    pub fade_period_ms: u32,
    /// Alpha below which a fading token is hidden
    pub fade_threshold: f32,
    /// Fraction of alpha kept per fade step
    pub fade_retain: f32,
}

impl Default for AnimationTuning {
    fn default() -> Self {
        Self {
            frame_ms: 20,
            position_period_ms: 20,
            position_epsilon: 1.0,
            scale_period_ms: 40,
            scale_epsilon: 0.001,
            fade_period_ms: 40,
            fade_threshold: 0.01,
            fade_retain: 1.0 / 1.5,
        }
    }
}

/// Conveyor and scoring tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Conveyor ===
    /// Path slots per logical base
    pub quantization_factor: usize,
    /// Empty windows leading the complement preview
    pub complement_lead_windows: usize,
    /// Delay between level load and the conveyor starting (ms)
    pub start_delay_ms: u32,
    /// Fallback advance period when a level gives no usable speed (ms)
    pub default_speed: u32,

    // === Animation ===
    pub animation: AnimationTuning,
    /// Slide applied to tokens leaving the strand
    pub evict_offset: Vec2,
    /// Scale of a freshly dropped candidate
    pub candidate_scale: f32,
    /// Strand merge curve scale, binding pocket end to row end
    pub strand_scale: (f32, f32),
    /// Output merge curve scale, pocket end to row end
    pub output_scale: (f32, f32),

    // === Scoring ===
    pub points_per_match: u64,
    /// Score clock period (ms)
    pub score_tick_ms: u32,
    pub attrition: AttritionPolicy,

    // === Controls ===
    /// Control pad used when a level does not list its own
    pub default_controls: Vec<Base>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quantization_factor: 60,
            complement_lead_windows: 8,
            start_delay_ms: 5000,
            default_speed: 20,

            animation: AnimationTuning::default(),
            evict_offset: Vec2::new(-40.0, 130.0),
            candidate_scale: 0.3,
            strand_scale: (0.3, 0.05),
            output_scale: (0.2, 0.07),

            points_per_match: 100,
            score_tick_ms: 1000,
            attrition: AttritionPolicy::CountAsWrong,

            default_controls: vec![Base::T, Base::A, Base::G, Base::C],
        }
    }
}

impl Settings {
    /// Parse settings from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ConveyorError> {
        let settings: Settings = serde_json::from_str(json)?;
        Ok(settings.sanitized())
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConveyorError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Clamp values that would stall the tick loop
    pub fn sanitized(mut self) -> Self {
        if self.quantization_factor == 0 {
            log::warn!("quantization_factor 0 is not usable, using 1");
            self.quantization_factor = 1;
        }
        let anim = &mut self.animation;
        anim.frame_ms = anim.frame_ms.max(1);
        anim.position_period_ms = anim.position_period_ms.max(1);
        anim.scale_period_ms = anim.scale_period_ms.max(1);
        anim.fade_period_ms = anim.fade_period_ms.max(1);
        if !(anim.fade_retain > 0.0 && anim.fade_retain < 1.0) {
            log::warn!("fade_retain {} outside (0, 1), using default", anim.fade_retain);
            anim.fade_retain = AnimationTuning::default().fade_retain;
        }
        self.default_speed = self.default_speed.max(1);
        self.score_tick_ms = self.score_tick_ms.max(1);
        self
    }
}
