//! Lane position tables
//!
//! Every queue index maps to a fixed point on screen. The tables are built
//! once per conveyor from the lane paths; advancing the conveyor only changes
//! which index a token sits at.
//!
//! Strand and complement tables are stored pocket-first (index 0 is the slot
//! about to roll off); output tables are stored newest-first.

use glam::Vec2;

use super::path::{Path, PathQuantizer};
use super::token::DisplayMode;
use crate::consts::*;
use crate::lerp;
use crate::settings::Settings;

/// Scale of compact tokens on the straight rows
pub const ROW_SCALE: f32 = 1.0;

/// Where and how a token sits at a given queue index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Vec2,
    pub scale: f32,
    pub display: DisplayMode,
}

#[derive(Debug, Clone)]
pub struct LaneLayout {
    quantization_factor: usize,
    strand_curve: Vec<Vec2>,
    strand_row: Vec<Vec2>,
    complement_row: Vec<Vec2>,
    output_curve: Vec<Vec2>,
    output_row: Vec<Vec2>,
    strand_scale: (f32, f32),
    output_scale: (f32, f32),
}

impl LaneLayout {
    /// Quantize every lane for the given settings
    pub fn build(settings: &Settings) -> Self {
        let q = settings.quantization_factor.max(1);
        let quantizer = PathQuantizer::default();

        let mut strand_row =
            quantizer.quantize(&Path::line(STRAND_ROW_START, STRAND_ROW_END), STRAND_ROW_WINDOWS * q);
        strand_row.reverse();

        let mut complement_row = quantizer.quantize(
            &Path::line(COMPLEMENT_ROW_START, COMPLEMENT_ROW_END),
            COMPLEMENT_ROW_WINDOWS * q,
        );
        complement_row.reverse();

        let strand_path = Path::cubic(
            STRAND_CURVE_START,
            STRAND_CURVE_C1,
            STRAND_CURVE_C2,
            STRAND_CURVE_END,
        );
        let mut strand_curve = quantizer.quantize(&strand_path, STRAND_CURVE_SAMPLED_WINDOWS * q);
        strand_curve.truncate(STRAND_CURVE_WINDOWS * q);
        strand_curve.reverse();

        let output_path = Path::cubic(
            OUTPUT_CURVE_START,
            OUTPUT_CURVE_C1,
            OUTPUT_CURVE_C2,
            OUTPUT_CURVE_END,
        );
        let output_curve = quantizer.quantize(&output_path, OUTPUT_CURVE_WINDOWS * q);
        let output_row =
            quantizer.quantize(&Path::line(OUTPUT_ROW_START, OUTPUT_ROW_END), OUTPUT_ROW_WINDOWS * q);

        log::debug!(
            "Lane tables: strand {}+{}, complement {}, output {}+{}",
            strand_curve.len(),
            strand_row.len(),
            complement_row.len(),
            output_curve.len(),
            output_row.len()
        );

        Self {
            quantization_factor: q,
            strand_curve,
            strand_row,
            complement_row,
            output_curve,
            output_row,
            strand_scale: settings.strand_scale,
            output_scale: settings.output_scale,
        }
    }

    /// Strand slots that have a position (curve then row)
    pub fn strand_capacity(&self) -> usize {
        self.strand_curve.len() + self.strand_row.len()
    }

    pub fn complement_capacity(&self) -> usize {
        self.complement_row.len()
    }

    /// Placement of strand index `i`, `None` when still off screen
    pub fn strand_slot(&self, i: usize) -> Option<Placement> {
        if let Some(&position) = self.strand_curve.get(i) {
            let t = i as f32 / self.strand_curve.len() as f32;
            return Some(Placement {
                position,
                scale: lerp(self.strand_scale.0, self.strand_scale.1, t),
                display: DisplayMode::Expanded,
            });
        }
        self.strand_row
            .get(i - self.strand_curve.len())
            .map(|&position| Placement {
                position,
                scale: ROW_SCALE,
                display: DisplayMode::Compact,
            })
    }

    pub fn complement_slot(&self, i: usize) -> Option<Placement> {
        self.complement_row.get(i).map(|&position| Placement {
            position,
            scale: ROW_SCALE,
            display: DisplayMode::Compact,
        })
    }

    /// Output slots that have a position (curve then row)
    pub fn output_capacity(&self) -> usize {
        self.output_curve.len().saturating_sub(OUTPUT_CURVE_SKIP) + self.output_row.len()
    }

    /// Placement of the output token `i` slots back from the newest end
    pub fn output_slot(&self, i: usize) -> Option<Placement> {
        let queued = self.output_curve.get(OUTPUT_CURVE_SKIP..).unwrap_or(&[]);
        if let Some(&position) = queued.get(i) {
            let t = i as f32 / queued.len() as f32;
            return Some(Placement {
                position,
                scale: lerp(self.output_scale.0, self.output_scale.1, t),
                display: DisplayMode::Expanded,
            });
        }
        self.output_row
            .get(i - queued.len())
            .map(|&position| Placement {
                position,
                scale: ROW_SCALE,
                display: DisplayMode::Compact,
            })
    }

    fn output_curve_point(&self, windows: usize) -> Vec2 {
        let idx = (windows * self.quantization_factor).min(self.output_curve.len().saturating_sub(1));
        self.output_curve.get(idx).copied().unwrap_or(OUTPUT_CURVE_START)
    }

    /// Where a dropped candidate appears (the pocket exit)
    pub fn candidate_start(&self) -> Vec2 {
        self.output_curve_point(0)
    }

    /// Where a candidate pauses while it is judged
    pub fn candidate_hold(&self) -> Vec2 {
        self.output_curve_point(1)
    }

    /// Where an accepted candidate settles into the output
    pub fn candidate_settle(&self) -> Vec2 {
        self.output_curve_point(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(q: usize) -> LaneLayout {
        let settings = Settings {
            quantization_factor: q,
            ..Settings::default()
        };
        LaneLayout::build(&settings)
    }

    #[test]
    fn test_table_sizes_follow_quantization() {
        let lanes = layout(4);
        assert_eq!(lanes.strand_capacity(), (STRAND_CURVE_WINDOWS + STRAND_ROW_WINDOWS) * 4);
        assert_eq!(lanes.complement_capacity(), COMPLEMENT_ROW_WINDOWS * 4);
    }

    #[test]
    fn test_strand_index_zero_is_pocket_end() {
        let lanes = layout(10);
        let pocket = lanes.strand_slot(0).expect("on screen");
        assert_eq!(pocket.display, DisplayMode::Expanded);
        assert!((pocket.scale - 0.3).abs() < 1e-6);

        // Scale shrinks away from the pocket
        let further = lanes.strand_slot(30).expect("on screen");
        assert!(further.scale < pocket.scale);
    }

    #[test]
    fn test_strand_row_is_compact_and_ends_at_row_start() {
        let lanes = layout(10);
        let last = lanes.strand_capacity() - 1;
        let slot = lanes.strand_slot(last).expect("on screen");
        assert_eq!(slot.display, DisplayMode::Compact);
        assert_eq!(slot.scale, ROW_SCALE);
        assert!(slot.position.distance(STRAND_ROW_START) < 1e-3);
        assert_eq!(lanes.strand_slot(last + 1), None);
    }

    #[test]
    fn test_output_runs_curve_then_row() {
        let lanes = layout(10);
        let first = lanes.output_slot(0).expect("on screen");
        assert_eq!(first.display, DisplayMode::Expanded);
        let curve_len = OUTPUT_CURVE_WINDOWS * 10 - OUTPUT_CURVE_SKIP;
        let row = lanes.output_slot(curve_len).expect("on screen");
        assert_eq!(row.display, DisplayMode::Compact);
        assert!(row.position.distance(OUTPUT_ROW_START) < 1e-3);
    }

    #[test]
    fn test_candidate_points_walk_down_the_output_curve() {
        let lanes = layout(10);
        assert!(lanes.candidate_start().distance(OUTPUT_CURVE_START) < 1e-3);
        assert_ne!(lanes.candidate_hold(), lanes.candidate_start());
        assert_ne!(lanes.candidate_settle(), lanes.candidate_hold());
    }
}
