//! Control pad
//!
//! The selectable bases the player drags into the binding pocket. On rotation
//! levels each control shows a random quarter turn after every drop and a tap
//! turns it a further 90 degrees; the rotation RNG is seeded so runs replay.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::token::Base;
use crate::error::ConveyorError;
use crate::normalize_degrees;

const QUARTER_TURNS: [f32; 4] = [0.0, 90.0, 180.0, 270.0];

/// One control button
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub base: Base,
    /// Degrees, always a quarter turn
    pub angle: f32,
}

#[derive(Debug, Clone)]
pub struct ControlPad {
    controls: Vec<Control>,
    rotate_enabled: bool,
    rng: Pcg32,
}

impl ControlPad {
    pub fn new(bases: &[Base], rotate_enabled: bool, seed: u64) -> Result<Self, ConveyorError> {
        if bases.is_empty() {
            return Err(ConveyorError::EmptyControls);
        }
        let mut pad = Self {
            controls: bases.iter().map(|&base| Control { base, angle: 0.0 }).collect(),
            rotate_enabled,
            rng: Pcg32::seed_from_u64(seed),
        };
        pad.shuffle();
        Ok(pad)
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn get(&self, index: usize) -> Option<Control> {
        self.controls.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    pub fn rotate_enabled(&self) -> bool {
        self.rotate_enabled
    }

    /// Tap: quarter turn clockwise (rotation levels only)
    pub fn rotate(&mut self, index: usize) -> Option<f32> {
        if !self.rotate_enabled {
            return None;
        }
        let control = self.controls.get_mut(index)?;
        control.angle = normalize_degrees(control.angle + 90.0);
        Some(control.angle)
    }

    /// Give every control a random quarter turn (rotation levels only)
    pub fn shuffle(&mut self) {
        if !self.rotate_enabled {
            return;
        }
        for control in &mut self.controls {
            control.angle = QUARTER_TURNS[self.rng.random_range(0..QUARTER_TURNS.len())];
        }
    }
}
