//! Level scoring
//!
//! All readouts (rate, accuracy, score) are derived from plain counters.

use serde::{Deserialize, Serialize};

use crate::settings::AttritionPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreTracker {
    /// Template bases the level started with
    initial_tokens: usize,
    /// Level speed (advance period, ms); smaller is faster
    speed: u32,
    points_per_match: u64,
    attrition: AttritionPolicy,

    elapsed_ticks: u64,
    attempts: u32,
    correct: u32,
    wrong: u32,
    /// Template bases that rolled off unmatched
    missed: u32,
    /// Misses on bases with no wrong attempt against them
    fresh_misses: u32,
}

impl ScoreTracker {
    pub fn new(
        initial_tokens: usize,
        speed: u32,
        points_per_match: u64,
        attrition: AttritionPolicy,
    ) -> Self {
        Self {
            initial_tokens,
            speed: speed.max(1),
            points_per_match,
            attrition,
            elapsed_ticks: 0,
            attempts: 0,
            correct: 0,
            wrong: 0,
            missed: 0,
            fresh_misses: 0,
        }
    }

    /// One score clock period elapsed
    pub fn tick(&mut self) {
        self.elapsed_ticks += 1;
    }

    pub fn record_outcome(&mut self, correct: bool) {
        self.attempts += 1;
        if correct {
            self.correct += 1;
        } else {
            self.wrong += 1;
        }
    }

    /// A template base left the strand without being matched
    ///
    /// `had_wrong` marks a base already charged by a wrong attempt, so it
    /// costs accuracy at most once.
    pub fn record_miss(&mut self, had_wrong: bool) {
        self.missed += 1;
        if !had_wrong {
            self.fresh_misses += 1;
        }
    }

    pub fn elapsed_ticks(&self) -> u64 {
        self.elapsed_ticks
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn correct(&self) -> u32 {
        self.correct
    }

    pub fn wrong(&self) -> u32 {
        self.wrong
    }

    pub fn missed(&self) -> u32 {
        self.missed
    }

    pub fn initial_tokens(&self) -> usize {
        self.initial_tokens
    }

    /// Bases per minute the level can feed, capped by its length
    pub fn rate(&self) -> u32 {
        let base_rate = 1000 / self.speed;
        base_rate.min(self.initial_tokens.min(u32::MAX as usize) as u32)
    }

    /// Percentage of the template not lost to wrong matches (or misses, by policy)
    ///
    /// Floors at 0; an empty level is 100% accurate.
    pub fn accuracy(&self) -> u32 {
        if self.initial_tokens == 0 {
            return 100;
        }
        let mut penalties = self.wrong as f64;
        if self.attrition.penalizes() {
            penalties += self.fresh_misses as f64;
        }
        let initial = self.initial_tokens as f64;
        (((initial - penalties) / initial) * 100.0).round().max(0.0) as u32
    }

    pub fn score(&self) -> u64 {
        self.correct as u64 * self.points_per_match
    }
}
