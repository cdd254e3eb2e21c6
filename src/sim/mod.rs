//! Deterministic conveyor simulation
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Virtual time only (jobs pulled from a `Timeline`)
//! - Seeded RNG only
//! - Stable iteration order (queue index, then token ID)
//! - No rendering or platform dependencies beyond the `Renderer` trait

pub mod controls;
pub mod conveyor;
pub mod interp;
pub mod lanes;
pub mod pairing;
pub mod path;
pub mod schedule;
pub mod score;
pub mod token;

pub use controls::{Control, ControlPad};
pub use conveyor::{
    ConveyorEvent, ConveyorState, LevelSummary, RejectReason, SequenceConveyor, Submission,
};
pub use interp::{Approach, Interpolator, Step, Tween, approach, approach_with};
pub use lanes::{LaneLayout, Placement};
pub use pairing::{
    MatchValidator, PairingSet, Verdict, is_valid_orientation, is_valid_pair, valid_match_of,
};
pub use path::{Path, PathQuantizer, Segment};
pub use schedule::{Job, Scheduler, TimerHandle, Timeline};
pub use score::ScoreTracker;
pub use token::{Base, Classification, DisplayMode, GlyphStyle, Token, TokenFlags, TokenId};
