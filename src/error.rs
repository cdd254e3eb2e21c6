//! Error types
//!
//! Only configuration and programmer errors are errors here. Gameplay outcomes
//! (busy conveyor, empty binding pocket, wrong base) are ordinary values.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConveyorError {
    /// Unsupported display mode string
    #[error("invalid display mode: {0:?} (expected compact/rectangle or expanded/nucleotide)")]
    InvalidDisplayMode(String),

    /// Unsupported glyph style string
    #[error("invalid glyph style: {0:?} (expected basic, hbonds or backbone)")]
    InvalidGlyphStyle(String),

    /// A sequence contained something other than A, T, C or G
    #[error("invalid base {symbol:?} at position {index}")]
    InvalidSymbol { symbol: char, index: usize },

    /// A control pad needs at least one selectable base
    #[error("control pad has no bases")]
    EmptyControls,

    /// A level pack has no level at the requested index
    #[error("level pack has no level {0}")]
    MissingLevel(usize),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
