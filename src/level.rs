//! Level configuration
//!
//! Levels are plain JSON records. The camelCase keys used by the level
//! packs shipped with the web build (`ntSequence`, `rotateNT`, `ntType`) are
//! accepted as aliases.

use serde::{Deserialize, Serialize};

use crate::error::ConveyorError;
use crate::settings::Settings;
use crate::sim::{Base, GlyphStyle};

fn default_speed() -> u32 {
    20
}

/// One playable level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub name: String,
    /// Template strand, a string over A, T, C, G
    #[serde(alias = "ntSequence")]
    pub sequence: String,
    /// Advance period in ms; smaller is faster
    #[serde(default = "default_speed")]
    pub speed: u32,
    /// Selectable bases; the settings default is used when absent
    pub controls: Option<Vec<Base>>,
    /// Controls are rotated and drops must be upright or upside down
    #[serde(alias = "rotateNT")]
    pub rotate_enabled: bool,
    #[serde(alias = "ntType")]
    pub glyph: GlyphStyle,
    pub unlocked: bool,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            sequence: String::new(),
            speed: default_speed(),
            controls: None,
            rotate_enabled: false,
            glyph: GlyphStyle::Basic,
            unlocked: true,
        }
    }
}

impl LevelConfig {
    /// Built-in level used when nothing else is loaded
    pub fn demo() -> Self {
        Self {
            name: "Demo".to_string(),
            sequence: "ATATATATATATATATAGCGCGCGCGCGCGC".to_string(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConveyorError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parsed template strand
    pub fn bases(&self) -> Result<Vec<Base>, ConveyorError> {
        Base::parse_sequence(&self.sequence)
    }

    /// Speed to run at, falling back when the level gives 0
    pub fn speed_or(&self, fallback: u32) -> u32 {
        if self.speed == 0 { fallback } else { self.speed }
    }

    /// Bases on the control pad
    pub fn control_bases(&self, settings: &Settings) -> Vec<Base> {
        match &self.controls {
            Some(controls) if !controls.is_empty() => controls.clone(),
            _ => settings.default_controls.clone(),
        }
    }
}

/// An ordered list of levels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelPack {
    pub levels: Vec<LevelConfig>,
}

impl LevelPack {
    pub fn from_json(json: &str) -> Result<Self, ConveyorError> {
        let pack: LevelPack = serde_json::from_str(json)?;
        log::debug!("Parsed level pack with {} levels", pack.levels.len());
        Ok(pack)
    }

    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConveyorError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let pack = Self::from_json(&json)?;
        log::info!("Loaded {} levels from {}", pack.levels.len(), path.as_ref().display());
        Ok(pack)
    }

    pub fn get(&self, index: usize) -> Option<&LevelConfig> {
        self.levels.get(index)
    }

    /// Levels the player may start
    pub fn unlocked(&self) -> impl Iterator<Item = &LevelConfig> {
        self.levels.iter().filter(|l| l.unlocked)
    }
}
