//! Nucleotide tokens
//!
//! A token is one base on the conveyor: its identity and pairing rule never
//! change, while its display state (position, scale, angle, alpha, mode) is
//! eased around by the conveyor. A token owns at most one drawable handle; a
//! display mode change swaps the drawable instead of keeping two in sync.

use std::fmt;
use std::str::FromStr;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::interp::{Interpolator, Tween};
use super::pairing::PairingSet;
use crate::error::ConveyorError;
use crate::render::{DrawableHandle, Renderer};
use crate::settings::AnimationTuning;

/// Token identifier, unique within one conveyor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(pub u32);

/// A DNA base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Base {
    A,
    T,
    C,
    G,
}

/// Ring structure of a base (picks the error/missing overlay shape)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    Purine,
    Pyrimidine,
}

impl Base {
    pub const ALL: [Base; 4] = [Base::A, Base::T, Base::C, Base::G];

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(Base::A),
            'T' => Some(Base::T),
            'C' => Some(Base::C),
            'G' => Some(Base::G),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Base::A => 'A',
            Base::T => 'T',
            Base::C => 'C',
            Base::G => 'G',
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Base::A => "adenine",
            Base::T => "thymine",
            Base::C => "cytosine",
            Base::G => "guanine",
        }
    }

    /// Display color (0xRRGGBB)
    pub fn color(self) -> u32 {
        match self {
            Base::A => 0xf49232,
            Base::T => 0x31ace0,
            Base::C => 0xc71489,
            Base::G => 0x26b11e,
        }
    }

    pub fn classification(self) -> Classification {
        match self {
            Base::A | Base::G => Classification::Purine,
            Base::T | Base::C => Classification::Pyrimidine,
        }
    }

    pub fn pairing_set(self) -> PairingSet {
        PairingSet::for_base(self)
    }

    /// Parse a whole sequence, reporting the first bad symbol
    pub fn parse_sequence(s: &str) -> Result<Vec<Base>, ConveyorError> {
        s.chars()
            .enumerate()
            .filter(|(_, c)| !c.is_whitespace())
            .map(|(index, symbol)| {
                Base::from_char(symbol).ok_or(ConveyorError::InvalidSymbol { symbol, index })
            })
            .collect()
    }
}

impl fmt::Display for Base {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Artwork family used for expanded glyphs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlyphStyle {
    #[default]
    Basic,
    Hbonds,
    Backbone,
}

impl GlyphStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            GlyphStyle::Basic => "basic",
            GlyphStyle::Hbonds => "hbonds",
            GlyphStyle::Backbone => "backbone",
        }
    }

    /// Rotation baked into the artwork; the logical angle excludes it
    pub fn base_angle(&self, base: Base) -> f32 {
        match (self, base) {
            (GlyphStyle::Hbonds, Base::T | Base::C) => 180.0,
            _ => 0.0,
        }
    }
}

impl FromStr for GlyphStyle {
    type Err = ConveyorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(GlyphStyle::Basic),
            "hbonds" => Ok(GlyphStyle::Hbonds),
            "backbone" => Ok(GlyphStyle::Backbone),
            _ => Err(ConveyorError::InvalidGlyphStyle(s.to_string())),
        }
    }
}

/// How a token is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Small colored block (rows)
    #[default]
    Compact,
    /// Full nucleotide glyph (merge curves, pocket, controls)
    Expanded,
}

impl DisplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Compact => "compact",
            DisplayMode::Expanded => "expanded",
        }
    }
}

impl FromStr for DisplayMode {
    type Err = ConveyorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compact" | "rectangle" => Ok(DisplayMode::Compact),
            "expanded" | "nucleotide" => Ok(DisplayMode::Expanded),
            _ => Err(ConveyorError::InvalidDisplayMode(s.to_string())),
        }
    }
}

/// Overlay markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenFlags {
    /// Red backing: this token was a wrong match
    pub error: bool,
    /// Hollow center: this base is missing
    pub missing: bool,
}

/// Which eased quantity a cue is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Channel {
    Position,
    Alpha,
}

/// Follow-up the conveyor runs when an in-flight token finishes a move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cue {
    /// Accepted candidate reached the hold point: bind it into the output
    Bind,
    /// Rejected candidate reached the hold point: fade and slide back
    Return,
    /// Done animating: release the drawable and drop the token
    Discard,
}

/// One base on the conveyor
#[derive(Debug, Clone)]
pub struct Token {
    id: TokenId,
    base: Base,
    pairing: PairingSet,
    glyph: GlyphStyle,
    display: DisplayMode,
    position: Vec2,
    scale: f32,
    angle: f32,
    alpha: f32,
    visible: bool,
    flags: TokenFlags,
    show_letter: bool,

    drawable: Option<(DrawableHandle, DisplayMode)>,
    dirty: bool,

    motion: Option<Tween<Vec2>>,
    scaling: Option<Tween<f32>>,
    fading: Option<Tween<f32>>,
    cue: Option<(Channel, Cue)>,
}

impl Token {
    /// A hidden, compact token at the origin
    pub fn new(id: TokenId, base: Base, glyph: GlyphStyle) -> Self {
        Self {
            id,
            base,
            pairing: base.pairing_set(),
            glyph,
            display: DisplayMode::Compact,
            position: Vec2::ZERO,
            scale: 1.0,
            angle: 0.0,
            alpha: 1.0,
            visible: false,
            flags: TokenFlags::default(),
            show_letter: false,
            drawable: None,
            dirty: true,
            motion: None,
            scaling: None,
            fading: None,
            cue: None,
        }
    }

    pub fn id(&self) -> TokenId {
        self.id
    }

    pub fn base(&self) -> Base {
        self.base
    }

    pub fn pairing_set(&self) -> PairingSet {
        self.pairing
    }

    pub fn glyph(&self) -> GlyphStyle {
        self.glyph
    }

    pub fn display(&self) -> DisplayMode {
        self.display
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Logical rotation in degrees (artwork offset excluded)
    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn flags(&self) -> TokenFlags {
        self.flags
    }

    pub fn drawable(&self) -> Option<DrawableHandle> {
        self.drawable.map(|(h, _)| h)
    }

    /// Any eased quantity still converging
    pub fn is_animating(&self) -> bool {
        self.motion.is_some() || self.scaling.is_some() || self.fading.is_some()
    }

    /// Where the position tween is heading (current position when idle)
    pub fn destination(&self) -> Vec2 {
        self.motion.as_ref().map_or(self.position, |m| m.target())
    }

    /// Asset reference for the current display mode
    pub fn asset_ref(&self) -> String {
        match self.display {
            DisplayMode::Expanded => {
                format!("nt_{}_{}", self.base.short_name(), self.glyph.as_str())
            }
            DisplayMode::Compact => format!("#{:06x}", self.base.color()),
        }
    }

    /// Angle handed to the renderer (artwork offset included for glyphs)
    pub fn render_angle(&self) -> f32 {
        match self.display {
            DisplayMode::Expanded => self.angle + self.glyph.base_angle(self.base),
            DisplayMode::Compact => self.angle,
        }
    }

    // === Direct setters (cancel any tween on the same quantity) ===

    pub fn set_position(&mut self, pos: Vec2) {
        self.motion = None;
        self.put_position(pos);
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scaling = None;
        self.put_scale(scale);
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.fading = None;
        if self.alpha != alpha {
            self.alpha = alpha;
            self.dirty = true;
        }
    }

    pub fn set_angle(&mut self, angle: f32) {
        if self.angle != angle {
            self.angle = angle;
            self.dirty = true;
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            self.visible = visible;
            self.dirty = true;
        }
    }

    pub fn set_display(&mut self, mode: DisplayMode) {
        if self.display != mode {
            self.display = mode;
            self.dirty = true;
        }
    }

    /// Switch display mode by name; unknown names are a programmer error
    pub fn set_display_str(&mut self, mode: &str) -> Result<(), ConveyorError> {
        self.set_display(mode.parse()?);
        Ok(())
    }

    pub fn set_error(&mut self, error: bool) {
        if self.flags.error != error {
            self.flags.error = error;
            self.dirty = true;
        }
    }

    pub fn set_missing(&mut self, missing: bool) {
        if self.flags.missing != missing {
            self.flags.missing = missing;
            self.dirty = true;
        }
    }

    pub fn show_letter(&mut self, show: bool) {
        if self.show_letter != show {
            self.show_letter = show;
            self.dirty = true;
        }
    }

    fn put_position(&mut self, pos: Vec2) {
        if self.position != pos {
            self.position = pos;
            self.dirty = true;
        }
    }

    fn put_scale(&mut self, scale: f32) {
        if self.scale != scale {
            self.scale = scale;
            self.dirty = true;
        }
    }

    // === Easing ===

    /// Ease toward `target`; an in-flight move is retargeted, keeping its cadence
    pub(crate) fn glide_to(&mut self, target: Vec2, tuning: &AnimationTuning, cue: Option<Cue>) {
        match self.motion.as_mut() {
            Some(tween) => tween.retarget(target),
            None => {
                let interp = Interpolator::new(self.position, target, tuning.position_epsilon);
                self.motion = Some(Tween::new(interp, tuning.position_period_ms));
            }
        }
        if let Some(cue) = cue {
            self.cue = Some((Channel::Position, cue));
        }
    }

    /// Jump to `from` and ease toward `target`
    pub(crate) fn glide_from(
        &mut self,
        from: Vec2,
        target: Vec2,
        tuning: &AnimationTuning,
        cue: Option<Cue>,
    ) {
        self.set_position(from);
        self.glide_to(target, tuning, cue);
    }

    pub(crate) fn scale_to(&mut self, target: f32, tuning: &AnimationTuning) {
        match self.scaling.as_mut() {
            Some(tween) => tween.retarget(target),
            None => {
                let interp = Interpolator::new(self.scale, target, tuning.scale_epsilon);
                self.scaling = Some(Tween::new(interp, tuning.scale_period_ms));
            }
        }
    }

    /// Fade to nothing, then hide
    pub(crate) fn fade_out(&mut self, tuning: &AnimationTuning, cue: Option<Cue>) {
        let interp = Interpolator::new(self.alpha, 0.0, tuning.fade_threshold)
            .with_retain(tuning.fade_retain);
        self.fading = Some(Tween::new(interp, tuning.fade_period_ms));
        if let Some(cue) = cue {
            self.cue = Some((Channel::Alpha, cue));
        }
    }

    fn take_cue(&mut self, channel: Channel) -> Option<Cue> {
        match self.cue {
            Some((c, cue)) if c == channel => {
                self.cue = None;
                Some(cue)
            }
            _ => None,
        }
    }

    /// Advance every tween by one frame; returns a cue whose move just finished
    pub(crate) fn animate(&mut self, dt_ms: u32) -> Option<Cue> {
        let mut fired = None;

        if let Some(step) = self.motion.as_mut().and_then(|t| t.tick(dt_ms)) {
            self.put_position(step.value());
            if step.is_arrived() {
                self.motion = None;
                fired = fired.or(self.take_cue(Channel::Position));
            }
        }

        if let Some(step) = self.scaling.as_mut().and_then(|t| t.tick(dt_ms)) {
            self.put_scale(step.value());
            if step.is_arrived() {
                self.scaling = None;
            }
        }

        if let Some(step) = self.fading.as_mut().and_then(|t| t.tick(dt_ms)) {
            self.alpha = step.value();
            self.dirty = true;
            if step.is_arrived() {
                self.fading = None;
                self.set_visible(false);
                fired = fired.or(self.take_cue(Channel::Alpha));
            }
        }

        fired
    }

    // === Renderer bridge ===

    /// Push changed display state to the renderer
    ///
    /// Drawables are created lazily the first time a token is visible, and
    /// swapped when the display mode no longer matches the live one.
    pub(crate) fn sync(&mut self, renderer: &mut dyn Renderer) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        if self.drawable.is_none() && !self.visible {
            return;
        }

        let handle = match self.drawable {
            Some((handle, mode)) if mode == self.display => handle,
            stale => {
                if let Some((old, _)) = stale {
                    renderer.destroy(old);
                }
                let handle = renderer.create_drawable(self.display, &self.asset_ref());
                self.drawable = Some((handle, self.display));
                handle
            }
        };

        renderer.set_position(handle, self.position);
        renderer.set_scale(handle, self.scale);
        renderer.set_angle(handle, self.render_angle());
        renderer.set_alpha(handle, self.alpha);
        renderer.set_visible(handle, self.visible);
        renderer.set_flags(handle, self.flags);
        renderer.set_letter_visible(
            handle,
            self.show_letter && self.display == DisplayMode::Expanded,
        );
    }

    /// Give up the drawable handle (the caller destroys it)
    pub(crate) fn take_drawable(&mut self) -> Option<DrawableHandle> {
        self.drawable.take().map(|(h, _)| h)
    }
}
