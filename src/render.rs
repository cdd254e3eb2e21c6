//! Renderer capability
//!
//! The core never draws. Tokens push their display state through this trait
//! during the presentation pass; the adapter behind it owns whatever actually
//! ends up on screen (sprites, rectangles, letter overlays).

use std::collections::HashMap;

use glam::Vec2;

use crate::sim::{DisplayMode, TokenFlags};

/// Opaque handle to a drawable owned by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrawableHandle(pub u64);

pub trait Renderer {
    /// Create a hidden drawable of the given kind
    fn create_drawable(&mut self, kind: DisplayMode, asset: &str) -> DrawableHandle;
    fn set_position(&mut self, handle: DrawableHandle, pos: Vec2);
    fn set_scale(&mut self, handle: DrawableHandle, scale: f32);
    /// Angle in degrees
    fn set_angle(&mut self, handle: DrawableHandle, angle: f32);
    fn set_alpha(&mut self, handle: DrawableHandle, alpha: f32);
    fn set_visible(&mut self, handle: DrawableHandle, visible: bool);
    fn destroy(&mut self, handle: DrawableHandle);

    /// Error/missing overlays; adapters without overlays can ignore this
    fn set_flags(&mut self, _handle: DrawableHandle, _flags: TokenFlags) {}

    /// Letter overlay on expanded glyphs
    fn set_letter_visible(&mut self, _handle: DrawableHandle, _visible: bool) {}
}

/// Last known state of a headless drawable
#[derive(Debug, Clone, PartialEq)]
pub struct DrawableState {
    pub kind: DisplayMode,
    pub asset: String,
    pub pos: Vec2,
    pub scale: f32,
    pub angle: f32,
    pub alpha: f32,
    pub visible: bool,
    pub flags: TokenFlags,
    pub letter: bool,
}

/// In-memory renderer: keeps every live drawable in a map
///
/// Used by the native runner and by tests to verify that the core releases
/// everything it creates.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    drawables: HashMap<DrawableHandle, DrawableState>,
    next_handle: u64,
    created: u64,
    destroyed: u64,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: DrawableHandle) -> Option<&DrawableState> {
        self.drawables.get(&handle)
    }

    /// Drawables created and not yet destroyed
    pub fn live_count(&self) -> usize {
        self.drawables.len()
    }

    pub fn visible_count(&self) -> usize {
        self.drawables.values().filter(|d| d.visible).count()
    }

    pub fn created_count(&self) -> u64 {
        self.created
    }

    pub fn destroyed_count(&self) -> u64 {
        self.destroyed
    }

    fn with(&mut self, handle: DrawableHandle, f: impl FnOnce(&mut DrawableState)) {
        match self.drawables.get_mut(&handle) {
            Some(state) => f(state),
            None => log::warn!("Update for unknown drawable {:?}", handle),
        }
    }
}

impl Renderer for HeadlessRenderer {
    fn create_drawable(&mut self, kind: DisplayMode, asset: &str) -> DrawableHandle {
        self.next_handle += 1;
        self.created += 1;
        let handle = DrawableHandle(self.next_handle);
        log::trace!("create {:?} {:?} ({})", handle, kind, asset);
        self.drawables.insert(
            handle,
            DrawableState {
                kind,
                asset: asset.to_string(),
                pos: Vec2::ZERO,
                scale: 1.0,
                angle: 0.0,
                alpha: 1.0,
                visible: false,
                flags: TokenFlags::default(),
                letter: false,
            },
        );
        handle
    }

    fn set_position(&mut self, handle: DrawableHandle, pos: Vec2) {
        self.with(handle, |d| d.pos = pos);
    }

    fn set_scale(&mut self, handle: DrawableHandle, scale: f32) {
        self.with(handle, |d| d.scale = scale);
    }

    fn set_angle(&mut self, handle: DrawableHandle, angle: f32) {
        self.with(handle, |d| d.angle = angle);
    }

    fn set_alpha(&mut self, handle: DrawableHandle, alpha: f32) {
        self.with(handle, |d| d.alpha = alpha);
    }

    fn set_visible(&mut self, handle: DrawableHandle, visible: bool) {
        self.with(handle, |d| d.visible = visible);
    }

    fn destroy(&mut self, handle: DrawableHandle) {
        if self.drawables.remove(&handle).is_some() {
            self.destroyed += 1;
            log::trace!("destroy {:?}", handle);
        } else {
            log::warn!("Destroy of unknown drawable {:?}", handle);
        }
    }

    fn set_flags(&mut self, handle: DrawableHandle, flags: TokenFlags) {
        self.with(handle, |d| d.flags = flags);
    }

    fn set_letter_visible(&mut self, handle: DrawableHandle, visible: bool) {
        self.with(handle, |d| d.letter = visible);
    }
}
