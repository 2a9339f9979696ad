// ABOUTME: Adapter between the rendering surface and the session controller
// Renders relay output in order and turns surface input and layout changes into user actions

use crate::relay::protocol::Geometry;
use crate::surface::{keys, TerminalSurface};
use crossterm::event::KeyEvent;
use tracing::debug;

/// Rows taken by the toolbar above the terminal
pub const TOOLBAR_HEIGHT: u16 = 3;

/// Border cells around the terminal on each axis
const BORDER: u16 = 2;

pub struct SurfaceAdapter<S: TerminalSurface> {
    surface: S,
}

impl<S: TerminalSurface> SurfaceAdapter<S> {
    pub const fn new(surface: S) -> Self {
        Self { surface }
    }

    pub const fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Geometry the surface currently has
    pub fn geometry(&self) -> Geometry {
        self.surface.geometry()
    }

    /// Write relay output into the surface
    pub fn render_output(&mut self, payload: &str) {
        self.surface.write(payload);
    }

    /// Keystroke data for a key pressed on the surface
    pub fn key_to_input(&self, key: KeyEvent) -> Option<String> {
        keys::encode_key(key)
    }

    /// Pasted text goes to the session as a single keystroke payload
    pub fn paste_to_input(&self, text: &str) -> Option<String> {
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }

    /// Re-fit the surface to `available` and return the geometry it now has.
    /// Callers send this value, never one read before the fit.
    pub fn refit(&mut self, available: Geometry) -> Geometry {
        self.surface.fit(available);
        let geometry = self.surface.geometry();
        debug!("Surface geometry is {}", geometry);
        geometry
    }

    /// Area left for the terminal once the toolbar and borders are drawn
    pub const fn layout_area(terminal_size: Geometry) -> Geometry {
        Geometry::new(
            terminal_size.cols.saturating_sub(BORDER),
            terminal_size
                .rows
                .saturating_sub(TOOLBAR_HEIGHT)
                .saturating_sub(BORDER),
        )
    }
}
