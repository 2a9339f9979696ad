// ABOUTME: Terminal surface the relayed session renders into, and its adapter
// The surface is a collaborator; the adapter is what the rest of the client talks to

pub mod adapter;
pub mod emulator;
pub mod keys;

pub use adapter::{SurfaceAdapter, TOOLBAR_HEIGHT};
pub use emulator::{EmulatorSurface, EmulatorView};
pub use keys::encode_key;

use crate::relay::protocol::Geometry;

/// A rendering surface that accepts terminal output and has a size
pub trait TerminalSurface {
    /// Render output bytes at the cursor
    fn write(&mut self, data: &str);

    /// Current columns and rows
    fn geometry(&self) -> Geometry;

    /// Recompute the size for the available area, returning the new geometry
    fn fit(&mut self, available: Geometry) -> Geometry;
}
