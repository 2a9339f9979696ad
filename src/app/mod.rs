// ABOUTME: Relay client application: lifecycle, state and terminal event mapping

pub mod events;
pub mod state;

pub use events::{AppEvent, EventHandler};
pub use state::{App, AppState};
