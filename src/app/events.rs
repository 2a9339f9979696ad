// ABOUTME: Event handling system mapping terminal events to relay client actions

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::relay::protocol::Geometry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Quit,
    ToggleSession,
    Reconnect,
    ScrollUp,
    ScrollDown,
    /// Key for the session, encoded by the surface adapter
    Key(KeyEvent),
    Paste(String),
    /// New full terminal size
    Resize(Geometry),
}

/// Lines moved per scroll key press
pub const SCROLL_STEP: usize = 10;

pub struct EventHandler;

impl EventHandler {
    pub fn handle_terminal_event(event: Event) -> Option<AppEvent> {
        match event {
            Event::Key(key_event) => Self::handle_key_event(key_event),
            Event::Paste(text) => Some(AppEvent::Paste(text)),
            Event::Resize(cols, rows) => Some(AppEvent::Resize(Geometry::new(cols, rows))),
            _ => None,
        }
    }

    pub fn handle_key_event(key_event: KeyEvent) -> Option<AppEvent> {
        if key_event.kind == KeyEventKind::Release {
            return None;
        }

        // Client controls live on keys a shell rarely needs
        match (key_event.code, key_event.modifiers) {
            (KeyCode::F(2), KeyModifiers::NONE) => return Some(AppEvent::ToggleSession),
            (KeyCode::F(5), KeyModifiers::NONE) => return Some(AppEvent::Reconnect),
            (KeyCode::F(10), KeyModifiers::NONE) => return Some(AppEvent::Quit),
            (KeyCode::PageUp, KeyModifiers::SHIFT) => return Some(AppEvent::ScrollUp),
            (KeyCode::PageDown, KeyModifiers::SHIFT) => return Some(AppEvent::ScrollDown),
            _ => {}
        }

        Some(AppEvent::Key(key_event))
    }
}
