// ABOUTME: Session controller state machine for connection and remote session status
// Pure transitions that return the new state plus the side effects the caller must perform

use crate::relay::protocol::{self, Geometry, Message};
use crate::relay::transport::{ChannelEvent, ConnectionId};
use tracing::{debug, info, warn};

// ============================================
// State
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected,
    Error,
}

impl ConnectionStatus {
    /// Name shown by the status indicator
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the relay has confirmed a running session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Inactive,
    Active,
}

impl SessionState {
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerState {
    pub connection: ConnectionStatus,
    pub session: SessionState,
}

// ============================================
// Events and Effects
// ============================================

/// Things the user can ask for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    Start(Geometry),
    Stop,
    /// Start when inactive, stop when active
    Toggle(Geometry),
    Keystroke(String),
    Resize(Geometry),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    Channel(ChannelEvent),
    User(UserAction),
}

/// Work the caller performs after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Encode and send on the current channel
    Send(Message),
    /// Write output into the terminal surface
    Render(String),
    /// Human readable note from the relay
    Notice(String),
    StatusChanged(ConnectionStatus),
    SessionChanged(SessionState),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: ControllerState,
    pub effects: Vec<Effect>,
}

impl Transition {
    const fn unchanged(state: ControllerState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }
}

impl ControllerState {
    /// Compute the state that follows `event`. Does no I/O.
    pub fn step(self, event: ControllerEvent) -> Transition {
        match event {
            ControllerEvent::Channel(event) => self.on_channel(event),
            ControllerEvent::User(action) => self.on_user(action),
        }
    }

    fn on_channel(self, event: ChannelEvent) -> Transition {
        match event {
            ChannelEvent::Opened => self.with(ConnectionStatus::Connected, self.session),
            // A dropped connection cannot have a live session from our side
            ChannelEvent::Closed => {
                self.with(ConnectionStatus::Disconnected, SessionState::Inactive)
            }
            ChannelEvent::Errored(reason) => {
                warn!("Relay channel error: {}", reason);
                self.with(ConnectionStatus::Error, self.session)
            }
            ChannelEvent::Frame(frame) => self.on_frame(&frame),
        }
    }

    fn on_frame(self, frame: &str) -> Transition {
        let message = match protocol::decode(frame) {
            Ok(message) => message,
            Err(e) => {
                warn!("Ignoring frame: {}", e);
                return Transition::unchanged(self);
            }
        };

        match message {
            Message::Output { payload } => Transition {
                state: self,
                effects: vec![Effect::Render(payload)],
            },
            Message::Status { state, payload } => {
                let session = if state.is_running() {
                    SessionState::Active
                } else {
                    SessionState::Inactive
                };
                let mut transition = self.with(self.connection, session);
                if let Some(note) = payload {
                    info!("Relay status {:?}: {}", state, note);
                    transition.effects.push(Effect::Notice(note));
                }
                transition
            }
            other => {
                debug!("Ignoring client-side '{}' message from relay", other.kind());
                Transition::unchanged(self)
            }
        }
    }

    fn on_user(self, action: UserAction) -> Transition {
        if self.connection != ConnectionStatus::Connected {
            debug!("Not connected, dropping {:?}", action);
            return Transition::unchanged(self);
        }

        let message = match action {
            UserAction::Start(geometry) => Message::start(geometry),
            UserAction::Stop => Message::stop(),
            UserAction::Toggle(geometry) => {
                if self.session.is_active() {
                    Message::stop()
                } else {
                    Message::start(geometry)
                }
            }
            UserAction::Keystroke(data) => Message::input(data),
            UserAction::Resize(geometry) => Message::resize(geometry),
        };

        // Session state waits for the relay's status reply
        Transition {
            state: self,
            effects: vec![Effect::Send(message)],
        }
    }

    /// Move to `(connection, session)`, reporting whichever values changed
    fn with(self, connection: ConnectionStatus, session: SessionState) -> Transition {
        let mut effects = Vec::new();
        if connection != self.connection {
            effects.push(Effect::StatusChanged(connection));
        }
        if session != self.session {
            effects.push(Effect::SessionChanged(session));
        }
        Transition {
            state: Self {
                connection,
                session,
            },
            effects,
        }
    }
}

// ============================================
// Controller
// ============================================

/// Owns the controller state and the identity of the current connection.
///
/// Channel events are only applied when they come from the current
/// connection; anything from a superseded or released connection is a no-op.
#[derive(Debug, Default)]
pub struct SessionController {
    state: ControllerState,
    current: Option<ConnectionId>,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `id` the current connection, starting again from the initial state
    pub fn adopt(&mut self, id: ConnectionId) {
        if let Some(previous) = self.current {
            debug!("Connection {} supersedes {}", id, previous);
        }
        self.current = Some(id);
        self.state = ControllerState::default();
    }

    /// Stop accepting events from any connection
    pub fn release(&mut self) {
        if let Some(id) = self.current.take() {
            debug!("Released connection {}", id);
        }
        self.state = ControllerState::default();
    }

    pub const fn current(&self) -> Option<ConnectionId> {
        self.current
    }

    pub const fn state(&self) -> ControllerState {
        self.state
    }

    pub const fn connection_status(&self) -> ConnectionStatus {
        self.state.connection
    }

    pub const fn session_state(&self) -> SessionState {
        self.state.session
    }

    pub fn handle_channel(&mut self, id: ConnectionId, event: ChannelEvent) -> Vec<Effect> {
        if self.current != Some(id) {
            debug!("Discarding {:?} from stale connection {}", event, id);
            return Vec::new();
        }
        self.apply(ControllerEvent::Channel(event))
    }

    pub fn handle_user(&mut self, action: UserAction) -> Vec<Effect> {
        self.apply(ControllerEvent::User(action))
    }

    fn apply(&mut self, event: ControllerEvent) -> Vec<Effect> {
        let Transition { state, effects } = self.state.step(event);
        self.state = state;
        effects
    }
}
