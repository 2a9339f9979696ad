// ABOUTME: Application state and the client lifecycle owning one controller/transport pair
// Applies controller effects to the surface and the wire on the single control task

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::app::events::{AppEvent, SCROLL_STEP};
use crate::config::RelayConfig;
use crate::relay::{
    encode, ConnectionId, ConnectionStatus, Effect, Geometry, Message, SessionController,
    SessionState, TransportChannel, TransportEvent, UserAction,
};
use crate::surface::{EmulatorSurface, SurfaceAdapter};

/// What the toolbar shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    pub connection: ConnectionStatus,
    pub session: SessionState,
    /// Latest note from the relay, e.g. why a start failed
    pub notice: Option<String>,
    pub endpoint: String,
    pub should_quit: bool,
}

impl AppState {
    /// Label of the single session button
    pub const fn session_button_label(&self) -> &'static str {
        if self.session.is_active() {
            "Stop Session"
        } else {
            "Start Session"
        }
    }

    /// The session button only does something while connected
    pub fn session_button_enabled(&self) -> bool {
        self.connection == ConnectionStatus::Connected
    }
}

pub struct App {
    pub state: AppState,

    endpoint: Url,
    adapter: SurfaceAdapter<EmulatorSurface>,
    controller: SessionController,

    /// The current connection, if any
    transport: Option<TransportChannel>,
    next_id: ConnectionId,

    /// Handed to every transport; the receiving end belongs to the event loop
    events_tx: mpsc::UnboundedSender<TransportEvent>,
}

impl App {
    /// `terminal_size` is the full size of the host terminal
    pub fn new(
        config: &RelayConfig,
        endpoint: Url,
        terminal_size: Geometry,
        events_tx: mpsc::UnboundedSender<TransportEvent>,
    ) -> Self {
        let mut adapter = SurfaceAdapter::new(EmulatorSurface::new(config.default_geometry()));
        let available = SurfaceAdapter::<EmulatorSurface>::layout_area(terminal_size);
        if available.cols > 0 && available.rows > 0 {
            adapter.refit(available);
        }
        adapter
            .surface_mut()
            .set_title(session_title(SessionState::Inactive));

        Self {
            state: AppState {
                endpoint: endpoint.to_string(),
                ..AppState::default()
            },
            endpoint,
            adapter,
            controller: SessionController::new(),
            transport: None,
            next_id: ConnectionId::first(),
            events_tx,
        }
    }

    pub const fn adapter(&self) -> &SurfaceAdapter<EmulatorSurface> {
        &self.adapter
    }

    pub const fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn current_connection(&self) -> Option<ConnectionId> {
        self.transport.as_ref().map(TransportChannel::id)
    }

    /// Open a new connection and make it the current one
    pub fn connect(&mut self) {
        let id = self.next_id;
        self.next_id = id.next();

        self.controller.adopt(id);
        self.sync_state();
        self.transport = Some(TransportChannel::connect(
            id,
            self.endpoint.clone(),
            self.events_tx.clone(),
        ));
    }

    /// Replace the current controller/transport pair with a fresh one
    pub async fn reconnect(&mut self) {
        info!("Reconnecting to {}", self.endpoint);
        self.disconnect().await;
        self.state.notice = None;
        self.connect();
    }

    /// Release the current connection before closing it, so nothing it still
    /// emits can touch state
    pub async fn disconnect(&mut self) {
        self.controller.release();
        self.sync_state();
        if let Some(transport) = self.transport.take() {
            transport.close().await;
        }
    }

    pub async fn shutdown(&mut self) {
        info!("Shutting down relay client");
        self.disconnect().await;
    }

    pub async fn handle_transport_event(&mut self, event: TransportEvent) {
        let effects = self.controller.handle_channel(event.id, event.kind);
        self.apply(effects).await;
    }

    pub async fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Quit => {
                self.state.should_quit = true;
            }
            AppEvent::ToggleSession => {
                let geometry = self.adapter.geometry();
                self.dispatch(UserAction::Toggle(geometry)).await;
            }
            AppEvent::Reconnect => self.reconnect().await,
            AppEvent::ScrollUp => self.adapter.surface_mut().scroll_up(SCROLL_STEP),
            AppEvent::ScrollDown => self.adapter.surface_mut().scroll_down(SCROLL_STEP),
            AppEvent::Key(key) => {
                if let Some(data) = self.adapter.key_to_input(key) {
                    self.dispatch(UserAction::Keystroke(data)).await;
                }
            }
            AppEvent::Paste(text) => {
                if let Some(data) = self.adapter.paste_to_input(&text) {
                    self.dispatch(UserAction::Keystroke(data)).await;
                }
            }
            AppEvent::Resize(terminal_size) => {
                let available = SurfaceAdapter::<EmulatorSurface>::layout_area(terminal_size);
                let geometry = self.adapter.refit(available);
                self.dispatch(UserAction::Resize(geometry)).await;
            }
        }
    }

    async fn dispatch(&mut self, action: UserAction) {
        let effects = self.controller.handle_user(action);
        self.apply(effects).await;
    }

    async fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send(message) => self.send(&message).await,
                Effect::Render(payload) => self.adapter.render_output(&payload),
                Effect::Notice(note) => self.state.notice = Some(note),
                Effect::StatusChanged(status) => {
                    info!("Connection status: {}", status);
                    self.state.connection = status;
                }
                Effect::SessionChanged(session) => {
                    info!("Session state: {:?}", session);
                    self.state.session = session;
                    self.adapter.surface_mut().set_title(session_title(session));
                }
            }
        }
        debug!("State after effects: {:?}", self.controller.state());
    }

    async fn send(&self, message: &Message) {
        let Some(transport) = &self.transport else {
            warn!("No transport for '{}' message", message.kind());
            return;
        };
        match encode(message) {
            Ok(frame) => {
                transport.send(frame).await;
            }
            Err(e) => error!("Dropping '{}' message: {}", message.kind(), e),
        }
    }

    fn sync_state(&mut self) {
        let state = self.controller.state();
        self.state.connection = state.connection;
        self.state.session = state.session;
        self.adapter
            .surface_mut()
            .set_title(session_title(state.session));
    }
}

const fn session_title(session: SessionState) -> &'static str {
    if session.is_active() {
        "Session (running)"
    } else {
        "Session"
    }
}
