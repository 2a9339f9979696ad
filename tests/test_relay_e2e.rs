// ABOUTME: End-to-end tests driving the relay client against a fake relay server
// Observes the frames actually put on the wire for start, resize, input and close scenarios

mod common;

use common::{pump_one, pump_until, within, FakeRelay, RelayConnection};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use webrelay::app::{App, AppEvent};
use webrelay::config::RelayConfig;
use webrelay::relay::{
    ConnectionStatus, Geometry, Message, RunState, SessionState, TransportEvent,
};

/// Terminal size whose layout area is exactly 80x24
const TERMINAL_80X24: Geometry = Geometry::new(82, 29);

struct Client {
    app: App,
    events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl Client {
    fn new(relay: &FakeRelay) -> Self {
        let (events_tx, events) = mpsc::unbounded_channel();
        let app = App::new(
            &RelayConfig::default(),
            relay.endpoint(),
            TERMINAL_80X24,
            events_tx,
        );
        Self { app, events }
    }

    async fn connect(relay: &mut FakeRelay) -> (Self, RelayConnection) {
        let mut client = Self::new(relay);
        client.app.connect();
        let connection = relay.next_connection().await;
        client.wait_for(|app| app.state.connection == ConnectionStatus::Connected).await;
        (client, connection)
    }

    async fn wait_for(&mut self, done: impl Fn(&App) -> bool) {
        pump_until(&mut self.app, &mut self.events, done).await;
    }

    async fn next_event(&mut self) {
        pump_one(&mut self.app, &mut self.events).await;
    }

    async fn press(&mut self, code: KeyCode) {
        self.app
            .handle_app_event(AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)))
            .await;
    }
}

fn status(state: RunState) -> Message {
    Message::Status {
        state,
        payload: None,
    }
}

#[tokio::test]
async fn test_start_sends_one_session_frame_and_waits_for_status() {
    let mut relay = FakeRelay::start().await;
    let (mut client, mut connection) = Client::connect(&mut relay).await;
    assert_eq!(client.app.adapter().geometry(), Geometry::new(80, 24));

    client.app.handle_app_event(AppEvent::ToggleSession).await;

    assert_eq!(
        connection.next_message().await,
        Message::start(Geometry::new(80, 24))
    );
    connection.assert_quiet().await;
    assert_eq!(client.app.state.session, SessionState::Inactive);
    assert_eq!(client.app.state.session_button_label(), "Start Session");

    connection.send(&status(RunState::Running));
    client.next_event().await;
    assert_eq!(client.app.state.session, SessionState::Active);
    assert_eq!(client.app.state.session_button_label(), "Stop Session");

    // The same control now stops the session
    client.app.handle_app_event(AppEvent::ToggleSession).await;
    assert_eq!(connection.next_message().await, Message::stop());
    assert_eq!(client.app.state.session, SessionState::Active);

    connection.send(&Message::Status {
        state: RunState::Stopped,
        payload: Some("Session stopped".to_string()),
    });
    client.next_event().await;
    assert_eq!(client.app.state.session, SessionState::Inactive);
    assert_eq!(client.app.state.notice.as_deref(), Some("Session stopped"));
}

#[tokio::test]
async fn test_resize_sends_post_fit_geometry() {
    let mut relay = FakeRelay::start().await;
    let (mut client, mut connection) = Client::connect(&mut relay).await;

    client
        .app
        .handle_app_event(AppEvent::Resize(Geometry::new(102, 35)))
        .await;

    assert_eq!(client.app.adapter().geometry(), Geometry::new(100, 30));
    assert_eq!(
        connection.next_message().await,
        Message::resize(Geometry::new(100, 30))
    );
    connection.assert_quiet().await;

    // A later start carries the new geometry
    client.app.handle_app_event(AppEvent::ToggleSession).await;
    assert_eq!(
        connection.next_message().await,
        Message::start(Geometry::new(100, 30))
    );
}

#[tokio::test]
async fn test_close_before_status_leaves_session_inactive() {
    let mut relay = FakeRelay::start().await;
    let (mut client, mut connection) = Client::connect(&mut relay).await;

    client.app.handle_app_event(AppEvent::ToggleSession).await;
    assert_eq!(
        connection.next_message().await,
        Message::start(Geometry::new(80, 24))
    );

    connection.close();
    client
        .wait_for(|app| app.state.connection == ConnectionStatus::Disconnected)
        .await;

    assert_eq!(client.app.state.session, SessionState::Inactive);
    assert_eq!(
        client.app.controller().connection_status(),
        ConnectionStatus::Disconnected
    );
}

#[tokio::test]
async fn test_nothing_reaches_the_wire_before_connected() {
    let mut relay = FakeRelay::start().await;
    let mut client = Client::new(&relay);
    client.app.connect();

    // The handshake may finish, but the client has not observed it yet
    client.press(KeyCode::Char('a')).await;
    client.app.handle_app_event(AppEvent::ToggleSession).await;
    client
        .app
        .handle_app_event(AppEvent::Resize(Geometry::new(102, 35)))
        .await;

    let mut connection = relay.next_connection().await;
    client
        .wait_for(|app| app.state.connection == ConnectionStatus::Connected)
        .await;

    client.press(KeyCode::Char('b')).await;
    assert_eq!(connection.next_message().await, Message::input("b"));
    connection.assert_quiet().await;
}

#[tokio::test]
async fn test_input_flows_both_ways_in_order() {
    let mut relay = FakeRelay::start().await;
    let (mut client, mut connection) = Client::connect(&mut relay).await;

    // Input is allowed before any running status
    for c in ['l', 's'] {
        client.press(KeyCode::Char(c)).await;
    }
    client.press(KeyCode::Enter).await;
    client
        .app
        .handle_app_event(AppEvent::Paste("echo pasted".to_string()))
        .await;

    for expected in ["l", "s", "\r", "echo pasted"] {
        assert_eq!(connection.next_message().await, Message::input(expected));
    }

    for chunk in ["file-a\r\n", "file-b\r\n", "$ "] {
        connection.send(&Message::Output {
            payload: chunk.to_string(),
        });
    }
    for _ in 0..3 {
        client.next_event().await;
    }

    let contents = client.app.adapter().surface().contents();
    assert!(
        contents.starts_with("file-a\nfile-b\n$"),
        "contents: {contents:?}"
    );
}

#[tokio::test]
async fn test_malformed_frames_are_ignored() {
    let mut relay = FakeRelay::start().await;
    let (mut client, connection) = Client::connect(&mut relay).await;
    let before = client.app.state.clone();

    for frame in ["garbage", r#"{"type":"status"}"#, r#"{"type":"mystery"}"#] {
        connection.send_raw(frame);
        client.next_event().await;
        assert_eq!(client.app.state, before);
    }

    // The session keeps working afterwards
    connection.send(&status(RunState::Running));
    client.next_event().await;
    assert_eq!(client.app.state.session, SessionState::Active);
}

#[tokio::test]
async fn test_reconnect_ignores_stale_connection() {
    let mut relay = FakeRelay::start().await;
    let (mut client, old_connection) = Client::connect(&mut relay).await;
    let old_id = client.app.current_connection();

    // Queued but not yet handled when the reconnect happens
    old_connection.send(&status(RunState::Running));
    tokio::time::sleep(common::QUIET_PERIOD).await;

    client.app.handle_app_event(AppEvent::Reconnect).await;
    assert_ne!(client.app.current_connection(), old_id);
    assert_eq!(client.app.state.connection, ConnectionStatus::Disconnected);

    let mut new_connection = relay.next_connection().await;
    client
        .wait_for(|app| app.state.connection == ConnectionStatus::Connected)
        .await;
    assert_eq!(client.app.state.session, SessionState::Inactive);

    client.press(KeyCode::Char('x')).await;
    assert_eq!(new_connection.next_message().await, Message::input("x"));
}

#[tokio::test]
async fn test_shutdown_closes_connection() {
    let mut relay = FakeRelay::start().await;
    let (mut client, mut connection) = Client::connect(&mut relay).await;

    within(client.app.shutdown()).await;
    assert_eq!(client.app.current_connection(), None);
    assert_eq!(client.app.state.connection, ConnectionStatus::Disconnected);

    // Keys after shutdown go nowhere
    client.press(KeyCode::Char('z')).await;
    connection.assert_quiet().await;
}
