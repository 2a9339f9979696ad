// ABOUTME: WebSocket transport owning exactly one connection to the relay endpoint
// Delivers lifecycle and frame events tagged with the connection identity that produced them

use crate::relay::error::TransportError;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite};
use tracing::{debug, error, info, trace, warn};
use url::Url;

/// How long `close` waits for the I/O task before aborting it
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Identity of one logical connection.
///
/// Every event a channel emits carries the id it was created with, so a
/// consumer can tell a late event from a superseded connection apart from
/// one belonging to the current connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub const fn first() -> Self {
        Self(1)
    }

    /// The id that supersedes this one
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle and data events raised by a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Opened,
    Frame(String),
    Closed,
    Errored(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    pub id: ConnectionId,
    pub kind: ChannelEvent,
}

/// Ready state of the underlying socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
}

/// Why the connection handler returned without an error
enum Exit {
    /// Remote close frame or end of stream
    Remote,
    /// `close` was called or the channel was dropped
    Local,
}

pub struct TransportChannel {
    id: ConnectionId,

    /// Relay endpoint this channel is bound to
    endpoint: Url,

    /// Socket ready state, written only by the I/O task
    state: Arc<RwLock<ChannelState>>,

    /// Frames accepted by `send`, drained by the I/O task in order
    outgoing: mpsc::UnboundedSender<String>,

    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TransportChannel {
    /// Start connecting to `endpoint`. Returns immediately; the handshake runs
    /// on a spawned task and its outcome arrives as `Opened` or `Errored`.
    pub fn connect(
        id: ConnectionId,
        endpoint: Url,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Self {
        info!("Opening relay connection {} to {}", id, endpoint);

        let state = Arc::new(RwLock::new(ChannelState::Connecting));
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(Self::run(
            id,
            endpoint.clone(),
            state.clone(),
            outgoing_rx,
            shutdown_rx,
            events,
        ));

        Self {
            id,
            endpoint,
            state,
            outgoing,
            shutdown: Some(shutdown),
            handle: Some(handle),
        }
    }

    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn state(&self) -> ChannelState {
        *self.state.read().await
    }

    /// Send one frame. Frames offered while the socket is not open are
    /// dropped, never queued. Returns whether the frame was accepted.
    pub async fn send(&self, frame: String) -> bool {
        let state = *self.state.read().await;
        if state != ChannelState::Open {
            warn!(
                "Dropping frame on connection {} in state {:?}",
                self.id, state
            );
            return false;
        }

        if self.outgoing.send(frame).is_err() {
            warn!("Connection {} I/O task is gone, frame dropped", self.id);
            return false;
        }
        true
    }

    /// Close the connection and wait for the I/O task to finish. Once this
    /// returns the channel emits no further events.
    pub async fn close(mut self) {
        info!("Closing relay connection {}", self.id);

        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }

        if let Some(mut handle) = self.handle.take() {
            if tokio::time::timeout(CLOSE_TIMEOUT, &mut handle).await.is_err() {
                warn!("Connection {} did not close in time, aborting", self.id);
                handle.abort();
                let _ = handle.await;
            }
        }
    }

    async fn run(
        id: ConnectionId,
        endpoint: Url,
        state: Arc<RwLock<ChannelState>>,
        outgoing_rx: mpsc::UnboundedReceiver<String>,
        shutdown_rx: oneshot::Receiver<()>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) {
        let emit = |kind: ChannelEvent| {
            if events.send(TransportEvent { id, kind }).is_err() {
                debug!("Event receiver for connection {} dropped", id);
            }
        };

        let result =
            Self::connection_handler(id, &endpoint, &state, outgoing_rx, shutdown_rx, &emit).await;

        *state.write().await = ChannelState::Closed;

        match result {
            Ok(Exit::Local) => {
                debug!("Connection {} closed locally", id);
            }
            Ok(Exit::Remote) => {
                info!("Connection {} closed by relay", id);
                emit(ChannelEvent::Closed);
            }
            Err(e) => {
                error!("Connection {} failed: {}", id, e);
                emit(ChannelEvent::Errored(e.to_string()));
                emit(ChannelEvent::Closed);
            }
        }
    }

    /// Handle a single WebSocket connection from handshake to close
    async fn connection_handler(
        id: ConnectionId,
        endpoint: &Url,
        state: &RwLock<ChannelState>,
        mut outgoing_rx: mpsc::UnboundedReceiver<String>,
        mut shutdown_rx: oneshot::Receiver<()>,
        emit: &impl Fn(ChannelEvent),
    ) -> Result<Exit, TransportError> {
        debug!("Attempting WebSocket handshake with {}", endpoint);

        let ws_stream = tokio::select! {
            result = connect_async(endpoint.as_str()) => {
                let (ws_stream, response) = result
                    .map_err(|e| TransportError::HandshakeFailed(e.to_string()))?;
                debug!("WebSocket response status: {:?}", response.status());
                ws_stream
            }
            _ = &mut shutdown_rx => return Ok(Exit::Local),
        };

        // Open before announcing it, so sends made in reaction to Opened are accepted
        *state.write().await = ChannelState::Open;
        info!("Connection {} open", id);
        emit(ChannelEvent::Opened);

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    *state.write().await = ChannelState::Closed;
                    if let Err(e) = ws_sender.send(tungstenite::Message::Close(None)).await {
                        debug!("Close frame not delivered on {}: {}", id, e);
                    }
                    return Ok(Exit::Local);
                }

                Some(frame) = outgoing_rx.recv() => {
                    trace!("Sending on {}: {}", id, frame);
                    ws_sender.send(tungstenite::Message::Text(frame)).await?;
                }

                incoming = ws_receiver.next() => {
                    match incoming {
                        Some(Ok(tungstenite::Message::Text(text))) => {
                            trace!("Received on {}: {}", id, text);
                            emit(ChannelEvent::Frame(text));
                        }
                        Some(Ok(tungstenite::Message::Close(frame))) => {
                            debug!("Close frame on {}: {:?}", id, frame);
                            return Ok(Exit::Remote);
                        }
                        Some(Ok(_)) => {
                            // Binary, ping and pong carry nothing for us
                        }
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(Exit::Remote),
                    }
                }
            }
        }
    }
}

impl Drop for TransportChannel {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
