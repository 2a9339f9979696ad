// ABOUTME: Fake relay server for end-to-end tests, recording every frame the client sends
// Each accepted WebSocket becomes a RelayConnection the test can read from and write to

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use url::Url;
use webrelay::app::App;
use webrelay::relay::{decode, encode, Message, TransportEvent};

pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);
pub const QUIET_PERIOD: Duration = Duration::from_millis(200);

/// Await `future`, failing the test if it takes too long
pub async fn within<F: Future>(future: F) -> F::Output {
    timeout(STEP_TIMEOUT, future)
        .await
        .expect("step timed out")
}

enum Command {
    Send(String),
    Close,
}

pub struct FakeRelay {
    addr: SocketAddr,
    connections: mpsc::UnboundedReceiver<RelayConnection>,
}

pub struct RelayConnection {
    frames: mpsc::UnboundedReceiver<String>,
    commands: mpsc::UnboundedSender<Command>,
}

impl FakeRelay {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (connections_tx, connections) = mpsc::unbounded_channel();
        tokio::spawn(Self::serve(listener, connections_tx));
        Self { addr, connections }
    }

    pub fn endpoint(&self) -> Url {
        Url::parse(&format!("ws://{}/ws", self.addr)).unwrap()
    }

    /// Wait for the next client to complete its handshake
    pub async fn next_connection(&mut self) -> RelayConnection {
        within(self.connections.recv())
            .await
            .expect("relay stopped accepting")
    }

    async fn serve(listener: TcpListener, connections: mpsc::UnboundedSender<RelayConnection>) {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
                continue;
            };

            let (frames_tx, frames) = mpsc::unbounded_channel();
            let (commands, mut commands_rx) = mpsc::unbounded_channel();
            if connections
                .send(RelayConnection { frames, commands })
                .is_err()
            {
                break;
            }

            tokio::spawn(async move {
                let (mut sink, mut stream) = ws.split();
                loop {
                    tokio::select! {
                        command = commands_rx.recv() => match command {
                            Some(Command::Send(text)) => {
                                if sink.send(WsMessage::Text(text)).await.is_err() {
                                    break;
                                }
                            }
                            Some(Command::Close) | None => {
                                let _ = sink.send(WsMessage::Close(None)).await;
                                break;
                            }
                        },
                        incoming = stream.next() => match incoming {
                            Some(Ok(WsMessage::Text(text))) => {
                                let _ = frames_tx.send(text);
                            }
                            Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                            Some(Ok(_)) => {}
                        },
                    }
                }
            });
        }
    }
}

impl RelayConnection {
    /// Next frame the client sent, decoded
    pub async fn next_message(&mut self) -> Message {
        let frame = within(self.frames.recv())
            .await
            .expect("client connection ended");
        decode(&frame).unwrap_or_else(|e| panic!("client sent bad frame {frame:?}: {e}"))
    }

    /// Assert the client sends nothing for a short while
    pub async fn assert_quiet(&mut self) {
        match timeout(QUIET_PERIOD, self.frames.recv()).await {
            Err(_) | Ok(None) => {}
            Ok(Some(frame)) => panic!("unexpected frame from client: {frame}"),
        }
    }

    pub fn send(&self, message: &Message) {
        self.send_raw(&encode(message).unwrap());
    }

    pub fn send_raw(&self, frame: &str) {
        let _ = self.commands.send(Command::Send(frame.to_string()));
    }

    /// Close from the relay side with a close frame
    pub fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }
}

/// Feed transport events into the app until `done` holds
pub async fn pump_until(
    app: &mut App,
    events: &mut mpsc::UnboundedReceiver<TransportEvent>,
    done: impl Fn(&App) -> bool,
) {
    within(async {
        while !done(app) {
            let event = events.recv().await.expect("transport events ended");
            app.handle_transport_event(event).await;
        }
    })
    .await;
}

/// Feed exactly one transport event into the app
pub async fn pump_one(app: &mut App, events: &mut mpsc::UnboundedReceiver<TransportEvent>) {
    let event = within(events.recv())
        .await
        .expect("transport events ended");
    app.handle_transport_event(event).await;
}
