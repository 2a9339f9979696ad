// ABOUTME: Error types for the relay transport and message codec
// Neither is fatal to a live session; callers log and carry on

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
#[error("Failed to encode message: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
