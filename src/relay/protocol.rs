// ABOUTME: Wire protocol for the session relay, one JSON record per WebSocket text frame
// Defines the message taxonomy plus the encode/decode pair used on both directions

use serde::{Deserialize, Serialize};

use crate::relay::error::{DecodeError, EncodeError};

// ============================================
// Geometry
// ============================================

/// Terminal column/row dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Geometry {
    pub cols: u16,
    pub rows: u16,
}

impl Geometry {
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

impl std::fmt::Display for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

// ============================================
// Message Types
// ============================================

/// Requested lifecycle change for the remote session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionAction {
    Start,
    Stop,
}

/// Session state as reported by the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Stopped,
    /// The relay could not start the process
    Error,
}

impl RunState {
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

/// One frame on the relay channel.
///
/// The `type` field is the discriminator on the wire. Fields that are not
/// part of a variant are ignored when decoding, so the relay may attach
/// extra data without breaking older clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    // Client → Relay
    Input {
        payload: String,
    },
    Resize {
        cols: u16,
        rows: u16,
    },
    Session {
        action: SessionAction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cols: Option<u16>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rows: Option<u16>,
    },

    // Relay → Client
    Output {
        payload: String,
    },
    Status {
        state: RunState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<String>,
    },
}

// ============================================
// Helper functions
// ============================================

impl Message {
    /// Create an input message
    pub fn input(payload: impl Into<String>) -> Self {
        Self::Input {
            payload: payload.into(),
        }
    }

    /// Create a resize message
    pub const fn resize(geometry: Geometry) -> Self {
        Self::Resize {
            cols: geometry.cols,
            rows: geometry.rows,
        }
    }

    /// Create a session start request carrying the current geometry
    pub const fn start(geometry: Geometry) -> Self {
        Self::Session {
            action: SessionAction::Start,
            cols: Some(geometry.cols),
            rows: Some(geometry.rows),
        }
    }

    /// Create a session stop request
    pub const fn stop() -> Self {
        Self::Session {
            action: SessionAction::Stop,
            cols: None,
            rows: None,
        }
    }

    /// Wire name of the discriminator
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Input { .. } => "input",
            Self::Resize { .. } => "resize",
            Self::Session { .. } => "session",
            Self::Output { .. } => "output",
            Self::Status { .. } => "status",
        }
    }

    /// True for messages only the client originates
    pub const fn is_client_message(&self) -> bool {
        matches!(
            self,
            Self::Input { .. } | Self::Resize { .. } | Self::Session { .. }
        )
    }
}

// ============================================
// Codec
// ============================================

/// Serialize a message into a single text frame
pub fn encode(message: &Message) -> Result<String, EncodeError> {
    Ok(serde_json::to_string(message)?)
}

/// Parse one text frame. Anything that is not a well-formed message is an error
pub fn decode(frame: &str) -> Result<Message, DecodeError> {
    Ok(serde_json::from_str(frame)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_frame_layout() {
        let frame = encode(&Message::start(Geometry::new(80, 24))).unwrap();
        assert_eq!(
            frame,
            r#"{"type":"session","action":"start","cols":80,"rows":24}"#
        );
    }

    #[test]
    fn test_stop_frame_omits_geometry() {
        let frame = encode(&Message::stop()).unwrap();
        assert_eq!(frame, r#"{"type":"session","action":"stop"}"#);
    }

    #[test]
    fn test_status_with_extra_fields() {
        let frame =
            r#"{"type":"status","payload":"Session started","state":"running","extra":1}"#;
        let message = decode(frame).unwrap();
        assert_eq!(
            message,
            Message::Status {
                state: RunState::Running,
                payload: Some("Session started".to_string()),
            }
        );
    }
}
