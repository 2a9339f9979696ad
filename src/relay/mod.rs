// ABOUTME: Session relay core: wire protocol, WebSocket transport and the session state machine
// Frames flow transport → protocol → controller inbound, and the reverse outbound

pub mod controller;
pub mod error;
pub mod protocol;
pub mod transport;

pub use controller::{
    ConnectionStatus, ControllerEvent, ControllerState, Effect, SessionController, SessionState,
    Transition, UserAction,
};
pub use error::{DecodeError, EncodeError, TransportError};
pub use protocol::{decode, encode, Geometry, Message, RunState, SessionAction};
pub use transport::{ChannelEvent, ChannelState, ConnectionId, TransportChannel, TransportEvent};
