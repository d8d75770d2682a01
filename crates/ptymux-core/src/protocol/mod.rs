//! Wire protocol for client <-> PTY service traffic.
//!
//! This module provides:
//! - Frame types (handshake, data, resize, heartbeat, shutdown)
//! - Session/endpoint identifiers
//! - Length-prefixed bincode codec

mod codec;
mod types;

pub use codec::{Codec, FRAME_HEADER_LEN};
pub use types::{
    Endpoint, Frame, HelloAckPayload, HelloPayload, SessionId, TermSize,
};
