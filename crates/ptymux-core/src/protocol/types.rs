//! Frame types for the ptymux wire protocol.
//!
//! The protocol is deliberately thin: after the connect handshake the
//! stream carries raw shell bytes in both directions, plus resize and
//! heartbeat control frames. Terminal escape sequences inside Data
//! payloads pass through untouched.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_COLS, DEFAULT_ROWS, MAX_TERMINAL_COLS, MAX_TERMINAL_ROWS};

// =============================================================================
// Identifiers
// =============================================================================

/// Stable identifier for a logical terminal session.
///
/// Generated client-side, reused across reconnects so the PTY service
/// can reattach the same remote shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub [u8; 16]);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new() -> Self {
        let mut bytes = [0u8; 16];
        getrandom::fill(&mut bytes).expect("failed to generate random session ID");
        Self(bytes)
    }

    /// Create a session ID from bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Get the bytes of this session ID.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display first 8 bytes as hex for brevity
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Address of a remote PTY endpoint: which project, which session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Project the shell runs in.
    pub project_id: String,
    /// Logical session to attach (or create) at the service.
    pub session_id: SessionId,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.project_id, self.session_id)
    }
}

// =============================================================================
// Terminal Geometry
// =============================================================================

/// Terminal size in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermSize {
    pub cols: u16,
    pub rows: u16,
}

impl TermSize {
    /// Create a size clamped to protocol maxima (and at least 1x1).
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols: cols.clamp(1, MAX_TERMINAL_COLS),
            rows: rows.clamp(1, MAX_TERMINAL_ROWS),
        }
    }
}

impl Default for TermSize {
    fn default() -> Self {
        Self {
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
        }
    }
}

// =============================================================================
// Frames
// =============================================================================

/// Top-level protocol frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Frame {
    /// Client hello identifying the endpoint to attach.
    Hello(HelloPayload),
    /// Service acknowledgment of hello.
    HelloAck(HelloAckPayload),
    /// Raw shell bytes, either direction.
    Data(Vec<u8>),
    /// PTY size update, client to service.
    Resize { cols: u16, rows: u16 },
    /// Keepalive, either direction. The service echoes the sequence back.
    Heartbeat { seq: u64 },
    /// Orderly close notice from the service.
    Shutdown { message: Option<String> },
}

/// Client hello payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Protocol version (must be 1).
    pub protocol_version: u32,
    /// Project the shell runs in.
    pub project_id: String,
    /// Logical session to attach; reused across reconnects.
    pub session_id: SessionId,
    /// Requested terminal size.
    pub term_size: TermSize,
}

/// Service hello acknowledgment payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelloAckPayload {
    /// Protocol version the service speaks.
    pub protocol_version: u32,
    /// Whether the attach was accepted.
    pub accepted: bool,
    /// Reason when rejected.
    pub reject_reason: Option<String>,
}
