//! Protocol and configuration constants for ptymux.

use std::time::Duration;

// =============================================================================
// Protocol Constants
// =============================================================================

/// Current protocol version.
pub const PROTOCOL_VERSION: u32 = 1;

/// Maximum frame payload size (16 MiB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Maximum terminal columns.
pub const MAX_TERMINAL_COLS: u16 = 500;

/// Maximum terminal rows.
pub const MAX_TERMINAL_ROWS: u16 = 200;

// =============================================================================
// Timing Constants
// =============================================================================

/// Fixed delay between reconnection attempts.
///
/// Constant interval rather than exponential backoff: the endpoint is
/// a single user-owned PTY service, and reattach latency matters more
/// than connection-storm protection.
pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// Interval between heartbeat frames on an open connection.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Timeout for a single connect + handshake attempt.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Capacity Constants
// =============================================================================

/// Maximum retained scrollback lines per session.
pub const SCROLLBACK_CAP: usize = 10_000;

/// Maximum retained command history entries per session.
pub const COMMAND_HISTORY_CAP: usize = 1_000;

/// Maximum outbound chunks queued while disconnected before dropping oldest.
pub const MAX_PENDING_OUTBOUND: usize = 512;

/// Maximum sessions visible at once in the multiplexer.
pub const MAX_VISIBLE_SESSIONS: usize = 2;

// =============================================================================
// Default Values
// =============================================================================

/// Default terminal columns.
pub const DEFAULT_COLS: u16 = 80;

/// Default terminal rows.
pub const DEFAULT_ROWS: u16 = 24;

/// Minimum display font size.
pub const MIN_FONT_SIZE: u8 = 10;

/// Maximum display font size.
pub const MAX_FONT_SIZE: u8 = 20;

/// Default display font size.
pub const DEFAULT_FONT_SIZE: u8 = 13;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_constants_are_ordered() {
        assert!(RECONNECT_INTERVAL < HEARTBEAT_INTERVAL);
        assert!(CONNECT_TIMEOUT > RECONNECT_INTERVAL);
    }

    #[test]
    fn font_bounds_are_sane() {
        assert!(MIN_FONT_SIZE < MAX_FONT_SIZE);
        assert!(DEFAULT_FONT_SIZE >= MIN_FONT_SIZE);
        assert!(DEFAULT_FONT_SIZE <= MAX_FONT_SIZE);
    }

    #[test]
    fn default_size_within_limits() {
        assert!(DEFAULT_COLS <= MAX_TERMINAL_COLS);
        assert!(DEFAULT_ROWS <= MAX_TERMINAL_ROWS);
    }

    #[test]
    fn capacity_constants_are_positive() {
        assert!(SCROLLBACK_CAP > 0);
        assert!(COMMAND_HISTORY_CAP > 0);
        assert!(MAX_PENDING_OUTBOUND > 0);
    }
}
