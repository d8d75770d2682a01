//! Test utilities for ptymux.
//!
//! Provides an in-memory PTY service that implements the dialer seam,
//! plus a recording render surface, so orchestrator behavior can be
//! tested without a network or a real shell.

mod mock_service;
mod recording;

pub use mock_service::{MockPtyService, ServiceConn};
pub use recording::RecordingSurface;

use std::time::Duration;

/// Poll `check` until it returns true or ~1s of (possibly virtual)
/// time passes. Returns the final result of `check`.
pub async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
