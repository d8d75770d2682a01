//! Core types for ptymux.
//!
//! This crate contains everything shared between the orchestrator and
//! its test doubles:
//! - Wire protocol frames and codec
//! - Scrollback buffer
//! - Display settings
//! - Error taxonomy, constants, logging setup
//! - The dialer seam mock transports implement

pub mod constants;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod render;
pub mod scrollback;
pub mod settings;
pub mod transport;

pub use error::{Error, Result};
pub use logging::{LogFormat, init_logging, init_test_logging};
pub use protocol::{Endpoint, Frame, SessionId, TermSize};
pub use render::{NullSurface, RenderSurface};
pub use scrollback::{Line, ScrollbackBuffer, SearchMatch};
pub use settings::{DisplaySettings, Theme};
pub use transport::{Dialer, FrameConn};
