//! Terminal session orchestrator.
//!
//! This crate wires the pieces together:
//! - [`connection`]: per-connection state machine with fixed-interval
//!   reconnect, heartbeats, and a bounded offline send queue
//! - [`session`]: scrollback, history, export, and the delivery task
//! - [`manager`]: session registry, active tracking, settings fan-out
//! - [`layout`]: single/split visibility
//! - [`dial`]: TCP implementation of the dialer seam
//!
//! Rendering is the host application's job via
//! [`RenderSurface`](ptymux_core::render::RenderSurface).

pub mod connection;
pub mod dial;
pub mod layout;
pub mod manager;
pub mod session;

pub use connection::{ConnectionState, TransportHandle};
pub use dial::TcpDialer;
pub use layout::{LayoutMode, Multiplexer};
pub use manager::{SessionManager, SurfaceFactory};
pub use session::TerminalSession;

pub use ptymux_core::render::{NullSurface, RenderSurface};
pub use ptymux_core::{DisplaySettings, Endpoint, Error, Result, SessionId, TermSize, Theme};
