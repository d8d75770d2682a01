//! A terminal session: scrollback, history, connection, and the
//! delivery task tying them together.
//!
//! Sessions are independent concurrency units. Each owns its
//! connection run loop and a delivery task that is the only writer to
//! the session's scrollback; search and export take the same lock, so
//! readers never observe a half-written line.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::debug;

use ptymux_core::constants::COMMAND_HISTORY_CAP;
use ptymux_core::error::{Error, Result};
use ptymux_core::protocol::{Endpoint, SessionId, TermSize};
use ptymux_core::render::RenderSurface;
use ptymux_core::scrollback::{ScrollbackBuffer, SearchMatch};
use ptymux_core::settings::DisplaySettings;
use ptymux_core::transport::Dialer;

use crate::connection::{ConnectionState, TransportHandle};

/// Acquire a mutex, recovering from poisoning.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// One terminal session attached to a remote shell.
pub struct TerminalSession {
    id: SessionId,
    display_name: String,
    endpoint: Endpoint,
    scrollback: Arc<Mutex<ScrollbackBuffer>>,
    history: VecDeque<String>,
    transport: TransportHandle,
    surface: Arc<dyn RenderSurface>,
    size: TermSize,
    closed: bool,
    delivery: tokio::task::JoinHandle<()>,
}

impl TerminalSession {
    /// Spawn a session attached to `endpoint`.
    ///
    /// Returns immediately with the connection dialing in the
    /// background. Output keeps flowing into the scrollback and the
    /// surface whether or not the session is visible.
    pub fn spawn(
        endpoint: Endpoint,
        display_name: String,
        size: TermSize,
        dialer: Arc<dyn Dialer>,
        surface: Arc<dyn RenderSurface>,
    ) -> Self {
        let scrollback = Arc::new(Mutex::new(ScrollbackBuffer::new()));
        let (output_tx, mut output_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let transport = TransportHandle::spawn(dialer, endpoint.clone(), size, output_tx);

        let delivery = tokio::spawn({
            let scrollback = scrollback.clone();
            let surface = surface.clone();
            async move {
                // Sole scrollback writer for this session.
                while let Some(bytes) = output_rx.recv().await {
                    lock(&scrollback).append(&bytes);
                    surface.append_bytes(&bytes);
                }
            }
        });

        Self {
            id: endpoint.session_id,
            display_name,
            endpoint,
            scrollback,
            history: VecDeque::new(),
            transport,
            surface,
            size,
            closed: false,
            delivery,
        }
    }

    /// Stable identifier, unchanged across reconnects.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The endpoint this session attaches to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn set_display_name(&mut self, name: impl Into<String>) {
        self.display_name = name.into();
    }

    /// Current connection state. Closed once the session is closed.
    pub fn connection_state(&self) -> ConnectionState {
        if self.closed {
            ConnectionState::Closed
        } else {
            self.transport.state()
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Submit user input.
    ///
    /// Records non-empty trimmed input in the command history and
    /// forwards the bytes as typed. While disconnected the bytes queue
    /// and flush on reconnect.
    pub fn submit_input(&mut self, text: &str) -> Result<()> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            if self.history.len() == COMMAND_HISTORY_CAP {
                self.history.pop_front();
            }
            self.history.push_back(trimmed.to_owned());
        }
        self.transport.send(text.as_bytes().to_vec());
        Ok(())
    }

    /// Forward raw bytes without history capture (arrow keys, control
    /// sequences).
    pub fn send_bytes(&self, bytes: &[u8]) -> Result<()> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        self.transport.send(bytes.to_vec());
        Ok(())
    }

    /// Resize the terminal region.
    ///
    /// Propagates to the surface and the remote PTY; the size is
    /// re-issued automatically after every reconnect.
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<()> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        self.size = TermSize::new(cols, rows);
        self.surface.resize(self.size.cols, self.size.rows);
        self.transport.resize(self.size);
        Ok(())
    }

    /// Current terminal size.
    pub fn size(&self) -> TermSize {
        self.size
    }

    /// Command history, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history.iter().cloned().collect()
    }

    /// Search retained scrollback, oldest first.
    pub fn search(&self, query: &str, case_sensitive: bool) -> Vec<SearchMatch> {
        lock(&self.scrollback).search(query, case_sensitive)
    }

    /// Number of retained scrollback lines.
    pub fn line_count(&self) -> usize {
        lock(&self.scrollback).len()
    }

    /// Full retained scrollback in creation order.
    pub fn export_content(&self) -> String {
        lock(&self.scrollback).export()
    }

    /// File name for an export artifact: sanitized session name plus
    /// timestamp, e.g. `terminal-1-2026-08-30T14-05-09.txt`.
    pub fn export_file_name(&self, now: DateTime<Utc>) -> String {
        let slug: String = self
            .display_name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect();
        format!("{}-{}.txt", slug, now.format("%Y-%m-%dT%H-%M-%S"))
    }

    /// Clear scrollback and the surface. The remote shell is untouched.
    pub fn clear(&self) {
        lock(&self.scrollback).clear();
        self.surface.clear();
    }

    /// Push display settings to this session's surface.
    pub fn apply_settings(&self, settings: &DisplaySettings) {
        self.surface.apply_settings(settings);
    }

    /// The render surface backing this session.
    pub fn surface(&self) -> &Arc<dyn RenderSurface> {
        &self.surface
    }

    /// Close the session. Idempotent; safe in any connection state,
    /// including mid-reconnect.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.transport.close();
        debug!(id = %self.id, "session closed");
        // The delivery task ends once the run loop drops its output
        // sender.
    }

    /// Wait until the connection reaches the given state.
    pub async fn wait_for_state(&self, target: ConnectionState) {
        self.transport.wait_for_state(target).await;
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        self.transport.close();
        self.delivery.abort();
    }
}

impl std::fmt::Debug for TerminalSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalSession")
            .field("id", &self.id.to_string())
            .field("display_name", &self.display_name)
            .field("state", &self.connection_state())
            .field("closed", &self.closed)
            .finish()
    }
}
