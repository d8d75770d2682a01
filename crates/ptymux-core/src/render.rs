//! Rendering seam.
//!
//! The orchestrator never interprets terminal bytes; it hands them to
//! a render surface supplied by the host application. The surface owns
//! escape-sequence handling, glyphs, and scroll position.

use crate::settings::DisplaySettings;

/// One session's drawable region, implemented by the host application.
///
/// Methods take `&self`; surfaces handle their own interior mutability
/// since the delivery task and the UI share them.
pub trait RenderSurface: Send + Sync {
    /// Deliver raw output bytes, escape sequences included.
    fn append_bytes(&self, bytes: &[u8]);

    /// Drop all displayed content.
    fn clear(&self);

    /// The region geometry changed.
    fn resize(&self, cols: u16, rows: u16);

    /// Plain-text rendition of what is currently displayed.
    fn visible_text(&self) -> String;

    /// Scroll so the line with the given sequence number is shown.
    fn scroll_to_line(&self, seq: u64);

    /// Display settings changed.
    fn apply_settings(&self, settings: &DisplaySettings);
}

/// Surface that discards everything, for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl RenderSurface for NullSurface {
    fn append_bytes(&self, _bytes: &[u8]) {}
    fn clear(&self) {}
    fn resize(&self, _cols: u16, _rows: u16) {}
    fn visible_text(&self) -> String {
        String::new()
    }
    fn scroll_to_line(&self, _seq: u64) {}
    fn apply_settings(&self, _settings: &DisplaySettings) {}
}
