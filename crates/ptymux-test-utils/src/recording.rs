//! Render surface that records every call for assertions.

use std::sync::Mutex;

use ptymux_core::render::RenderSurface;
use ptymux_core::settings::DisplaySettings;

#[derive(Debug, Default)]
struct Recorded {
    bytes: Vec<u8>,
    clears: usize,
    resizes: Vec<(u16, u16)>,
    settings: Vec<DisplaySettings>,
    scrolls: Vec<u64>,
}

/// Records everything the orchestrator pushes at it.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    inner: Mutex<Recorded>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// All bytes appended so far, concatenated.
    pub fn bytes(&self) -> Vec<u8> {
        self.inner.lock().unwrap().bytes.clone()
    }

    /// Appended bytes, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock().unwrap().bytes).into_owned()
    }

    pub fn clear_count(&self) -> usize {
        self.inner.lock().unwrap().clears
    }

    pub fn resizes(&self) -> Vec<(u16, u16)> {
        self.inner.lock().unwrap().resizes.clone()
    }

    pub fn settings_seen(&self) -> Vec<DisplaySettings> {
        self.inner.lock().unwrap().settings.clone()
    }

    pub fn last_settings(&self) -> Option<DisplaySettings> {
        self.inner.lock().unwrap().settings.last().copied()
    }

    pub fn scrolls(&self) -> Vec<u64> {
        self.inner.lock().unwrap().scrolls.clone()
    }
}

impl RenderSurface for RecordingSurface {
    fn append_bytes(&self, bytes: &[u8]) {
        self.inner.lock().unwrap().bytes.extend_from_slice(bytes);
    }

    fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.bytes.clear();
        inner.clears += 1;
    }

    fn resize(&self, cols: u16, rows: u16) {
        self.inner.lock().unwrap().resizes.push((cols, rows));
    }

    fn visible_text(&self) -> String {
        self.text()
    }

    fn scroll_to_line(&self, seq: u64) {
        self.inner.lock().unwrap().scrolls.push(seq);
    }

    fn apply_settings(&self, settings: &DisplaySettings) {
        self.inner.lock().unwrap().settings.push(*settings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptymux_core::settings::Theme;

    #[test]
    fn records_bytes_and_clear() {
        let surface = RecordingSurface::new();
        surface.append_bytes(b"abc");
        surface.append_bytes(b"def");
        assert_eq!(surface.text(), "abcdef");

        surface.clear();
        assert_eq!(surface.clear_count(), 1);
        assert!(surface.bytes().is_empty());
    }

    #[test]
    fn records_settings_and_resizes() {
        let surface = RecordingSurface::new();
        surface.resize(80, 24);
        surface.apply_settings(&DisplaySettings::new(Theme::Light, 12));

        assert_eq!(surface.resizes(), vec![(80, 24)]);
        assert_eq!(surface.last_settings().unwrap().theme, Theme::Light);
    }
}
