//! Multiplexer layout: which sessions are visible and how.
//!
//! At most two sessions are visible at once (single or side-by-side
//! split). Everything else stays connected in the background; layout
//! changes never touch connections or buffers, but they do re-issue
//! the current display area so a promoted session sheds its stale
//! geometry immediately.

use tracing::debug;

use ptymux_core::error::{Error, Result};
use ptymux_core::protocol::SessionId;

use crate::manager::SessionManager;

/// Which sessions occupy the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// One session fills the display.
    Single(SessionId),
    /// Two sessions side by side.
    Split(SessionId, SessionId),
}

/// Tracks the visible-session layout.
#[derive(Debug, Default)]
pub struct Multiplexer {
    mode: Option<LayoutMode>,
    /// Last display area seen, in character cells.
    area: Option<(u16, u16)>,
}

impl Multiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Option<LayoutMode> {
        self.mode
    }

    /// Show one session full-screen.
    ///
    /// The session is told the current display area right away.
    pub fn show_single(&mut self, manager: &mut SessionManager, id: SessionId) {
        debug!(%id, "layout: single");
        self.mode = Some(LayoutMode::Single(id));
        self.reissue_geometry(manager);
    }

    /// Show two distinct sessions side by side.
    ///
    /// Both sides are told their half of the current display area.
    pub fn show_split(
        &mut self,
        manager: &mut SessionManager,
        left: SessionId,
        right: SessionId,
    ) -> Result<()> {
        if left == right {
            return Err(Error::InvalidState {
                expected: "two distinct sessions".into(),
                actual: "the same session twice".into(),
            });
        }
        debug!(%left, %right, "layout: split");
        self.mode = Some(LayoutMode::Split(left, right));
        self.reissue_geometry(manager);
        Ok(())
    }

    /// Visible session ids, left to right.
    pub fn visible(&self) -> Vec<SessionId> {
        match self.mode {
            None => Vec::new(),
            Some(LayoutMode::Single(id)) => vec![id],
            Some(LayoutMode::Split(left, right)) => vec![left, right],
        }
    }

    pub fn is_visible(&self, id: SessionId) -> bool {
        self.visible().contains(&id)
    }

    /// Remove a closed session from the layout.
    ///
    /// A split collapses to the surviving session, which takes over
    /// the whole display area; a single clears.
    pub fn handle_closed(&mut self, manager: &mut SessionManager, id: SessionId) {
        self.mode = match self.mode {
            Some(LayoutMode::Single(shown)) if shown == id => None,
            Some(LayoutMode::Split(left, right)) if left == id => Some(LayoutMode::Single(right)),
            Some(LayoutMode::Split(left, right)) if right == id => Some(LayoutMode::Single(left)),
            other => other,
        };
        self.reissue_geometry(manager);
    }

    /// Route a display resize to the visible sessions only.
    ///
    /// A split gives each side half the columns; background sessions
    /// keep their geometry until they next become visible.
    pub fn resize_visible(&mut self, manager: &mut SessionManager, cols: u16, rows: u16) {
        self.area = Some((cols, rows));
        self.reissue_geometry(manager);
    }

    /// Push the current display area at the visible sessions.
    fn reissue_geometry(&self, manager: &mut SessionManager) {
        let Some((cols, rows)) = self.area else {
            return;
        };
        match self.mode {
            None => {}
            Some(LayoutMode::Single(id)) => {
                if let Some(session) = manager.session_mut(id) {
                    let _ = session.resize(cols, rows);
                }
            }
            Some(LayoutMode::Split(left, right)) => {
                let half = (cols / 2).max(1);
                for id in [left, right] {
                    if let Some(session) = manager.session_mut(id) {
                        let _ = session.resize(half, rows);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use ptymux_core::transport::Dialer;
    use ptymux_test_utils::MockPtyService;

    fn mgr() -> SessionManager {
        let service = Arc::new(MockPtyService::new());
        SessionManager::headless("proj-1", service as Arc<dyn Dialer>)
    }

    #[test]
    fn starts_empty() {
        let mux = Multiplexer::new();
        assert!(mux.visible().is_empty());
        assert_eq!(mux.mode(), None);
    }

    #[test]
    fn single_shows_one_session() {
        let mut manager = mgr();
        let mut mux = Multiplexer::new();
        let a = SessionId::new();
        mux.show_single(&mut manager, a);
        assert_eq!(mux.visible(), vec![a]);
        assert!(mux.is_visible(a));
    }

    #[test]
    fn split_shows_two_sessions() {
        let mut manager = mgr();
        let mut mux = Multiplexer::new();
        let (a, b) = (SessionId::new(), SessionId::new());
        mux.show_split(&mut manager, a, b).unwrap();
        assert_eq!(mux.visible(), vec![a, b]);
    }

    #[test]
    fn split_rejects_duplicate_session() {
        let mut manager = mgr();
        let mut mux = Multiplexer::new();
        let a = SessionId::new();
        assert!(matches!(
            mux.show_split(&mut manager, a, a),
            Err(Error::InvalidState { .. })
        ));
        // Layout unchanged on error
        assert_eq!(mux.mode(), None);
    }

    #[test]
    fn closed_session_collapses_split() {
        let mut manager = mgr();
        let mut mux = Multiplexer::new();
        let (a, b) = (SessionId::new(), SessionId::new());
        mux.show_split(&mut manager, a, b).unwrap();

        mux.handle_closed(&mut manager, a);
        assert_eq!(mux.mode(), Some(LayoutMode::Single(b)));

        mux.handle_closed(&mut manager, b);
        assert_eq!(mux.mode(), None);
    }

    #[test]
    fn closing_background_session_leaves_layout() {
        let mut manager = mgr();
        let mut mux = Multiplexer::new();
        let (a, b, c) = (SessionId::new(), SessionId::new(), SessionId::new());
        mux.show_split(&mut manager, a, b).unwrap();

        mux.handle_closed(&mut manager, c);
        assert_eq!(mux.mode(), Some(LayoutMode::Split(a, b)));
    }

    #[test]
    fn switching_modes_replaces_layout() {
        let mut manager = mgr();
        let mut mux = Multiplexer::new();
        let (a, b) = (SessionId::new(), SessionId::new());
        mux.show_split(&mut manager, a, b).unwrap();
        mux.show_single(&mut manager, b);
        assert_eq!(mux.visible(), vec![b]);
    }
}
