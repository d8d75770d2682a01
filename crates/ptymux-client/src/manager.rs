//! Session manager: owns every session, the active pointer, and the
//! shared display settings.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use ptymux_core::error::{Error, Result};
use ptymux_core::protocol::{Endpoint, SessionId, TermSize};
use ptymux_core::render::{NullSurface, RenderSurface};
use ptymux_core::scrollback::SearchMatch;
use ptymux_core::settings::DisplaySettings;
use ptymux_core::transport::Dialer;

use crate::session::TerminalSession;

/// Produces a render surface for each new session.
pub type SurfaceFactory = Box<dyn Fn() -> Arc<dyn RenderSurface> + Send + Sync>;

/// Owns all terminal sessions of one client.
///
/// Sessions are tracked in creation order; closing the active session
/// hands focus to the most recently created survivor.
pub struct SessionManager {
    project_id: String,
    dialer: Arc<dyn Dialer>,
    make_surface: SurfaceFactory,
    sessions: HashMap<SessionId, TerminalSession>,
    /// Creation order; drives active-session fallback.
    order: Vec<SessionId>,
    active: Option<SessionId>,
    settings: DisplaySettings,
    next_number: u64,
}

impl SessionManager {
    pub fn new(
        project_id: impl Into<String>,
        dialer: Arc<dyn Dialer>,
        make_surface: SurfaceFactory,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            dialer,
            make_surface,
            sessions: HashMap::new(),
            order: Vec::new(),
            active: None,
            settings: DisplaySettings::default(),
            next_number: 0,
        }
    }

    /// Manager whose sessions render nowhere, for headless use.
    pub fn headless(project_id: impl Into<String>, dialer: Arc<dyn Dialer>) -> Self {
        Self::new(project_id, dialer, Box::new(|| Arc::new(NullSurface)))
    }

    /// Create a new session, connecting in the background.
    ///
    /// Without an explicit name the session gets an auto-numbered
    /// "Terminal N". The first session becomes active; new surfaces
    /// immediately receive the current display settings.
    pub fn create(&mut self, name: Option<String>) -> SessionId {
        self.next_number += 1;
        let display_name = name.unwrap_or_else(|| format!("Terminal {}", self.next_number));

        let endpoint = Endpoint {
            project_id: self.project_id.clone(),
            session_id: SessionId::new(),
        };
        let surface = (self.make_surface)();
        surface.apply_settings(&self.settings);

        let session = TerminalSession::spawn(
            endpoint,
            display_name,
            TermSize::default(),
            self.dialer.clone(),
            surface,
        );
        let id = session.id();
        info!(%id, name = session.display_name(), "session created");

        self.sessions.insert(id, session);
        self.order.push(id);
        if self.active.is_none() {
            self.active = Some(id);
        }
        id
    }

    /// Close and remove a session.
    ///
    /// If it was active, focus falls back to the most recently created
    /// surviving session. Closing the last session leaves none; no
    /// replacement is auto-created.
    pub fn close(&mut self, id: SessionId) -> Result<()> {
        let mut session = self
            .sessions
            .remove(&id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
        session.close();
        self.order.retain(|&other| other != id);
        if self.active == Some(id) {
            self.active = self.order.last().copied();
            debug!(active = ?self.active.map(|a| a.to_string()), "active session changed");
        }
        Ok(())
    }

    pub fn session(&self, id: SessionId) -> Option<&TerminalSession> {
        self.sessions.get(&id)
    }

    pub fn session_mut(&mut self, id: SessionId) -> Option<&mut TerminalSession> {
        self.sessions.get_mut(&id)
    }

    /// The focused session, if any.
    pub fn active(&self) -> Option<SessionId> {
        self.active
    }

    pub fn set_active(&mut self, id: SessionId) -> Result<()> {
        if !self.sessions.contains_key(&id) {
            return Err(Error::SessionNotFound(id.to_string()));
        }
        self.active = Some(id);
        Ok(())
    }

    /// Session ids in creation order.
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Current shared display settings.
    pub fn settings(&self) -> DisplaySettings {
        self.settings
    }

    /// Store settings (clamped) and push them to every session's
    /// surface. Buffered content is untouched.
    pub fn broadcast_settings(&mut self, settings: DisplaySettings) {
        let settings = settings.clamped();
        self.settings = settings;
        for id in &self.order {
            if let Some(session) = self.sessions.get(id) {
                session.apply_settings(&settings);
            }
        }
        debug!(theme = %settings.theme, font_size = settings.font_size, "settings broadcast");
    }

    /// Search every session's scrollback.
    ///
    /// Aggregates across all sessions rather than stopping at the
    /// first hit; sessions without matches are omitted.
    pub fn search_all(
        &self,
        query: &str,
        case_sensitive: bool,
    ) -> HashMap<SessionId, Vec<SearchMatch>> {
        let mut results = HashMap::new();
        for id in &self.order {
            if let Some(session) = self.sessions.get(id) {
                let matches = session.search(query, case_sensitive);
                if !matches.is_empty() {
                    results.insert(*id, matches);
                }
            }
        }
        results
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("project_id", &self.project_id)
            .field("sessions", &self.order.len())
            .field("active", &self.active.map(|a| a.to_string()))
            .finish()
    }
}
