//! Session lifecycle and manager behavior against the mock service.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ptymux_client::{ConnectionState, SessionManager};
use ptymux_core::init_test_logging;
use ptymux_core::protocol::SessionId;
use ptymux_core::render::RenderSurface;
use ptymux_core::settings::{DisplaySettings, Theme};
use ptymux_core::transport::Dialer;
use ptymux_test_utils::{MockPtyService, RecordingSurface, ServiceConn, eventually};

/// Manager wired to recording surfaces, exposing them in creation order.
fn recording_manager(
    service: &Arc<MockPtyService>,
) -> (SessionManager, Arc<Mutex<Vec<Arc<RecordingSurface>>>>) {
    let surfaces: Arc<Mutex<Vec<Arc<RecordingSurface>>>> = Arc::default();
    let factory = {
        let surfaces = surfaces.clone();
        Box::new(move || {
            let surface = Arc::new(RecordingSurface::new());
            surfaces.lock().unwrap().push(surface.clone());
            surface as Arc<dyn RenderSurface>
        })
    };
    let manager = SessionManager::new("proj-1", service.clone() as Arc<dyn Dialer>, factory);
    (manager, surfaces)
}

/// Accept `count` connections and key them by the session that dialed.
/// Sessions dial concurrently, so arrival order is not creation order.
async fn accept_map(service: &MockPtyService, count: usize) -> HashMap<SessionId, ServiceConn> {
    let mut map = HashMap::new();
    for _ in 0..count {
        let mut conn = service.accept().await;
        let hello = conn.expect_hello().await;
        map.insert(hello.session_id, conn);
    }
    map
}

#[tokio::test]
async fn output_flows_to_scrollback_and_surface() {
    init_test_logging();
    let service = Arc::new(MockPtyService::new());
    let (mut manager, surfaces) = recording_manager(&service);

    let id = manager.create(None);
    let mut conns = accept_map(&service, 1).await;
    let conn = conns.remove(&id).unwrap();
    manager
        .session(id)
        .unwrap()
        .wait_for_state(ConnectionState::Open)
        .await;

    conn.send_output(b"building...\ndone\n").await;

    assert!(eventually(|| manager.session(id).unwrap().line_count() == 2).await);

    let session = manager.session(id).unwrap();
    let matches = session.search("done", true);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].line_index, 1);

    assert_eq!(session.export_content(), "building...\ndone\n");
    assert_eq!(surfaces.lock().unwrap()[0].text(), "building...\ndone\n");
}

#[tokio::test]
async fn create_reports_connecting_immediately() {
    let service = Arc::new(MockPtyService::new());
    let mut manager = SessionManager::headless("proj-1", service.clone() as Arc<dyn Dialer>);

    // No await between create and the assertion: the state must be
    // Connecting before the dial task has run at all.
    let id = manager.create(None);
    assert_eq!(
        manager.session(id).unwrap().connection_state(),
        ConnectionState::Connecting
    );
}

#[tokio::test]
async fn hello_carries_project_and_session() {
    let service = Arc::new(MockPtyService::new());
    let mut manager = SessionManager::headless("proj-42", service.clone() as Arc<dyn Dialer>);

    let id = manager.create(None);
    let mut conn = service.accept().await;
    let hello = conn.expect_hello().await;

    assert_eq!(hello.project_id, "proj-42");
    assert_eq!(hello.session_id, id);
    assert_eq!(hello.term_size.cols, 80);
    assert_eq!(hello.term_size.rows, 24);
}

#[tokio::test]
async fn sessions_are_independent() {
    init_test_logging();
    let service = Arc::new(MockPtyService::new());
    let (mut manager, _surfaces) = recording_manager(&service);

    let a = manager.create(None);
    let b = manager.create(None);
    let mut conns = accept_map(&service, 2).await;
    let conn_a = conns.remove(&a).unwrap();
    let conn_b = conns.remove(&b).unwrap();

    manager
        .session(b)
        .unwrap()
        .wait_for_state(ConnectionState::Open)
        .await;

    manager.close(a).unwrap();
    drop(conn_a);

    // B is untouched: still open, still receiving, still accepting input.
    conn_b.send_output(b"still here\n").await;
    assert!(eventually(|| manager.session(b).unwrap().line_count() == 1).await);
    manager
        .session_mut(b)
        .unwrap()
        .submit_input("echo hi\n")
        .unwrap();
    assert_eq!(
        manager.session(b).unwrap().connection_state(),
        ConnectionState::Open
    );
}

#[tokio::test]
async fn search_all_aggregates_across_sessions() {
    let service = Arc::new(MockPtyService::new());
    let mut manager = SessionManager::headless("proj-1", service.clone() as Arc<dyn Dialer>);

    let a = manager.create(None);
    let b = manager.create(None);
    let c = manager.create(None);
    let conns = accept_map(&service, 3).await;

    conns[&a].send_output(b"error: one\n").await;
    conns[&b].send_output(b"all fine\n").await;
    conns[&c].send_output(b"error: two\nerror: three\n").await;

    assert!(
        eventually(|| {
            manager.session(a).unwrap().line_count() == 1
                && manager.session(b).unwrap().line_count() == 1
                && manager.session(c).unwrap().line_count() == 2
        })
        .await
    );

    let results = manager.search_all("error", false);
    assert_eq!(results.len(), 2);
    assert_eq!(results[&a].len(), 1);
    assert_eq!(results[&c].len(), 2);
    assert!(!results.contains_key(&b));
}

#[tokio::test]
async fn settings_broadcast_reaches_every_surface() {
    let service = Arc::new(MockPtyService::new());
    let (mut manager, surfaces) = recording_manager(&service);

    manager.create(None);
    manager.create(None);

    manager.broadcast_settings(DisplaySettings {
        theme: Theme::Solarized,
        font_size: 16,
    });

    for surface in surfaces.lock().unwrap().iter() {
        let seen = surface.last_settings().unwrap();
        assert_eq!(seen.theme, Theme::Solarized);
        assert_eq!(seen.font_size, 16);
    }

    // A session created afterwards starts with the current settings.
    manager.create(None);
    let seen = surfaces.lock().unwrap()[2].last_settings().unwrap();
    assert_eq!(seen.theme, Theme::Solarized);
    assert_eq!(seen.font_size, 16);
}

#[tokio::test]
async fn clear_empties_buffer_and_surface() {
    let service = Arc::new(MockPtyService::new());
    let (mut manager, surfaces) = recording_manager(&service);

    let id = manager.create(None);
    let mut conns = accept_map(&service, 1).await;
    let conn = conns.remove(&id).unwrap();

    conn.send_output(b"junk\n").await;
    assert!(eventually(|| manager.session(id).unwrap().line_count() == 1).await);

    manager.session(id).unwrap().clear();

    let session = manager.session(id).unwrap();
    assert_eq!(session.line_count(), 0);
    assert_eq!(session.export_content(), "");
    assert_eq!(surfaces.lock().unwrap()[0].clear_count(), 1);

    // Fresh output lands with a continuing sequence, not a reused one.
    conn.send_output(b"after\n").await;
    assert!(eventually(|| manager.session(id).unwrap().line_count() == 1).await);
    let matches = manager.session(id).unwrap().search("after", true);
    assert_eq!(matches[0].seq, 1);
}
