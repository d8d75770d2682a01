//! Mock PTY service for testing without a real endpoint.
//!
//! Implements the dialer seam over in-memory channels. Each dial
//! yields a [`ServiceConn`] on the service side, which tests use to
//! observe frames the client sent, inject output, and simulate
//! disconnects.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use ptymux_core::constants::PROTOCOL_VERSION;
use ptymux_core::error::{Error, Result};
use ptymux_core::protocol::{Endpoint, Frame, HelloAckPayload, HelloPayload};
use ptymux_core::transport::{Dialer, FrameConn};

#[derive(Debug)]
struct Config {
    accept_dials: bool,
    accept_handshake: bool,
    echo_heartbeats: bool,
    dial_count: usize,
}

/// A scriptable in-memory PTY service.
///
/// By default every dial succeeds, every handshake is accepted, and
/// heartbeats are echoed. Tests flip the knobs to script failures.
pub struct MockPtyService {
    cfg: Arc<Mutex<Config>>,
    conn_tx: mpsc::UnboundedSender<ServiceConn>,
    conn_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ServiceConn>>,
}

impl MockPtyService {
    pub fn new() -> Self {
        let (conn_tx, conn_rx) = mpsc::unbounded_channel();
        Self {
            cfg: Arc::new(Mutex::new(Config {
                accept_dials: true,
                accept_handshake: true,
                echo_heartbeats: true,
                dial_count: 0,
            })),
            conn_tx,
            conn_rx: tokio::sync::Mutex::new(conn_rx),
        }
    }

    /// Make subsequent dials fail with a transport error.
    pub fn refuse_dials(&self, refuse: bool) {
        self.cfg.lock().unwrap().accept_dials = !refuse;
    }

    /// Make subsequent handshakes come back rejected.
    pub fn reject_handshakes(&self, reject: bool) {
        self.cfg.lock().unwrap().accept_handshake = !reject;
    }

    /// Control whether heartbeats are echoed back.
    pub fn set_echo_heartbeats(&self, echo: bool) {
        self.cfg.lock().unwrap().echo_heartbeats = echo;
    }

    /// Number of dial attempts seen so far.
    pub fn dial_count(&self) -> usize {
        self.cfg.lock().unwrap().dial_count
    }

    /// Wait for the next accepted connection.
    pub async fn accept(&self) -> ServiceConn {
        self.conn_rx
            .lock()
            .await
            .recv()
            .await
            .expect("mock service dropped")
    }
}

impl Default for MockPtyService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Dialer for MockPtyService {
    async fn dial(&self, endpoint: &Endpoint) -> Result<FrameConn> {
        let (accept, ack, echo) = {
            let mut cfg = self.cfg.lock().unwrap();
            cfg.dial_count += 1;
            (cfg.accept_dials, cfg.accept_handshake, cfg.echo_heartbeats)
        };
        if !accept {
            return Err(Error::Transport {
                message: "connection refused".into(),
            });
        }

        let (client, peer) = FrameConn::pair();
        let FrameConn {
            tx: service_tx,
            rx: mut from_client,
        } = peer;

        let (observed_tx, observed_rx) = mpsc::unbounded_channel();
        let (close_tx, mut close_rx) = watch::channel(false);

        // Relay: answers the handshake, echoes heartbeats, and mirrors
        // every client frame to the observation channel.
        let relay_tx = service_tx.clone();
        let expected_project = endpoint.project_id.clone();
        tokio::spawn(async move {
            let mut handshaken = false;
            loop {
                tokio::select! {
                    biased;
                    _ = close_rx.changed() => break,
                    frame = from_client.recv() => {
                        let Some(frame) = frame else { break };
                        if !handshaken {
                            if let Frame::Hello(ref hello) = frame {
                                handshaken = true;
                                let reply = hello_reply(hello, ack, &expected_project);
                                if relay_tx.send(reply).await.is_err() {
                                    break;
                                }
                            }
                        } else if let Frame::Heartbeat { seq } = frame {
                            if echo && relay_tx.send(Frame::Heartbeat { seq }).await.is_err() {
                                break;
                            }
                        }
                        if observed_tx.send(frame).is_err() {
                            break;
                        }
                    }
                }
            }
            // relay_tx drops here; together with the ServiceConn side
            // that reads as EOF to the client.
        });

        let _ = self.conn_tx.send(ServiceConn {
            tx: service_tx,
            rx: observed_rx,
            close: close_tx,
        });

        Ok(client)
    }
}

fn hello_reply(hello: &HelloPayload, accept: bool, expected_project: &str) -> Frame {
    let (accepted, reject_reason) = if !accept {
        (false, Some("attach rejected".to_owned()))
    } else if hello.project_id != expected_project {
        (false, Some(format!("unknown project: {}", hello.project_id)))
    } else {
        (true, None)
    };
    Frame::HelloAck(HelloAckPayload {
        protocol_version: PROTOCOL_VERSION,
        accepted,
        reject_reason,
    })
}

/// Service-side view of one accepted connection.
pub struct ServiceConn {
    tx: mpsc::Sender<Frame>,
    rx: mpsc::UnboundedReceiver<Frame>,
    close: watch::Sender<bool>,
}

impl ServiceConn {
    /// Inject shell output toward the client.
    pub async fn send_output(&self, bytes: &[u8]) {
        let _ = self.tx.send(Frame::Data(bytes.to_vec())).await;
    }

    /// Send an arbitrary frame toward the client.
    pub async fn send_frame(&self, frame: Frame) {
        let _ = self.tx.send(frame).await;
    }

    /// Next frame the client sent, in order. `None` once the client
    /// side is gone.
    pub async fn recv_frame(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    /// Wait for the client's hello, skipping nothing; panics if the
    /// first frame is something else.
    pub async fn expect_hello(&mut self) -> HelloPayload {
        match self.recv_frame().await {
            Some(Frame::Hello(hello)) => hello,
            other => panic!("expected Hello, got {:?}", other),
        }
    }

    /// Wait for the next data frame, skipping control frames.
    pub async fn recv_data(&mut self) -> Option<Vec<u8>> {
        loop {
            match self.recv_frame().await? {
                Frame::Data(bytes) => return Some(bytes),
                _ => continue,
            }
        }
    }

    /// Wait for the next resize frame, skipping other frames.
    pub async fn recv_resize(&mut self) -> Option<(u16, u16)> {
        loop {
            match self.recv_frame().await? {
                Frame::Resize { cols, rows } => return Some((cols, rows)),
                _ => continue,
            }
        }
    }

    /// Drop the connection, simulating a transport failure.
    pub fn disconnect(self) {
        let _ = self.close.send(true);
        // self.tx drops with self
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ptymux_core::protocol::{SessionId, TermSize};

    fn endpoint() -> Endpoint {
        Endpoint {
            project_id: "proj-1".into(),
            session_id: SessionId::new(),
        }
    }

    async fn handshake(conn: &mut FrameConn, ep: &Endpoint) -> Frame {
        conn.tx
            .send(Frame::Hello(HelloPayload {
                protocol_version: PROTOCOL_VERSION,
                project_id: ep.project_id.clone(),
                session_id: ep.session_id,
                term_size: TermSize::default(),
            }))
            .await
            .unwrap();
        conn.rx.recv().await.unwrap()
    }

    #[tokio::test]
    async fn dial_and_handshake() {
        let service = MockPtyService::new();
        let ep = endpoint();

        let mut conn = service.dial(&ep).await.unwrap();
        let reply = handshake(&mut conn, &ep).await;
        assert!(matches!(
            reply,
            Frame::HelloAck(HelloAckPayload { accepted: true, .. })
        ));

        let mut sconn = service.accept().await;
        let hello = sconn.expect_hello().await;
        assert_eq!(hello.session_id, ep.session_id);
    }

    #[tokio::test]
    async fn refused_dial_fails() {
        let service = MockPtyService::new();
        service.refuse_dials(true);
        let err = service.dial(&endpoint()).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(service.dial_count(), 1);
    }

    #[tokio::test]
    async fn rejected_handshake() {
        let service = MockPtyService::new();
        service.reject_handshakes(true);
        let ep = endpoint();

        let mut conn = service.dial(&ep).await.unwrap();
        let reply = handshake(&mut conn, &ep).await;
        assert!(matches!(
            reply,
            Frame::HelloAck(HelloAckPayload {
                accepted: false,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn heartbeats_are_echoed_after_handshake() {
        let service = MockPtyService::new();
        let ep = endpoint();

        let mut conn = service.dial(&ep).await.unwrap();
        handshake(&mut conn, &ep).await;

        conn.tx.send(Frame::Heartbeat { seq: 9 }).await.unwrap();
        assert_eq!(conn.rx.recv().await.unwrap(), Frame::Heartbeat { seq: 9 });
    }

    #[tokio::test]
    async fn disconnect_closes_client_side() {
        let service = MockPtyService::new();
        let ep = endpoint();

        let mut conn = service.dial(&ep).await.unwrap();
        handshake(&mut conn, &ep).await;

        let sconn = service.accept().await;
        sconn.disconnect();

        // Drain until EOF
        loop {
            match conn.rx.recv().await {
                Some(_) => continue,
                None => break,
            }
        }
    }

    #[tokio::test]
    async fn output_injection_reaches_client() {
        let service = MockPtyService::new();
        let ep = endpoint();

        let mut conn = service.dial(&ep).await.unwrap();
        handshake(&mut conn, &ep).await;

        let sconn = service.accept().await;
        sconn.send_output(b"hello\n").await;
        assert_eq!(
            conn.rx.recv().await.unwrap(),
            Frame::Data(b"hello\n".to_vec())
        );
    }
}
