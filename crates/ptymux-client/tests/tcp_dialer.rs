//! End-to-end over a real socket: TcpDialer + codec against a minimal
//! in-process PTY service.

use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use ptymux_client::{ConnectionState, TcpDialer, TerminalSession};
use ptymux_core::constants::PROTOCOL_VERSION;
use ptymux_core::init_test_logging;
use ptymux_core::protocol::{Codec, Endpoint, Frame, HelloAckPayload, SessionId, TermSize};
use ptymux_core::render::NullSurface;
use ptymux_core::transport::Dialer;
use ptymux_test_utils::eventually;

/// Speaks just enough of the protocol: accepts the hello, greets, and
/// echoes data back prefixed with "echo: ".
async fn serve_conn(mut stream: TcpStream) {
    let mut buf = BytesMut::with_capacity(8 * 1024);
    loop {
        let frame = loop {
            match Codec::decode(&mut buf).unwrap() {
                Some(frame) => break frame,
                None => {
                    if stream.read_buf(&mut buf).await.unwrap_or(0) == 0 {
                        return;
                    }
                }
            }
        };

        match frame {
            Frame::Hello(_) => {
                let ack = Frame::HelloAck(HelloAckPayload {
                    protocol_version: PROTOCOL_VERSION,
                    accepted: true,
                    reject_reason: None,
                });
                stream.write_all(&Codec::encode(&ack).unwrap()).await.unwrap();
                let greeting = Frame::Data(b"welcome\n".to_vec());
                stream
                    .write_all(&Codec::encode(&greeting).unwrap())
                    .await
                    .unwrap();
            }
            Frame::Data(bytes) => {
                let mut reply = b"echo: ".to_vec();
                reply.extend_from_slice(&bytes);
                let frame = Frame::Data(reply);
                stream
                    .write_all(&Codec::encode(&frame).unwrap())
                    .await
                    .unwrap();
            }
            // Geometry and keepalives need no reply here.
            Frame::Resize { .. } | Frame::Heartbeat { .. } => {}
            _ => {}
        }
    }
}

async fn spawn_service() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve_conn(stream));
        }
    });
    addr
}

#[tokio::test]
async fn session_over_tcp_round_trip() {
    init_test_logging();
    let addr = spawn_service().await;

    let dialer = Arc::new(TcpDialer::new(addr)) as Arc<dyn Dialer>;
    let endpoint = Endpoint {
        project_id: "proj-1".into(),
        session_id: SessionId::new(),
    };
    let mut session = TerminalSession::spawn(
        endpoint,
        "Terminal 1".into(),
        TermSize::default(),
        dialer,
        Arc::new(NullSurface),
    );

    session.wait_for_state(ConnectionState::Open).await;

    assert!(eventually(|| session.export_content().contains("welcome")).await);

    session.submit_input("uptime\n").unwrap();
    assert!(eventually(|| session.export_content().contains("echo: uptime")).await);

    session.close();
    assert_eq!(session.connection_state(), ConnectionState::Closed);
}

#[tokio::test]
async fn dial_failure_is_transient() {
    // Nothing listens here; connect should fail with an I/O error the
    // retry loop treats as transient.
    let dialer = TcpDialer::new("127.0.0.1:1");
    let endpoint = Endpoint {
        project_id: "proj-1".into(),
        session_id: SessionId::new(),
    };
    let err = dialer.dial(&endpoint).await.unwrap_err();
    assert!(err.is_transient());
}
