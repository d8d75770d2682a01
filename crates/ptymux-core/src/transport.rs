//! Transport abstraction between the orchestrator and a PTY endpoint.
//!
//! A dialed connection is represented as a pair of frame channels, so
//! the connection run loop is identical whether the other end is a
//! real socket bridged by I/O tasks or an in-memory mock service.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::protocol::{Endpoint, Frame};

/// Channel capacity for each direction of a dialed connection.
pub const FRAME_CHANNEL_CAPACITY: usize = 256;

/// One established connection to a PTY endpoint, as frame channels.
///
/// Dropping `tx` (or the peer dropping its sender) reads as a closed
/// connection on the other side.
#[derive(Debug)]
pub struct FrameConn {
    /// Frames toward the endpoint.
    pub tx: mpsc::Sender<Frame>,
    /// Frames from the endpoint. `None` on recv means the connection
    /// is gone.
    pub rx: mpsc::Receiver<Frame>,
}

impl FrameConn {
    /// Create a connected pair of frame conns (client half, peer half).
    pub fn pair() -> (FrameConn, FrameConn) {
        let (tx1, rx1) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let (tx2, rx2) = mpsc::channel(FRAME_CHANNEL_CAPACITY);

        let client = FrameConn { tx: tx1, rx: rx2 };
        let peer = FrameConn { tx: tx2, rx: rx1 };

        (client, peer)
    }
}

/// Establishes connections to PTY endpoints.
///
/// Implementations must not perform the protocol handshake; the
/// connection run loop owns Hello/HelloAck so handshake behavior is
/// uniform across transports.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Open a new connection to the given endpoint.
    async fn dial(&self, endpoint: &Endpoint) -> Result<FrameConn>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frame_conn_pair_is_wired_both_ways() {
        let (mut client, mut peer) = FrameConn::pair();

        client.tx.send(Frame::Heartbeat { seq: 1 }).await.unwrap();
        assert_eq!(peer.rx.recv().await.unwrap(), Frame::Heartbeat { seq: 1 });

        peer.tx.send(Frame::Data(b"hi".to_vec())).await.unwrap();
        assert_eq!(client.rx.recv().await.unwrap(), Frame::Data(b"hi".to_vec()));
    }

    #[tokio::test]
    async fn dropping_peer_closes_client_recv() {
        let (mut client, peer) = FrameConn::pair();
        drop(peer);
        assert!(client.rx.recv().await.is_none());
    }
}
