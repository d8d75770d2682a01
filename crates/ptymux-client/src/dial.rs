//! TCP dialer: bridges a socket to the frame-channel transport seam.

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use ptymux_core::error::Result;
use ptymux_core::protocol::{Codec, Endpoint};
use ptymux_core::transport::{Dialer, FRAME_CHANNEL_CAPACITY, FrameConn};

/// Dials a PTY service over plain TCP.
///
/// The socket carries length-prefixed frames (see the core codec).
/// Reader and writer tasks bridge the socket to a `FrameConn`; when
/// the socket dies the reader drops its sender, which the connection
/// run loop observes as EOF.
pub struct TcpDialer {
    addr: String,
}

impl TcpDialer {
    /// Create a dialer for a `host:port` address.
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// The configured service address.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    async fn dial(&self, endpoint: &Endpoint) -> Result<FrameConn> {
        let stream = TcpStream::connect(&self.addr).await?;
        stream.set_nodelay(true)?;
        debug!(addr = %self.addr, %endpoint, "tcp connected");

        let (mut read_half, mut write_half) = stream.into_split();
        let (socket_tx, conn_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let (conn_tx, mut socket_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);

        // Writer: frames from the run loop onto the socket.
        tokio::spawn(async move {
            while let Some(frame) = socket_rx.recv().await {
                let bytes = match Codec::encode(&frame) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(error = %e, "frame encode failed");
                        continue;
                    }
                };
                if write_half.write_all(&bytes).await.is_err() {
                    break;
                }
            }
        });

        // Reader: socket bytes decoded into frames for the run loop.
        tokio::spawn(async move {
            let mut buf = BytesMut::with_capacity(8 * 1024);
            loop {
                match Codec::decode(&mut buf) {
                    Ok(Some(frame)) => {
                        if socket_tx.send(frame).await.is_err() {
                            break;
                        }
                        continue;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(error = %e, "frame decode failed, dropping connection");
                        break;
                    }
                }
                match read_half.read_buf(&mut buf).await {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(e) => {
                        debug!(error = %e, "socket read failed");
                        break;
                    }
                }
            }
            // Dropping socket_tx reads as connection loss upstream.
        });

        Ok(FrameConn {
            tx: conn_tx,
            rx: conn_rx,
        })
    }
}
