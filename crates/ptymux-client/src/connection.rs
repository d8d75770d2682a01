//! Transport connection state machine.
//!
//! Each connection runs in its own task. The task owns the dial /
//! handshake / serve cycle and every timer, so `close()` cancels all
//! of them together through one shutdown signal.
//!
//! State machine:
//!
//! ```text
//! Connecting -> Open -> Reconnecting -> Open -> ... -> Closed
//! ```
//!
//! Connecting is shown only for the first attempt; any failure after
//! that, including a failed first attempt, reads as Reconnecting.
//! Reconnection runs at a fixed interval (Mosh-style constant retry,
//! no backoff). A missing heartbeat reply never forces a reconnect;
//! only socket-level errors and EOF do. Closed is reached via
//! `close()` or a fatal handshake rejection.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::{Notify, mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tracing::{debug, info, trace, warn};

use ptymux_core::constants::{
    CONNECT_TIMEOUT, HEARTBEAT_INTERVAL, MAX_PENDING_OUTBOUND, PROTOCOL_VERSION,
    RECONNECT_INTERVAL,
};
use ptymux_core::error::{Error, Result};
use ptymux_core::protocol::{Endpoint, Frame, HelloPayload, TermSize};
use ptymux_core::transport::{Dialer, FrameConn};

/// Acquire a read lock, recovering from poisoning.
fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

/// Acquire a write lock, recovering from poisoning.
fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

// =============================================================================
// Connection State
// =============================================================================

/// Lifecycle state of a transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Created but not yet dialing. A spawned transport skips this
    /// and starts in Connecting.
    #[default]
    Idle,
    /// First connection attempt in progress.
    Connecting,
    /// Connected and serving traffic.
    Open,
    /// Connection lost; retrying at a fixed interval.
    Reconnecting,
    /// Terminal. Entered only via `close()` or a fatal handshake error.
    Closed,
}

impl ConnectionState {
    /// Whether the run loop is still alive.
    pub fn is_active(&self) -> bool {
        !matches!(self, ConnectionState::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Handle
// =============================================================================

enum Command {
    Send(Vec<u8>),
    Resize(TermSize),
}

/// Handle to a spawned transport connection.
///
/// Cheap to query; all operations are non-blocking. After `close()`
/// sends and resizes become no-ops (the session layer owns the
/// closed-session error).
pub struct TransportHandle {
    state: Arc<RwLock<ConnectionState>>,
    state_changed: Arc<Notify>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    shutdown_tx: watch::Sender<bool>,
}

impl TransportHandle {
    /// Spawn the run loop for a connection to `endpoint`.
    ///
    /// Returns immediately with the handle reporting Connecting; the
    /// connection dials in the background. Output bytes arrive on
    /// `output_tx` in receive order.
    pub fn spawn(
        dialer: Arc<dyn Dialer>,
        endpoint: Endpoint,
        size: TermSize,
        output_tx: mpsc::UnboundedSender<Vec<u8>>,
    ) -> Self {
        // Connecting from the start: callers observe the dialing state
        // before the run loop's task is ever polled.
        let state = Arc::new(RwLock::new(ConnectionState::Connecting));
        let state_changed = Arc::new(Notify::new());
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let run = RunLoop {
            dialer,
            endpoint,
            size,
            pending: VecDeque::new(),
            cmd_rx,
            output_tx,
            state: state.clone(),
            state_changed: state_changed.clone(),
            shutdown_rx,
            heartbeat_seq: 0,
        };
        tokio::spawn(run.run());

        Self {
            state,
            state_changed,
            cmd_tx,
            shutdown_tx,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *read_lock(&self.state)
    }

    /// Whether the connection is currently open.
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Queue bytes toward the endpoint.
    ///
    /// While disconnected the bytes wait in a bounded queue and flush
    /// in order on reconnect. Sending after `close()` is a programming
    /// error flagged in debug builds; release builds drop the bytes.
    pub fn send(&self, bytes: Vec<u8>) {
        debug_assert!(
            !*self.shutdown_tx.borrow(),
            "send on closed transport"
        );
        if self.cmd_tx.send(Command::Send(bytes)).is_err() {
            trace!("send after close ignored");
        }
    }

    /// Update the terminal size.
    ///
    /// Sent immediately when open, and re-issued on every reconnect
    /// since the remote PTY loses its geometry with the connection.
    pub fn resize(&self, size: TermSize) {
        debug_assert!(
            !*self.shutdown_tx.borrow(),
            "resize on closed transport"
        );
        if self.cmd_tx.send(Command::Resize(size)).is_err() {
            trace!("resize after close ignored");
        }
    }

    /// Close the connection. Idempotent.
    ///
    /// Cancels the run loop with every timer it owns; a connect
    /// attempt resolving after this point is discarded.
    pub fn close(&self) {
        {
            let mut state = write_lock(&self.state);
            if *state == ConnectionState::Closed {
                return;
            }
            *state = ConnectionState::Closed;
        }
        self.state_changed.notify_waiters();
        let _ = self.shutdown_tx.send(true);
        debug!("transport closed");
    }

    /// Wait until the connection reaches the given state.
    pub async fn wait_for_state(&self, target: ConnectionState) {
        loop {
            let notified = self.state_changed.notified();
            if self.state() == target {
                return;
            }
            notified.await;
        }
    }
}

// =============================================================================
// Run Loop
// =============================================================================

struct RunLoop {
    dialer: Arc<dyn Dialer>,
    endpoint: Endpoint,
    size: TermSize,
    /// Outbound chunks queued while disconnected. Bounded; the oldest
    /// chunk is dropped on overflow.
    pending: VecDeque<Vec<u8>>,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    output_tx: mpsc::UnboundedSender<Vec<u8>>,
    state: Arc<RwLock<ConnectionState>>,
    state_changed: Arc<Notify>,
    shutdown_rx: watch::Receiver<bool>,
    heartbeat_seq: u64,
}

impl RunLoop {
    fn set_state(&self, next: ConnectionState) {
        {
            let mut state = write_lock(&self.state);
            // Closed is terminal; close() wins any race with the loop.
            if *state == ConnectionState::Closed || *state == next {
                return;
            }
            trace!(from = %state, to = %next, endpoint = %self.endpoint, "state change");
            *state = next;
        }
        self.state_changed.notify_waiters();
    }

    async fn run(mut self) {
        let mut first_attempt = true;
        let mut attempt: u32 = 0;

        loop {
            if *self.shutdown_rx.borrow() {
                break;
            }
            // Connecting is only ever shown for the very first attempt;
            // any failure after that reads as Reconnecting.
            self.set_state(if first_attempt {
                ConnectionState::Connecting
            } else {
                ConnectionState::Reconnecting
            });
            first_attempt = false;

            match self.connect_once().await {
                Ok(conn) => {
                    attempt = 0;
                    if !self.serve(conn).await {
                        break;
                    }
                    self.set_state(ConnectionState::Reconnecting);
                }
                Err(e) => {
                    if *self.shutdown_rx.borrow() {
                        break;
                    }
                    if e.is_fatal() {
                        warn!(endpoint = %self.endpoint, error = %e, "connect rejected, giving up");
                        break;
                    }
                    attempt += 1;
                    debug!(
                        endpoint = %self.endpoint,
                        error = %e,
                        attempt,
                        "connect failed, retrying in {:?}",
                        RECONNECT_INTERVAL
                    );
                    self.set_state(ConnectionState::Reconnecting);
                    if !self.idle_wait().await {
                        break;
                    }
                }
            }
        }

        self.set_state_closed();
    }

    fn set_state_closed(&self) {
        {
            let mut state = write_lock(&self.state);
            *state = ConnectionState::Closed;
        }
        self.state_changed.notify_waiters();
    }

    /// One dial + handshake attempt, bounded by `CONNECT_TIMEOUT` and
    /// interruptible by shutdown.
    async fn connect_once(&mut self) -> Result<FrameConn> {
        let mut shutdown = self.shutdown_rx.clone();
        let dialer = self.dialer.clone();
        let endpoint = self.endpoint.clone();
        let hello = Frame::Hello(HelloPayload {
            protocol_version: PROTOCOL_VERSION,
            project_id: endpoint.project_id.clone(),
            session_id: endpoint.session_id,
            term_size: self.size,
        });

        let attempt = async move {
            let mut conn = dialer.dial(&endpoint).await?;
            conn.tx
                .send(hello)
                .await
                .map_err(|_| Error::ConnectionClosed)?;
            match conn.rx.recv().await {
                Some(Frame::HelloAck(ack)) if ack.accepted => Ok(conn),
                Some(Frame::HelloAck(ack)) => Err(Error::Handshake {
                    message: ack
                        .reject_reason
                        .unwrap_or_else(|| "attach rejected".into()),
                }),
                Some(_) => Err(Error::Protocol {
                    message: "expected HelloAck as first frame".into(),
                }),
                None => Err(Error::ConnectionClosed),
            }
        };

        tokio::select! {
            biased;
            _ = shutdown.changed() => Err(Error::SessionClosed),
            res = timeout(CONNECT_TIMEOUT, attempt) => match res {
                Ok(r) => r,
                Err(_) => Err(Error::Timeout),
            },
        }
    }

    /// Serve an established connection until it is lost or shut down.
    ///
    /// Returns true when the connection was lost (caller reconnects),
    /// false on shutdown.
    async fn serve(&mut self, mut conn: FrameConn) -> bool {
        // Flush everything queued while disconnected, in order.
        self.drain_commands();
        while let Some(chunk) = self.pending.pop_front() {
            if conn.tx.send(Frame::Data(chunk.clone())).await.is_err() {
                self.pending.push_front(chunk);
                return true;
            }
        }

        // The remote PTY's geometry did not survive the disconnect.
        if conn
            .tx
            .send(Frame::Resize {
                cols: self.size.cols,
                rows: self.size.rows,
            })
            .await
            .is_err()
        {
            return true;
        }

        self.set_state(ConnectionState::Open);
        info!(endpoint = %self.endpoint, "connection open");

        let mut heartbeat = interval_at(
            Instant::now() + HEARTBEAT_INTERVAL,
            HEARTBEAT_INTERVAL,
        );
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => return false,
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Send(bytes)) => {
                        if conn.tx.send(Frame::Data(bytes.clone())).await.is_err() {
                            self.queue_send(bytes);
                            return true;
                        }
                    }
                    Some(Command::Resize(size)) => {
                        self.size = size;
                        if conn
                            .tx
                            .send(Frame::Resize { cols: size.cols, rows: size.rows })
                            .await
                            .is_err()
                        {
                            return true;
                        }
                    }
                    // All handles dropped; nothing left to serve.
                    None => return false,
                },
                frame = conn.rx.recv() => match frame {
                    Some(Frame::Data(bytes)) => {
                        let _ = self.output_tx.send(bytes);
                    }
                    Some(Frame::Heartbeat { seq }) => {
                        trace!(seq, "heartbeat reply");
                    }
                    Some(Frame::Shutdown { message }) => {
                        info!(endpoint = %self.endpoint, ?message, "service shutdown notice");
                        return true;
                    }
                    Some(other) => {
                        debug!(endpoint = %self.endpoint, frame = ?other, "unexpected frame");
                    }
                    None => {
                        info!(endpoint = %self.endpoint, "connection lost");
                        return true;
                    }
                },
                _ = heartbeat.tick() => {
                    self.heartbeat_seq += 1;
                    if conn
                        .tx
                        .send(Frame::Heartbeat { seq: self.heartbeat_seq })
                        .await
                        .is_err()
                    {
                        return true;
                    }
                }
            }
        }
    }

    /// Wait out the reconnect interval, queuing commands as they come.
    /// Returns false on shutdown.
    async fn idle_wait(&mut self) -> bool {
        let sleep = tokio::time::sleep(RECONNECT_INTERVAL);
        tokio::pin!(sleep);
        let mut shutdown = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => return false,
                _ = &mut sleep => return true,
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Send(bytes)) => self.queue_send(bytes),
                    Some(Command::Resize(size)) => self.size = size,
                    None => return false,
                },
            }
        }
    }

    /// Pull any commands that arrived while we weren't selecting on
    /// the channel (during dial) into the pending queue.
    fn drain_commands(&mut self) {
        while let Ok(cmd) = self.cmd_rx.try_recv() {
            match cmd {
                Command::Send(bytes) => self.queue_send(bytes),
                Command::Resize(size) => self.size = size,
            }
        }
    }

    fn queue_send(&mut self, bytes: Vec<u8>) {
        if self.pending.len() == MAX_PENDING_OUTBOUND {
            // Bounded queue: losing the oldest keystrokes beats
            // unbounded memory growth during a long outage.
            warn!(endpoint = %self.endpoint, "pending outbound full, dropping oldest chunk");
            self.pending.pop_front();
        }
        self.pending.push_back(bytes);
    }
}

// =============================================================================
// Tests
// =============================================================================
