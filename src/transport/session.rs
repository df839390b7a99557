//! # Relay Session
//!
//! One session owns the two halves of a relayed connection: the local socket
//! the game client connected to, and the remote socket dialed to the
//! authoritative server. Each side gets its own frame decoder; decoded
//! messages run through the hook dispatcher and, unless suppressed, are
//! serialized and written to the opposite side as a single guarded write.
//!
//! ## Lifecycle
//! ```text
//! Idle -> Connecting -> Active -> Closing -> Closed
//!              \------------------------------^
//! ```
//! Construction dials the remote endpoint; a dial failure closes the session
//! before it ever becomes active. While active, a pump task per socket
//! drives frames in strict arrival order for that socket; no ordering holds
//! across the two sockets. Teardown cancels pumps between messages —
//! in-flight hook callbacks are awaited, never aborted — closes both sinks,
//! and drains the session's timer bag exactly once.
//!
//! ## Handshake policy
//! `verChk` and `rndK` frames are never forwarded upstream; after hooks run
//! they are echoed back verbatim to the local side. The `login` response is
//! forwarded but captured into session state for hooks and commands.

use futures::{Sink, SinkExt, Stream, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{RelayTunables, RemoteConfig};
use crate::core::codec::FrameCodec;
use crate::core::message::{Direction, RelayMessage};
use crate::error::{constants, RelayError, Result};
use crate::protocol::dispatcher::Dispatcher;
use crate::protocol::handshake::{self, HandshakeTracker};
use crate::protocol::hooks::HookRegistry;
use crate::utils::metrics::RelayMetrics;
use crate::utils::timers::{TimerBag, TimerId};

type FrameSink = Pin<Box<dyn Sink<String, Error = io::Error> + Send>>;
type FrameStream = Pin<Box<dyn Stream<Item = io::Result<String>> + Send>>;

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Constructed but not yet dialing
    Idle,
    /// Dialing the remote endpoint
    Connecting,
    /// Both sockets wired, frames flowing
    Active,
    /// Teardown in progress
    Closing,
    /// Terminal state
    Closed,
}

/// Lifecycle and traffic events for passive display
#[derive(Debug, Clone)]
pub enum RelayEvent {
    /// Both sockets are wired and relaying
    Connected,
    /// The session reached its terminal state
    Disconnected,
    /// A frame arrived on either socket (before decoding)
    Packet {
        direction: Direction,
        raw: String,
    },
}

/// Process-wide collaborators handed to every session
#[derive(Clone)]
pub struct SessionContext {
    registry: Arc<HookRegistry>,
    metrics: Arc<RelayMetrics>,
    events: broadcast::Sender<RelayEvent>,
    max_frame_size: usize,
}

impl SessionContext {
    pub fn new(
        registry: Arc<HookRegistry>,
        metrics: Arc<RelayMetrics>,
        tunables: &RelayTunables,
    ) -> Self {
        let (events, _) = broadcast::channel(tunables.event_buffer);
        Self {
            registry,
            metrics,
            events,
            max_frame_size: tunables.max_frame_size,
        }
    }

    /// Subscribe to session lifecycle and packet events
    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.events.subscribe()
    }

    /// The shared hook registry
    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }

    /// The shared metrics collector
    pub fn metrics(&self) -> &Arc<RelayMetrics> {
        &self.metrics
    }
}

/// Destination of a guarded write
#[derive(Debug, Clone, Copy)]
enum Peer {
    Local,
    Remote,
}

impl Peer {
    fn label(self) -> &'static str {
        match self {
            Peer::Local => "local",
            Peer::Remote => "remote",
        }
    }
}

struct SessionShared {
    local_sink: Mutex<Option<FrameSink>>,
    remote_sink: Mutex<Option<FrameSink>>,
    state: RwLock<HashMap<String, Value>>,
    timers: TimerBag,
    dispatcher: Dispatcher,
    handshake: HandshakeTracker,
    status: watch::Sender<SessionStatus>,
    shutdown: watch::Sender<bool>,
    ctx: SessionContext,
}

/// Cloneable surface through which hooks, commands, and the owning listener
/// interact with a live session
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<SessionShared>,
}

/// An active relayed connection pair
pub struct RelaySession {
    handle: SessionHandle,
}

impl RelaySession {
    /// Dial the configured upstream endpoint for a freshly accepted local
    /// stream and start relaying.
    ///
    /// A dial failure is the one error fatal to a session: the session goes
    /// straight to `Closed` without ever becoming active.
    #[instrument(skip(local, remote, ctx), fields(endpoint = %remote.endpoint()))]
    pub async fn connect(
        local: TcpStream,
        remote: &RemoteConfig,
        ctx: SessionContext,
    ) -> Result<RelaySession> {
        let (status, _initial_rx) = watch::channel(SessionStatus::Idle);
        status.send_replace(SessionStatus::Connecting);
        info!("connecting to upstream");

        let endpoint = remote.endpoint();
        let remote_stream = match timeout(remote.connect_timeout, TcpStream::connect(&endpoint))
            .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                status.send_replace(SessionStatus::Closed);
                ctx.metrics.session_failed();
                error!(error = %source, "upstream connection failed");
                return Err(RelayError::ConnectionFailed { endpoint, source });
            }
            Err(_) => {
                status.send_replace(SessionStatus::Closed);
                ctx.metrics.session_failed();
                error!("upstream connection timed out");
                return Err(RelayError::ConnectionTimeout { endpoint });
            }
        };

        Ok(Self::attach_with_status(local, remote_stream, ctx, status))
    }

    /// Wire an already-established pair of byte streams into an active
    /// session. This is the seam integration tests drive with in-memory
    /// duplex streams.
    pub fn attach<L, R>(local: L, remote: R, ctx: SessionContext) -> RelaySession
    where
        L: AsyncRead + AsyncWrite + Send + Unpin + 'static,
        R: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (status, _initial_rx) = watch::channel(SessionStatus::Idle);
        Self::attach_with_status(local, remote, ctx, status)
    }

    fn attach_with_status<L, R>(
        local: L,
        remote: R,
        ctx: SessionContext,
        status: watch::Sender<SessionStatus>,
    ) -> RelaySession
    where
        L: AsyncRead + AsyncWrite + Send + Unpin + 'static,
        R: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let codec = FrameCodec::with_max_frame_size(ctx.max_frame_size);
        let (local_sink, local_stream) = Framed::new(local, codec.clone()).split();
        let (remote_sink, remote_stream) = Framed::new(remote, codec).split();

        let (shutdown, _) = watch::channel(false);
        let shutdown_rx_local = shutdown.subscribe();
        let shutdown_rx_remote = shutdown.subscribe();
        let shutdown_rx_supervisor = shutdown.subscribe();

        let dispatcher = Dispatcher::new(Arc::clone(&ctx.registry));
        let shared = Arc::new(SessionShared {
            local_sink: Mutex::new(Some(Box::pin(local_sink) as FrameSink)),
            remote_sink: Mutex::new(Some(Box::pin(remote_sink) as FrameSink)),
            state: RwLock::new(HashMap::new()),
            timers: TimerBag::new(),
            dispatcher,
            handshake: HandshakeTracker::new(),
            status,
            shutdown,
            ctx,
        });
        let handle = SessionHandle { shared };

        handle.shared.status.send_replace(SessionStatus::Active);
        handle.shared.ctx.metrics.session_opened();
        let _ = handle.shared.ctx.events.send(RelayEvent::Connected);
        info!("session active");

        let local_pump = tokio::spawn(pump(
            Box::pin(local_stream) as FrameStream,
            Direction::FromClient,
            handle.clone(),
            shutdown_rx_local,
        ));
        let remote_pump = tokio::spawn(pump(
            Box::pin(remote_stream) as FrameStream,
            Direction::FromServer,
            handle.clone(),
            shutdown_rx_remote,
        ));

        let supervisor_handle = handle.clone();
        tokio::spawn(async move {
            supervise(
                supervisor_handle,
                local_pump,
                remote_pump,
                shutdown_rx_supervisor,
            )
            .await;
        });

        RelaySession { handle }
    }

    /// Handle for interacting with the session
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }
}

impl SessionHandle {
    /// Current lifecycle state
    pub fn status(&self) -> SessionStatus {
        *self.shared.status.borrow()
    }

    /// Write a frame to the local (game client) socket
    pub async fn send_local(&self, frame: impl Into<String>) -> Result<()> {
        self.write_to(Peer::Local, frame.into()).await
    }

    /// Write a frame to the remote (game server) socket
    pub async fn send_remote(&self, frame: impl Into<String>) -> Result<()> {
        self.write_to(Peer::Remote, frame.into()).await
    }

    /// Read a session-scoped state value
    pub async fn state(&self, key: &str) -> Option<Value> {
        self.shared.state.read().await.get(key).cloned()
    }

    /// Write a session-scoped state value
    pub async fn set_state(&self, key: impl Into<String>, value: Value) {
        self.shared.state.write().await.insert(key.into(), value);
    }

    /// Schedule a repeating callback owned by this session. All intervals
    /// are cancelled at teardown; the returned id cancels just this one.
    pub fn set_interval<F, Fut>(&self, period: Duration, f: F) -> TimerId
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.shared.timers.set_interval(period, f)
    }

    /// Cancel one interval scheduled through [`SessionHandle::set_interval`]
    pub fn clear_interval(&self, id: TimerId) -> bool {
        self.shared.timers.clear(id)
    }

    /// Request an orderly teardown. Idempotent; in-flight dispatches finish
    /// before the pumps stop.
    pub fn disconnect(&self) {
        self.shared.shutdown.send_replace(true);
    }

    /// Wait until the session reaches its terminal state
    pub async fn wait_closed(&self) {
        let mut rx = self.shared.status.subscribe();
        loop {
            if *rx.borrow_and_update() == SessionStatus::Closed {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// The shared metrics collector
    pub fn metrics(&self) -> Arc<RelayMetrics> {
        Arc::clone(&self.shared.ctx.metrics)
    }

    /// Subscribe to this session's event feed
    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.shared.ctx.events.subscribe()
    }

    /// Decode one frame and drive it through hooks, handshake policy, and
    /// the guarded write to the opposite socket.
    async fn process_frame(&self, direction: Direction, frame: String) {
        let metrics = &self.shared.ctx.metrics;
        metrics.frame_received(frame.len() as u64);
        let _ = self.shared.ctx.events.send(RelayEvent::Packet {
            direction,
            raw: frame.clone(),
        });

        let message = match RelayMessage::decode(direction, frame) {
            Ok(message) => Arc::new(message),
            Err(error) => {
                metrics.decode_failed();
                debug!(from = direction.label(), error = %error, "dropping undecodable frame");
                return;
            }
        };

        let report = self.shared.dispatcher.dispatch(&message, self).await;
        if !report.is_clean() {
            metrics.hooks_failed(report.failures.len() as u64);
        }

        // Pre-auth handshake frames are answered locally, never forwarded.
        if handshake::is_handshake_kind(message.kind()) {
            message.suppress();
            self.shared.handshake.record_echo();
            metrics.message_suppressed();
            metrics.handshake_echoed();
            debug!(kind = message.kind(), "echoing handshake frame to local side");
            let _ = self.write_to(Peer::Local, message.raw().to_owned()).await;
            return;
        }

        if message.kind() == handshake::KIND_LOGIN {
            self.shared.handshake.record_login();
            self.set_state(
                handshake::STATE_LOGIN,
                Value::String(message.raw().to_owned()),
            )
            .await;
            debug!(from = direction.label(), "captured login frame");
        }

        if message.is_suppressed() {
            metrics.message_suppressed();
            debug!(kind = message.kind(), "message suppressed");
            return;
        }

        let frame = match message.serialize() {
            Ok(frame) => frame,
            Err(error) => {
                warn!(kind = message.kind(), error = %error, "failed to serialize message; dropping");
                return;
            }
        };

        let destination = match direction {
            Direction::FromClient => Peer::Remote,
            Direction::FromServer => Peer::Local,
        };
        if self.write_to(destination, frame).await.is_ok() {
            metrics.message_forwarded();
        }
    }

    /// One atomic write per frame. A destination that is already gone logs a
    /// warning and drops the frame; it is not severe enough to tear the
    /// session down by itself.
    async fn write_to(&self, peer: Peer, frame: String) -> Result<()> {
        let sink = match peer {
            Peer::Local => &self.shared.local_sink,
            Peer::Remote => &self.shared.remote_sink,
        };

        let bytes = frame.len() as u64;
        let mut guard = sink.lock().await;
        let Some(sink) = guard.as_mut() else {
            warn!(to = peer.label(), "{}", constants::ERR_SINK_CLOSED);
            self.shared.ctx.metrics.write_failed();
            return Err(RelayError::WriteFailed(
                constants::ERR_SINK_CLOSED.to_owned(),
            ));
        };

        match sink.send(frame).await {
            Ok(()) => {
                self.shared.ctx.metrics.bytes_sent(bytes);
                Ok(())
            }
            Err(error) => {
                warn!(to = peer.label(), error = %error, "write failed; dropping frame");
                self.shared.ctx.metrics.write_failed();
                Err(RelayError::WriteFailed(error.to_string()))
            }
        }
    }

    async fn close_sinks(&self) {
        for sink in [&self.shared.local_sink, &self.shared.remote_sink] {
            let taken = sink.lock().await.take();
            if let Some(mut sink) = taken {
                let _ = sink.close().await;
            }
        }
    }
}

/// Read frames off one socket in strict arrival order. Each frame is
/// processed to completion before the next is read, so teardown between
/// messages never cancels an in-flight dispatch.
async fn pump(
    mut stream: FrameStream,
    direction: Direction,
    handle: SessionHandle,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let next = tokio::select! {
            _ = shutdown_rx.changed() => break,
            next = stream.next() => next,
        };

        match next {
            Some(Ok(frame)) => handle.process_frame(direction, frame).await,
            Some(Err(error)) => {
                warn!(from = direction.label(), error = %error, "stream error");
                break;
            }
            None => {
                debug!(from = direction.label(), "stream closed");
                break;
            }
        }
    }

    // Either socket ending moves the whole session toward teardown.
    handle.shared.shutdown.send_replace(true);
}

/// Waits for a teardown trigger (explicit disconnect or a pump ending), then
/// closes the session exactly once: Closing, pumps drained, sinks closed,
/// timers cancelled, Closed.
async fn supervise(
    handle: SessionHandle,
    local_pump: tokio::task::JoinHandle<()>,
    remote_pump: tokio::task::JoinHandle<()>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    if shutdown_rx.changed().await.is_err() {
        return;
    }

    handle.shared.status.send_replace(SessionStatus::Closing);
    debug!("session closing");

    let _ = local_pump.await;
    let _ = remote_pump.await;

    handle.close_sinks().await;
    handle.shared.timers.close();

    handle.shared.status.send_replace(SessionStatus::Closed);
    let _ = handle.shared.ctx.events.send(RelayEvent::Disconnected);
    handle.shared.ctx.metrics.session_closed();

    if handle.shared.handshake.interrupted() {
        warn!("connection closed mid-handshake");
    } else {
        info!("session closed");
    }
}
