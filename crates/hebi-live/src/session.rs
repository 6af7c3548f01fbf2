//! Live session adapter
//!
//! Owns the connection lifecycle, turns tool invocations into the latest
//! [`FingerSignal`], acknowledges every invocation and pushes frames. The
//! signal is published through a `watch` channel so the game loop always
//! reads the most recent write without blocking.
//!
//! Each `connect` starts a new generation. Inbound traffic tagged with an
//! older generation is dropped, so nothing from a closed session can touch
//! state after `disconnect` returns.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, watch};
use web_time::Instant;

use hebi_core::FingerSignal;

use crate::error::SessionError;
use crate::frame::EncodedFrame;
use crate::protocol::{FunctionResponse, ServerEvent, SessionSetup, ToolInvocation};
use crate::transport::{InboundEvents, LiveTransport, TransportEvent};

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
    Error,
}

impl ConnectionState {
    /// States from which `connect` may start a new session
    pub fn can_connect(self) -> bool {
        matches!(self, Self::Idle | Self::Closed | Self::Error)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Notifications for whoever presents session status
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Status {
        state: ConnectionState,
        message: String,
    },
    Error {
        message: String,
    },
}

/// What happened to one `send_frame` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDisposition {
    Sent,
    /// Session not open; frame discarded
    NotOpen,
    /// Previous frame still on the wire; frame discarded
    Busy,
    /// Transport rejected the frame
    Failed,
}

/// Receiving ends handed out by [`SessionAdapter::new`]
pub struct SessionChannels {
    pub signals: watch::Receiver<Option<FingerSignal>>,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

struct Inner<T> {
    transport: T,
    setup: SessionSetup,
    state: Mutex<ConnectionState>,
    generation: AtomicU64,
    frame_in_flight: AtomicBool,
    signals: watch::Sender<Option<FingerSignal>>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

/// Cheap to clone; all clones drive the same session
pub struct SessionAdapter<T: LiveTransport> {
    inner: Arc<Inner<T>>,
}

impl<T: LiveTransport> Clone for SessionAdapter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: LiveTransport> SessionAdapter<T> {
    pub fn new(transport: T, setup: SessionSetup) -> (Self, SessionChannels) {
        let (signal_tx, signal_rx) = watch::channel(None);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let adapter = Self {
            inner: Arc::new(Inner {
                transport,
                setup,
                state: Mutex::new(ConnectionState::Idle),
                generation: AtomicU64::new(0),
                frame_in_flight: AtomicBool::new(false),
                signals: signal_tx,
                events: event_tx,
            }),
        };

        (
            adapter,
            SessionChannels {
                signals: signal_rx,
                events: event_rx,
            },
        )
    }

    pub fn state(&self) -> ConnectionState {
        *self.lock_state()
    }

    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// Latest decoded signal, `None` before the first one or after disconnect
    pub fn latest_signal(&self) -> Option<FingerSignal> {
        *self.inner.signals.borrow()
    }

    /// Another reader of the signal slot
    pub fn subscribe(&self) -> watch::Receiver<Option<FingerSignal>> {
        self.inner.signals.subscribe()
    }

    /// True while a frame is on the wire
    pub fn is_sending(&self) -> bool {
        self.inner.frame_in_flight.load(Ordering::Acquire)
    }

    /// Open a session.
    ///
    /// Returns once the handshake is sent; the state becomes `Open` when the
    /// server confirms setup. Fails without side effects while a session is
    /// already connecting or open.
    pub async fn connect(&self) -> Result<(), SessionError> {
        let generation = {
            let mut state = self.lock_state();
            if !state.can_connect() {
                return Err(SessionError::AlreadyActive(*state));
            }
            *state = ConnectionState::Connecting;
            self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1
        };
        self.emit_status(ConnectionState::Connecting, "Connecting to tracking session");

        let inbound = match self.inner.transport.open(&self.inner.setup).await {
            Ok(inbound) => inbound,
            Err(err) => {
                self.fail(generation, format!("Could not connect: {}", err));
                return Err(err.into());
            }
        };

        if !self.is_current(generation) {
            // Disconnected while the handshake was in flight
            log::debug!("Discarding session {} opened after disconnect", generation);
            if let Err(err) = self.inner.transport.close().await {
                log::warn!("Failed to close abandoned session: {}", err);
            }
            return Err(SessionError::Cancelled);
        }

        log::info!("Live session {} handshake sent", generation);
        tokio::spawn(self.clone().pump(inbound, generation));
        Ok(())
    }

    /// Tear down the session. Idempotent; always leaves the state `Closed`.
    pub async fn disconnect(&self) {
        {
            // Signal writes happen under the same lock, so once this block
            // ends no older generation can publish again
            let mut state = self.lock_state();
            self.inner.generation.fetch_add(1, Ordering::AcqRel);
            *state = ConnectionState::Closed;
            self.inner.signals.send_replace(None);
        }

        if let Err(err) = self.inner.transport.close().await {
            log::warn!("Error while closing live session: {}", err);
        }
        self.emit_status(ConnectionState::Closed, "Disconnected");
    }

    /// Push one encoded frame, dropping it if the session is not open or the
    /// previous frame has not gone out yet
    pub async fn send_frame(&self, frame: EncodedFrame) -> FrameDisposition {
        if self.state() != ConnectionState::Open {
            log::trace!("Dropping frame, session not open");
            return FrameDisposition::NotOpen;
        }
        if self.inner.frame_in_flight.swap(true, Ordering::AcqRel) {
            log::trace!("Dropping frame, previous send still in flight");
            return FrameDisposition::Busy;
        }
        let _in_flight = InFlight(&self.inner.frame_in_flight);

        match self.inner.transport.send_frame(frame.into_chunk()).await {
            Ok(()) => FrameDisposition::Sent,
            Err(err) => {
                log::warn!("Frame push failed: {}", err);
                FrameDisposition::Failed
            }
        }
    }

    async fn pump(self, mut inbound: InboundEvents, generation: u64) {
        while let Some(event) = inbound.recv().await {
            if !self.is_current(generation) {
                log::debug!("Ignoring traffic from stale session {}", generation);
                return;
            }

            match event {
                TransportEvent::Message(ServerEvent::SetupComplete) => {
                    if self.transition(generation, ConnectionState::Open) {
                        log::info!("Live session {} open", generation);
                        self.emit_status(ConnectionState::Open, "Tracking session open");
                    }
                }
                TransportEvent::Message(ServerEvent::ToolCall(invocations)) => {
                    for invocation in &invocations {
                        if !self.handle_invocation(generation, invocation).await {
                            log::debug!("Dropping rest of tool call batch from stale session");
                            return;
                        }
                    }
                }
                TransportEvent::Message(ServerEvent::ToolCallCancellation(ids)) => {
                    log::debug!("Backend cancelled tool calls {:?}", ids);
                }
                TransportEvent::Message(ServerEvent::GoAway(time_left)) => {
                    log::warn!("Server will close the session soon (time left: {:?})", time_left);
                }
                TransportEvent::Message(ServerEvent::Content) => {
                    log::trace!("Ignoring server content");
                }
                TransportEvent::Message(ServerEvent::Unknown) => {
                    log::debug!("Ignoring unrecognized server message");
                }
                TransportEvent::Closed { reason } => {
                    self.close_from_remote(generation, reason);
                    return;
                }
                TransportEvent::Error(err) => {
                    self.fail(generation, format!("Session error: {}", err));
                    return;
                }
            }
        }

        self.close_from_remote(generation, None);
    }

    /// Publish and acknowledge one invocation. Returns false, without
    /// acknowledging, once `generation` is no longer the live session.
    async fn handle_invocation(&self, generation: u64, invocation: &ToolInvocation) -> bool {
        match invocation.finger_signal(Instant::now()) {
            Ok(signal) => {
                if !self.publish(generation, signal) {
                    return false;
                }
                log::trace!("Finger at ({:.3}, {:.3})", signal.x, signal.y);
            }
            Err(err) => {
                log::warn!("Ignoring tool call {}: {}", invocation.id, err);
            }
        }

        if !self.is_current(generation) {
            return false;
        }
        // Every invocation gets exactly one acknowledgement, decodable or not
        let response = FunctionResponse::ok(invocation);
        if let Err(err) = self.inner.transport.acknowledge(response).await {
            log::warn!("Failed to acknowledge tool call {}: {}", invocation.id, err);
        }
        true
    }

    /// Store `signal` if `generation` is still the live one
    fn publish(&self, generation: u64, signal: FingerSignal) -> bool {
        let _state = self.lock_state();
        if self.inner.generation.load(Ordering::Acquire) != generation {
            return false;
        }
        self.inner.signals.send_replace(Some(signal));
        true
    }

    fn close_from_remote(&self, generation: u64, reason: Option<String>) {
        if self.transition(generation, ConnectionState::Closed) {
            let message = match reason {
                Some(reason) => format!("Session closed: {}", reason),
                None => "Session closed".to_string(),
            };
            log::info!("{}", message);
            self.emit_status(ConnectionState::Closed, message);
        }
    }

    fn fail(&self, generation: u64, message: String) {
        if self.transition(generation, ConnectionState::Error) {
            log::error!("{}", message);
            self.emit(SessionEvent::Error {
                message: message.clone(),
            });
            self.emit_status(ConnectionState::Error, message);
        }
    }

    /// Move to `next` if `generation` is still the live one
    fn transition(&self, generation: u64, next: ConnectionState) -> bool {
        let mut state = self.lock_state();
        if self.inner.generation.load(Ordering::Acquire) != generation {
            return false;
        }
        *state = next;
        true
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::Acquire) == generation
    }

    fn emit_status(&self, state: ConnectionState, message: impl Into<String>) {
        self.emit(SessionEvent::Status {
            state,
            message: message.into(),
        });
    }

    fn emit(&self, event: SessionEvent) {
        if let Err(err) = self.inner.events.send(event) {
            log::trace!("No listener for session event {:?}", err.0);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ConnectionState> {
        match self.inner.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Clears the in-flight flag when the send finishes or is cancelled
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
