//! In-memory transport for driving the session adapter in tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio::time::timeout;

use hebi_live::protocol::POSITION_TOOL;
use hebi_live::{
    ConnectionState, FunctionResponse, InboundEvents, LiveTransport, MediaChunk, ServerEvent,
    SessionAdapter, SessionChannels, SessionConfig, SessionEvent, SessionSetup, ToolInvocation,
    TransportError, TransportEvent,
};

pub const WAIT: Duration = Duration::from_secs(2);

#[derive(Default)]
pub struct MockTransport {
    inbound: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub fail_open: AtomicBool,
    pub fail_close: AtomicBool,
    pub ack_attempts: AtomicUsize,
    frames: Mutex<Vec<MediaChunk>>,
    acks: Mutex<Vec<FunctionResponse>>,
    frame_gate: Mutex<Option<Arc<Semaphore>>>,
    ack_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl MockTransport {
    /// Deliver `event` as if it came from the server
    pub fn push(&self, event: TransportEvent) {
        let sender = self.sender().expect("transport not open");
        sender.send(event).expect("session stopped listening");
    }

    pub fn sender(&self) -> Option<mpsc::UnboundedSender<TransportEvent>> {
        self.inbound.lock().unwrap().clone()
    }

    pub fn frames(&self) -> Vec<MediaChunk> {
        self.frames.lock().unwrap().clone()
    }

    pub fn acks(&self) -> Vec<FunctionResponse> {
        self.acks.lock().unwrap().clone()
    }

    pub fn ack_ids(&self) -> Vec<String> {
        self.acks().into_iter().map(|a| a.id).collect()
    }

    /// Hold every frame push until a permit is added to the returned gate
    pub fn gate_frames(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.frame_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Hold every acknowledgement until a permit is added to the returned gate
    pub fn gate_acks(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.ack_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }
}

#[async_trait]
impl LiveTransport for MockTransport {
    async fn open(&self, _setup: &SessionSetup) -> Result<InboundEvents, TransportError> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(TransportError::Connect("connection refused".to_string()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *self.inbound.lock().unwrap() = Some(tx);
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(rx)
    }

    async fn send_frame(&self, chunk: MediaChunk) -> Result<(), TransportError> {
        let gate = self.frame_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        self.frames.lock().unwrap().push(chunk);
        Ok(())
    }

    async fn acknowledge(&self, response: FunctionResponse) -> Result<(), TransportError> {
        self.ack_attempts.fetch_add(1, Ordering::SeqCst);
        let gate = self.ack_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        self.acks.lock().unwrap().push(response);
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        self.inbound.lock().unwrap().take();
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(TransportError::Socket("close handshake failed".to_string()));
        }
        Ok(())
    }
}

pub type MockSession = SessionAdapter<Arc<MockTransport>>;

pub fn new_session() -> (Arc<MockTransport>, MockSession, SessionChannels) {
    let transport = Arc::new(MockTransport::default());
    let setup = SessionSetup::finger_tracking(&SessionConfig::default());
    let (session, channels) = SessionAdapter::new(Arc::clone(&transport), setup);
    (transport, session, channels)
}

/// Connect and complete the handshake
pub async fn open_session() -> (Arc<MockTransport>, MockSession, SessionChannels) {
    let (transport, session, mut channels) = new_session();
    session.connect().await.unwrap();
    transport.push(TransportEvent::Message(ServerEvent::SetupComplete));
    wait_for_state(&mut channels, ConnectionState::Open).await;
    (transport, session, channels)
}

pub async fn next_event(channels: &mut SessionChannels) -> SessionEvent {
    timeout(WAIT, channels.events.recv())
        .await
        .expect("timed out waiting for a session event")
        .expect("event channel closed")
}

/// Skip events until a status with `state` arrives; returns its message
pub async fn wait_for_state(channels: &mut SessionChannels, state: ConnectionState) -> String {
    loop {
        if let SessionEvent::Status { state: got, message } = next_event(channels).await {
            if got == state {
                return message;
            }
        }
    }
}

pub async fn wait_until_sending(session: &MockSession) {
    timeout(WAIT, async {
        while !session.is_sending() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("frame never went in flight");
}

pub fn position_call(id: &str, x: f64, y: f64) -> ToolInvocation {
    ToolInvocation {
        id: id.to_string(),
        name: POSITION_TOOL.to_string(),
        args: json!({ "x": x, "y": y }),
    }
}

pub fn tool_call(invocations: Vec<ToolInvocation>) -> TransportEvent {
    TransportEvent::Message(ServerEvent::ToolCall(invocations))
}
