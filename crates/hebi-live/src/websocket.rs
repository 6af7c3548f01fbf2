//! WebSocket transport for the hosted live API

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::config::SessionConfig;
use crate::error::TransportError;
use crate::protocol::{
    ClientMessage, FunctionResponse, MediaChunk, RealtimeInput, ServerEvent, SessionSetup,
    ToolResponse,
};
use crate::transport::{InboundEvents, LiveTransport, TransportEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

pub struct WebSocketTransport {
    endpoint: String,
    url: Option<String>,
    sink: Mutex<Option<WsSink>>,
    reader: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl WebSocketTransport {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            url: config.url(),
            sink: Mutex::new(None),
            reader: std::sync::Mutex::new(None),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.url.is_some()
    }

    async fn send(&self, message: &ClientMessage) -> Result<(), TransportError> {
        let text = message.to_json()?;
        let mut sink = self.sink.lock().await;
        let sink = sink.as_mut().ok_or(TransportError::NotOpen)?;
        sink.send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    fn stop_reader(&self) {
        let handle = match self.reader.lock() {
            Ok(mut reader) => reader.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

#[async_trait]
impl LiveTransport for WebSocketTransport {
    async fn open(&self, setup: &SessionSetup) -> Result<InboundEvents, TransportError> {
        let url = self.url.as_deref().ok_or(TransportError::MissingCredential)?;

        // Drop whatever connection was there before
        self.stop_reader();
        if let Some(mut old) = self.sink.lock().await.take() {
            let _ = old.close().await;
        }

        log::info!("Connecting to {}", self.endpoint);
        let (socket, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (mut sink, stream) = socket.split();

        let handshake = ClientMessage::Setup(setup.clone()).to_json()?;
        sink.send(Message::Text(handshake.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;
        log::debug!("Sent session setup for {}", setup.model);

        *self.sink.lock().await = Some(sink);

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(read_loop(stream, tx));
        match self.reader.lock() {
            Ok(mut reader) => *reader = Some(handle),
            Err(poisoned) => *poisoned.into_inner() = Some(handle),
        }

        Ok(rx)
    }

    async fn send_frame(&self, chunk: MediaChunk) -> Result<(), TransportError> {
        self.send(&ClientMessage::RealtimeInput(RealtimeInput {
            media_chunks: vec![chunk],
        }))
        .await
    }

    async fn acknowledge(&self, response: FunctionResponse) -> Result<(), TransportError> {
        self.send(&ClientMessage::ToolResponse(ToolResponse {
            function_responses: vec![response],
        }))
        .await
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.stop_reader();
        let Some(mut sink) = self.sink.lock().await.take() else {
            return Ok(());
        };
        log::debug!("Closing live socket");
        sink.close()
            .await
            .map_err(|e| TransportError::Socket(e.to_string()))
    }
}

async fn read_loop(mut stream: SplitStream<WsStream>, tx: mpsc::UnboundedSender<TransportEvent>) {
    while let Some(message) = stream.next().await {
        let payload = match message {
            Ok(Message::Text(text)) => decode(text.as_bytes()),
            Ok(Message::Binary(bytes)) => decode(&bytes),
            Ok(Message::Close(frame)) => {
                let reason = frame
                    .map(|f| f.reason.to_string())
                    .filter(|r| !r.is_empty());
                log::info!("Live socket closed by server: {:?}", reason);
                let _ = tx.send(TransportEvent::Closed { reason });
                return;
            }
            Ok(_) => continue,
            Err(e) => {
                let _ = tx.send(TransportEvent::Error(TransportError::Socket(e.to_string())));
                return;
            }
        };

        if let Some(event) = payload {
            if tx.send(TransportEvent::Message(event)).is_err() {
                // Receiver gone; the session was torn down
                return;
            }
        }
    }

    let _ = tx.send(TransportEvent::Closed { reason: None });
}

fn decode(bytes: &[u8]) -> Option<ServerEvent> {
    match ServerEvent::from_slice(bytes) {
        Ok(event) => Some(event),
        Err(e) => {
            log::warn!("Skipping undecodable server message: {}", e);
            None
        }
    }
}
