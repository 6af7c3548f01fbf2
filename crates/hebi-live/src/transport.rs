//! Backend-agnostic bidirectional channel

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::protocol::{FunctionResponse, MediaChunk, ServerEvent, SessionSetup};

/// Everything the channel reports back after `open`
#[derive(Debug)]
pub enum TransportEvent {
    Message(ServerEvent),
    Closed { reason: Option<String> },
    Error(TransportError),
}

pub type InboundEvents = mpsc::UnboundedReceiver<TransportEvent>;

/// One live connection at a time; `open` replaces any previous one.
///
/// Implementations deliver inbound traffic in order on the returned channel
/// and end it with `Closed` or `Error`.
#[async_trait]
pub trait LiveTransport: Send + Sync + 'static {
    /// Connect and send the handshake
    async fn open(&self, setup: &SessionSetup) -> Result<InboundEvents, TransportError>;

    /// Push one media chunk
    async fn send_frame(&self, chunk: MediaChunk) -> Result<(), TransportError>;

    /// Acknowledge one tool invocation
    async fn acknowledge(&self, response: FunctionResponse) -> Result<(), TransportError>;

    /// Close the current connection; a no-op when none is open
    async fn close(&self) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: LiveTransport + ?Sized> LiveTransport for Arc<T> {
    async fn open(&self, setup: &SessionSetup) -> Result<InboundEvents, TransportError> {
        (**self).open(setup).await
    }

    async fn send_frame(&self, chunk: MediaChunk) -> Result<(), TransportError> {
        (**self).send_frame(chunk).await
    }

    async fn acknowledge(&self, response: FunctionResponse) -> Result<(), TransportError> {
        (**self).acknowledge(response).await
    }

    async fn close(&self) -> Result<(), TransportError> {
        (**self).close().await
    }
}
