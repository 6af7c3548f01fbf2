//! Vision-tracking session for hebi
//!
//! Streams camera frames to a hosted multimodal model over a bidirectional
//! channel and turns its `update_finger_position` tool calls into
//! [`hebi_core::FingerSignal`]s.

pub mod capture;
pub mod config;
pub mod error;
pub mod frame;
pub mod protocol;
pub mod sampler;
pub mod session;
pub mod transport;
pub mod websocket;

pub use capture::{CameraError, FrameSource, ImageDirSource, TestPatternSource};
pub use config::{SessionConfig, SessionConfigError};
pub use error::{SessionError, TransportError};
pub use frame::{EncodedFrame, FrameEncodeError, encode_jpeg};
pub use protocol::{
    FunctionResponse, MediaChunk, POSITION_TOOL, ServerEvent, SessionSetup, ToolInvocation,
};
pub use sampler::{FrameSampler, SampleOutcome, SamplerSnapshot, SamplerStats};
pub use session::{
    ConnectionState, FrameDisposition, SessionAdapter, SessionChannels, SessionEvent,
};
pub use transport::{InboundEvents, LiveTransport, TransportEvent};
pub use websocket::WebSocketTransport;
