//! Wire format of the bidirectional live session
//!
//! Client messages are single-key JSON objects (`{"setup": ...}`,
//! `{"realtimeInput": ...}`, `{"toolResponse": ...}`). Server messages carry
//! at most one of `setupComplete`, `toolCall`, `toolCallCancellation`,
//! `serverContent` or `goAway`.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use web_time::Instant;

use hebi_core::FingerSignal;

use crate::config::SessionConfig;

/// Function the backend calls with fingertip coordinates
pub const POSITION_TOOL: &str = "update_finger_position";

/// MIME type of every pushed frame
pub const FRAME_MIME_TYPE: &str = "image/jpeg";

const SYSTEM_INSTRUCTION: &str = "You are a hand tracker. You receive a stream of camera frames. \
For every frame, find the tip of the index finger and immediately call \
update_finger_position with its normalized coordinates: x from 0.0 (left edge) to 1.0 \
(right edge), y from 0.0 (top edge) to 1.0 (bottom edge). Keep calling the function for \
every new frame. Do not speak, do not describe the image, and never answer in natural \
language; function calls are your only output.";

// ============================================================================
// Client → server
// ============================================================================

/// Outbound message envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(SessionSetup),
    RealtimeInput(RealtimeInput),
    ToolResponse(ToolResponse),
}

impl ClientMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Handshake payload sent once when the socket opens
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSetup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: Content,
    pub tools: Vec<ToolSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Required by the backend even though only tool calls are consumed
    pub response_modalities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSet {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    /// OpenAPI-style schema object
    pub parameters: Value,
}

impl SessionSetup {
    /// Setup declaring the fingertip tool and the silent-tracker instruction
    pub fn finger_tracking(config: &SessionConfig) -> Self {
        let model = if config.model.starts_with("models/") {
            config.model.clone()
        } else {
            format!("models/{}", config.model)
        };

        Self {
            model,
            generation_config: GenerationConfig {
                response_modalities: vec![config.response_modality.clone()],
            },
            system_instruction: Content {
                parts: vec![Part {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
            },
            tools: vec![ToolSet {
                function_declarations: vec![position_tool()],
            }],
        }
    }
}

fn position_tool() -> FunctionDeclaration {
    FunctionDeclaration {
        name: POSITION_TOOL.to_string(),
        description: "Report the current position of the index fingertip in the camera frame."
            .to_string(),
        parameters: json!({
            "type": "OBJECT",
            "properties": {
                "x": {
                    "type": "NUMBER",
                    "description": "Horizontal position, 0.0 (left) to 1.0 (right)",
                    "minimum": 0.0,
                    "maximum": 1.0
                },
                "y": {
                    "type": "NUMBER",
                    "description": "Vertical position, 0.0 (top) to 1.0 (bottom)",
                    "minimum": 0.0,
                    "maximum": 1.0
                }
            },
            "required": ["x", "y"]
        }),
    }
}

/// Streaming media input
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

/// One pushed frame: `{mimeType, data}` with base64 data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaChunk {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub function_responses: Vec<FunctionResponse>,
}

/// Acknowledgement of one tool invocation, correlated by `id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub id: String,
    pub name: String,
    pub response: Value,
}

impl FunctionResponse {
    /// `{id, name, response: {result: "ok"}}` for `invocation`
    pub fn ok(invocation: &ToolInvocation) -> Self {
        Self {
            id: invocation.id.clone(),
            name: invocation.name.clone(),
            response: json!({ "result": "ok" }),
        }
    }
}

// ============================================================================
// Server → client
// ============================================================================

/// One inbound request from the backend
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolInvocation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

/// Why an invocation could not be turned into a signal
#[derive(Debug, Error, PartialEq)]
pub enum MalformedInvocation {
    #[error("unexpected tool `{0}`")]
    UnknownTool(String),
    #[error("missing numeric argument `{0}`")]
    MissingArgument(&'static str),
    #[error("non-finite coordinates")]
    NonFinite,
}

impl ToolInvocation {
    /// Decode `{x, y}` into a signal stamped `now`
    pub fn finger_signal(&self, now: Instant) -> Result<FingerSignal, MalformedInvocation> {
        if self.name != POSITION_TOOL {
            return Err(MalformedInvocation::UnknownTool(self.name.clone()));
        }
        let x = self.number_arg("x")?;
        let y = self.number_arg("y")?;
        FingerSignal::new(x as f32, y as f32, now).ok_or(MalformedInvocation::NonFinite)
    }

    fn number_arg(&self, key: &'static str) -> Result<f64, MalformedInvocation> {
        self.args
            .get(key)
            .and_then(Value::as_f64)
            .ok_or(MalformedInvocation::MissingArgument(key))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawServerMessage {
    setup_complete: Option<Value>,
    tool_call: Option<RawToolCall>,
    tool_call_cancellation: Option<RawCancellation>,
    server_content: Option<Value>,
    go_away: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawToolCall {
    #[serde(default)]
    function_calls: Vec<ToolInvocation>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCancellation {
    #[serde(default)]
    ids: Vec<String>,
}

/// Decoded inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Handshake accepted
    SetupComplete,
    /// Zero or more invocations, each needing one acknowledgement
    ToolCall(Vec<ToolInvocation>),
    /// Backend withdrew earlier invocations
    ToolCallCancellation(Vec<String>),
    /// Natural-language / audio output (not consumed)
    Content,
    /// Server is about to drop the connection
    GoAway(Option<String>),
    /// Anything else
    Unknown,
}

impl ServerEvent {
    /// Parse one inbound frame (text or binary JSON)
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: RawServerMessage = serde_json::from_slice(bytes)?;
        Ok(if raw.setup_complete.is_some() {
            Self::SetupComplete
        } else if let Some(call) = raw.tool_call {
            Self::ToolCall(call.function_calls)
        } else if let Some(cancel) = raw.tool_call_cancellation {
            Self::ToolCallCancellation(cancel.ids)
        } else if let Some(go_away) = raw.go_away {
            Self::GoAway(
                go_away
                    .get("timeLeft")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            )
        } else if raw.server_content.is_some() {
            Self::Content
        } else {
            Self::Unknown
        })
    }
}
