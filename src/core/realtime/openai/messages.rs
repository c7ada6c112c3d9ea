//! OpenAI Realtime API WebSocket message types.
//!
//! Only the events the bridge actually exchanges are modeled.
//!
//! Client events (sent to the model):
//! - session.update - Configure the session right after connect
//! - input_audio_buffer.append - Forward one caller audio payload
//! - conversation.item.create - Deliver a tool result (function_call_output)
//!
//! Server events (received from the model):
//! - session.created
//! - response.audio.delta
//! - response.audio_transcript.delta
//! - response.function_call_arguments.done
//! - error
//!
//! Anything else the server sends deserializes into `Unknown` and is
//! discarded by the read loop.

use serde::{Deserialize, Serialize};

use super::super::base::{VadTuning, VoiceSessionConfig, G711_ULAW_FORMAT};

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration payload for `session.update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Response modalities (text, audio)
    pub modalities: Vec<String>,

    /// System instructions for the assistant
    pub instructions: String,

    /// Voice for audio output
    pub voice: String,

    /// Input audio format
    pub input_audio_format: String,

    /// Output audio format
    pub output_audio_format: String,

    /// Turn detection configuration
    pub turn_detection: TurnDetection,

    /// Tool definitions
    pub tools: Vec<ToolDef>,
}

impl SessionConfig {
    /// Build the one configuration message this bridge sends: both
    /// modalities, µ-law on both legs, server VAD, and the registered
    /// tool schema.
    pub fn from_session(session: &VoiceSessionConfig) -> Self {
        Self {
            modalities: vec!["text".to_string(), "audio".to_string()],
            instructions: session.instructions.clone(),
            voice: session.voice.clone(),
            input_audio_format: G711_ULAW_FORMAT.to_string(),
            output_audio_format: G711_ULAW_FORMAT.to_string(),
            turn_detection: TurnDetection::server_vad(session.vad),
            tools: session
                .tools
                .iter()
                .map(|t| ToolDef {
                    tool_type: "function".to_string(),
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                })
                .collect(),
        }
    }
}

/// Turn detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold
        threshold: f32,
        /// Audio prefix padding in ms
        prefix_padding_ms: u32,
        /// Silence duration in ms
        silence_duration_ms: u32,
    },
}

impl TurnDetection {
    fn server_vad(vad: VadTuning) -> Self {
        Self::ServerVad {
            threshold: vad.threshold,
            prefix_padding_ms: vad.prefix_padding_ms,
            silence_duration_ms: vad.silence_duration_ms,
        }
    }
}

/// Tool definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    /// Tool type (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function name
    pub name: String,
    /// Function description
    pub description: String,
    /// Function parameters JSON schema
    pub parameters: serde_json::Value,
}

// =============================================================================
// Conversation Items
// =============================================================================

/// The one conversation item the bridge creates: a tool result
/// correlated back to the model's call id.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionCallOutputItem {
    /// Item type, always "function_call_output"
    #[serde(rename = "type")]
    pub item_type: &'static str,
    /// The model's tool-call id
    pub call_id: String,
    /// Result JSON text
    pub output: String,
}

impl FunctionCallOutputItem {
    /// Wrap a tool result for the given call id.
    pub fn new(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            item_type: "function_call_output",
            call_id: call_id.into(),
            output: output.into(),
        }
    }
}

// =============================================================================
// Client Events (sent to the model)
// =============================================================================

/// Client events sent to the OpenAI Realtime API.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Append caller audio to the input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded audio payload, forwarded opaquely
        audio: String,
    },

    /// Create a conversation item (tool result)
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        /// Item to create
        item: FunctionCallOutputItem,
    },
}

impl ClientEvent {
    /// Caller audio append. The payload is already base64 µ-law straight
    /// off the telephony leg; it is not decoded or re-encoded here.
    pub fn audio_append(payload: impl Into<String>) -> Self {
        ClientEvent::InputAudioBufferAppend {
            audio: payload.into(),
        }
    }

    /// Tool result for the given call id.
    pub fn tool_output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        ClientEvent::ConversationItemCreate {
            item: FunctionCallOutputItem::new(call_id, output),
        }
    }
}

// =============================================================================
// Server Events (received from the model)
// =============================================================================

/// Server events received from the OpenAI Realtime API.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Error occurred (in-band, often recoverable mid-conversation)
    #[serde(rename = "error")]
    Error {
        /// Error details
        error: ApiError,
    },

    /// Session created
    #[serde(rename = "session.created")]
    SessionCreated {
        /// Session information
        session: Session,
    },

    /// Audio delta (base64 µ-law chunk of the spoken response)
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        /// Base64-encoded audio delta
        delta: String,
    },

    /// Audio transcript delta
    #[serde(rename = "response.audio_transcript.delta")]
    AudioTranscriptDelta {
        /// Transcript fragment
        delta: String,
    },

    /// Function call arguments done
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        /// Call ID
        call_id: String,
        /// Function name
        #[serde(default)]
        name: String,
        /// Full arguments JSON text
        arguments: String,
    },

    /// Any event type the bridge does not consume
    #[serde(other)]
    Unknown,
}

/// API error information.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type", default)]
    pub error_type: String,
    /// Error code
    #[serde(default)]
    pub code: Option<String>,
    /// Error message
    pub message: String,
}

/// Session information.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    /// Session ID
    pub id: String,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::realtime::base::ToolSchema;

    #[test]
    fn test_audio_append_serialization() {
        let event = ClientEvent::audio_append("bXVsYXc=");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"input_audio_buffer.append""#));
        assert!(json.contains(r#""audio":"bXVsYXc=""#));
    }

    #[test]
    fn test_session_update_serialization() {
        let session = VoiceSessionConfig::booking_assistant(
            "You book meetings.".to_string(),
            "alloy".to_string(),
            VadTuning::default(),
        );
        let event = ClientEvent::SessionUpdate {
            session: SessionConfig::from_session(&session),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("session.update"));
        assert!(json.contains(r#""input_audio_format":"g711_ulaw""#));
        assert!(json.contains(r#""output_audio_format":"g711_ulaw""#));
        assert!(json.contains("server_vad"));
        assert!(json.contains("book_meeting"));
    }

    #[test]
    fn test_tool_output_round_trips_call_id() {
        let event = ClientEvent::tool_output("call_789", r#"{"success":true}"#);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"conversation.item.create""#));
        assert!(json.contains(r#""type":"function_call_output""#));
        assert!(json.contains(r#""call_id":"call_789""#));
    }

    #[test]
    fn test_audio_delta_deserialization() {
        let json = r#"{"type":"response.audio.delta","delta":"AAAA"}"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        match event {
            ServerEvent::AudioDelta { delta } => assert_eq!(delta, "AAAA"),
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_function_call_done_deserialization() {
        let json = r#"{
            "type": "response.function_call_arguments.done",
            "call_id": "call_1",
            "name": "book_meeting",
            "arguments": "{\"date\":\"2025-03-10\",\"time\":\"14:00\"}"
        }"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        match event {
            ServerEvent::FunctionCallArgumentsDone {
                call_id,
                name,
                arguments,
            } => {
                assert_eq!(call_id, "call_1");
                assert_eq!(name, "book_meeting");
                assert!(arguments.contains("2025-03-10"));
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_error_deserialization() {
        let json = r#"{
            "type": "error",
            "error": {"type": "invalid_request_error", "message": "bad"}
        }"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        match event {
            ServerEvent::Error { error } => assert_eq!(error.message, "bad"),
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_unknown_event_is_tolerated() {
        let json = r#"{"type":"rate_limits.updated","rate_limits":[]}"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, ServerEvent::Unknown));
    }

    #[test]
    fn test_tool_def_mapping() {
        let schema = ToolSchema::book_meeting();
        let session = VoiceSessionConfig {
            instructions: String::new(),
            voice: "verse".to_string(),
            vad: VadTuning::default(),
            tools: vec![schema],
        };
        let cfg = SessionConfig::from_session(&session);
        assert_eq!(cfg.tools.len(), 1);
        assert_eq!(cfg.tools[0].tool_type, "function");
        assert_eq!(cfg.tools[0].name, "book_meeting");
    }
}
