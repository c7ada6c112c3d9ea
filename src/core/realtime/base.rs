//! Base types and the link trait for the streaming voice model.
//!
//! The bridge owns exactly one model link per phone call. The link is a
//! thin seam: it carries base64 µ-law audio payloads opaquely in both
//! directions and surfaces server events as a typed stream the call
//! orchestrator consumes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur on the voice-model link.
#[derive(Debug, Error)]
pub enum VoiceLinkError {
    /// Connection to the model endpoint failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Link is not open
    #[error("Not connected")]
    NotConnected,
}

/// Result type for voice-link operations.
pub type VoiceLinkResult<T> = Result<T, VoiceLinkError>;

// =============================================================================
// Link State
// =============================================================================

/// Lifecycle of the voice-model link.
///
/// `Connecting → Open → Configured → Streaming → Closed`; `Closed` is
/// terminal whether reached by orderly teardown or transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ModelLinkState {
    /// Handshake in progress
    #[default]
    Connecting = 0,
    /// Socket established, session not yet configured
    Open = 1,
    /// Session configuration sent, audio accepted
    Configured = 2,
    /// Caller audio has been forwarded at least once
    Streaming = 3,
    /// Terminal
    Closed = 4,
}

impl ModelLinkState {
    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Configured,
            3 => Self::Streaming,
            _ => Self::Closed,
        }
    }

    /// Whether the link accepts caller audio in this state.
    pub fn accepts_audio(self) -> bool {
        matches!(self, Self::Configured | Self::Streaming)
    }
}

impl fmt::Display for ModelLinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Configured => write!(f, "configured"),
            Self::Streaming => write!(f, "streaming"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

// =============================================================================
// Session Configuration
// =============================================================================

/// Audio format shared with the telephony leg. No transcoding happens
/// anywhere in the bridge: both sides speak 8kHz G.711 µ-law.
pub const G711_ULAW_FORMAT: &str = "g711_ulaw";

/// Server-side voice-activity-detection tuning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VadTuning {
    /// Activation threshold (0.0 to 1.0)
    pub threshold: f32,
    /// Leading audio included before detected speech (ms)
    pub prefix_padding_ms: u32,
    /// Trailing silence that ends a turn (ms)
    pub silence_duration_ms: u32,
}

impl Default for VadTuning {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 500,
        }
    }
}

/// A single callable tool exposed to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Function name
    pub name: String,
    /// Function description
    pub description: String,
    /// JSON schema for the arguments
    pub parameters: serde_json::Value,
}

impl ToolSchema {
    /// The meeting-booking tool, the only tool the bridge registers.
    pub fn book_meeting() -> Self {
        Self {
            name: crate::core::bridge::BOOK_MEETING_TOOL.to_string(),
            description: "Book a meeting with the caller on the team calendar. \
                          Call this once the caller has agreed on a date and time."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "date": {
                        "type": "string",
                        "description": "Meeting date, YYYY-MM-DD"
                    },
                    "time": {
                        "type": "string",
                        "description": "Meeting start time, HH:MM, 24-hour"
                    },
                    "duration_minutes": {
                        "type": "integer",
                        "description": "Meeting length in minutes, defaults to 60"
                    }
                },
                "required": ["date", "time"]
            }),
        }
    }
}

/// Session configuration sent to the model immediately after the socket
/// opens.
#[derive(Debug, Clone)]
pub struct VoiceSessionConfig {
    /// System instructions, with the current date already interpolated
    pub instructions: String,
    /// Voice used for audio output
    pub voice: String,
    /// Server-side VAD tuning
    pub vad: VadTuning,
    /// Tools available to the model
    pub tools: Vec<ToolSchema>,
}

impl VoiceSessionConfig {
    /// Standard booking-assistant session: both modalities, µ-law audio,
    /// server VAD, and the single `book_meeting` tool.
    pub fn booking_assistant(instructions: String, voice: String, vad: VadTuning) -> Self {
        Self {
            instructions,
            voice,
            vad,
            tools: vec![ToolSchema::book_meeting()],
        }
    }
}

// =============================================================================
// Events surfaced to the orchestrator
// =============================================================================

/// Typed events the model link delivers to the call orchestrator.
///
/// `ModelError` is an in-band error event and does not by itself end the
/// session; `TransportError` is fatal for the link.
#[derive(Debug, Clone)]
pub enum ModelEvent {
    /// The model acknowledged the session
    SessionCreated {
        /// Provider-assigned session id
        session_id: String,
    },
    /// A chunk of spoken response audio (base64 µ-law, passed through opaquely)
    AudioDelta {
        /// Base64-encoded audio payload
        payload: String,
    },
    /// A fragment of the assistant's spoken transcript
    TranscriptDelta {
        /// Transcript text fragment
        text: String,
    },
    /// The model finished streaming arguments for a tool call
    ToolCallDone {
        /// Model-side correlation id for the call
        call_id: String,
        /// Tool name
        name: String,
        /// Raw JSON argument text
        arguments: String,
    },
    /// In-band error reported by the model
    ModelError {
        /// Error description
        message: String,
    },
    /// The link failed at the transport level
    TransportError {
        /// Error description
        message: String,
    },
    /// The peer closed the link
    Closed,
}

// =============================================================================
// Link Trait
// =============================================================================

/// The outbound voice-model link owned by one call.
///
/// `Send + Sync` so a boxed link can live inside the bridge state a
/// WebSocket handler future holds across awaits. Implementations must
/// make `close` idempotent: closing an already-closed link is a no-op.
#[async_trait]
pub trait ModelLink: Send + Sync {
    /// Current lifecycle state.
    fn state(&self) -> ModelLinkState;

    /// Forward one caller audio payload (base64 µ-law, opaque).
    ///
    /// Valid while the link is `Configured` or later. Forwarding is
    /// fire-and-forget: a congested link drops the frame rather than
    /// stalling the audio path.
    fn send_audio(&self, payload: &str) -> VoiceLinkResult<()>;

    /// Send a tool result back into the model's conversation stream,
    /// correlated by the model's `call_id`.
    async fn submit_tool_result(&self, call_id: &str, output: &str) -> VoiceLinkResult<()>;

    /// Terminate the link. Idempotent.
    async fn close(&mut self);
}
