//! Realtime voice model module.
//!
//! Abstractions and the OpenAI implementation for real-time
//! bidirectional audio streaming with transcription and tool calls.
//!
//! # Architecture
//!
//! - `ModelLink` trait for the provider seam
//! - Event delivery over an `mpsc` channel owned by the call bridge
//! - One link per phone call, no reconnection
//!
//! # Audio Format
//!
//! G.711 µ-law at 8kHz, base64 encoded, end to end.

mod base;
pub mod openai;

pub use base::{
    G711_ULAW_FORMAT, ModelEvent, ModelLink, ModelLinkState, ToolSchema, VadTuning,
    VoiceLinkError, VoiceLinkResult, VoiceSessionConfig,
};
pub use openai::{
    AuthScheme, OPENAI_REALTIME_URL, OpenAiLinkConfig, OpenAiModelLink, OpenAiRealtimeModel,
    OpenAiRealtimeVoice,
};
