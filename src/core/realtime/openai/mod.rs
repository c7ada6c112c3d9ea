//! OpenAI Realtime API module.
//!
//! Real-time audio-to-audio streaming over OpenAI's Realtime API,
//! specialized for telephone calls.
//!
//! # Supported Models
//!
//! - `gpt-4o-realtime-preview` - GPT-4o Realtime Preview (default)
//! - `gpt-4o-realtime-preview-2024-12-17` - December 2024 version
//! - `gpt-4o-mini-realtime-preview` - Mini model for lower latency
//!
//! # Supported Voices
//!
//! alloy, ash, coral, echo, sage, shimmer, verse
//!
//! # Audio Format
//!
//! Both directions use G.711 µ-law at 8kHz, base64 encoded, matching
//! the telephony media stream so no transcoding is needed in between.

mod client;
mod config;
mod messages;

pub use client::OpenAiModelLink;
pub use config::{
    AuthScheme, OPENAI_REALTIME_URL, OpenAiLinkConfig, OpenAiRealtimeModel, OpenAiRealtimeVoice,
};
pub use messages::{ClientEvent, ServerEvent, SessionConfig, TurnDetection};
