//! Telephony media-stream WebSocket message types.
//!
//! Wire format for the bidirectional media stream the telephony
//! provider opens against `/telephony/media-stream`. Events are JSON
//! objects tagged by an `event` field.
//!
//! Inbound events:
//! - `connected` - Socket-level handshake, carries no call identity
//! - `start` - Call metadata: callSid, streamSid, custom parameters
//! - `media` - One base64 µ-law audio frame from the caller
//! - `stop` - The call ended on the provider side
//!
//! Outbound frames are always `media`, addressed by streamSid.

use serde::{Deserialize, Serialize};

// =============================================================================
// Inbound Events
// =============================================================================

/// Events received from the telephony media stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyEvent {
    /// WebSocket connected, no call identity yet
    Connected,

    /// Stream started, carries the call identity
    Start {
        /// Stream metadata
        start: StartMeta,
    },

    /// One audio frame from the caller
    Media {
        /// Frame payload
        media: MediaPayload,
    },

    /// The provider ended the stream
    Stop,
}

/// Metadata delivered with the `start` event.
#[derive(Debug, Clone, Deserialize)]
pub struct StartMeta {
    /// Provider call identifier
    #[serde(rename = "callSid")]
    pub call_sid: String,

    /// Stream identifier, required to address outbound media
    #[serde(rename = "streamSid")]
    pub stream_sid: String,

    /// CRM parameters attached when the call was placed
    #[serde(rename = "customParameters", default)]
    pub custom_parameters: CustomParameters,
}

/// Custom parameters the CRM attaches to outbound calls.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomParameters {
    /// CRM lead identifier
    #[serde(rename = "leadId")]
    pub lead_id: Option<String>,

    /// Lead display name, used in the assistant greeting
    #[serde(rename = "leadName")]
    pub lead_name: Option<String>,
}

/// Audio payload of a `media` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaPayload {
    /// Base64-encoded G.711 µ-law bytes
    pub payload: String,
}

// =============================================================================
// Outbound Frames
// =============================================================================

/// Outbound media frame addressed to the telephony stream.
#[derive(Debug, Clone, Serialize)]
pub struct MediaFrame {
    /// Event tag, always "media"
    pub event: &'static str,

    /// Stream this frame belongs to
    #[serde(rename = "streamSid")]
    pub stream_sid: String,

    /// Frame payload
    pub media: MediaPayload,
}

impl MediaFrame {
    /// Address a model audio delta to the given stream.
    pub fn new(stream_sid: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            event: "media",
            stream_sid: stream_sid.into(),
            media: MediaPayload {
                payload: payload.into(),
            },
        }
    }
}
