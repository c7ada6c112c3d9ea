//! Per-call session state.
//!
//! One [`CallSession`] exists per telephony media stream. It is owned
//! by the call bridge and only touched from the bridge's event loop, so
//! no locking is involved.

/// Lead name used when the CRM attached no name to the call.
pub const UNKNOWN_LEAD_NAME: &str = "Unknown";

/// Lifecycle of the telephony leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelephonyLinkState {
    /// Socket open, `start` not yet received
    Connected,
    /// `start` received, audio may flow
    Streaming,
    /// `stop` received or the socket dropped
    Stopped,
}

impl std::fmt::Display for TelephonyLinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelephonyLinkState::Connected => write!(f, "connected"),
            TelephonyLinkState::Streaming => write!(f, "streaming"),
            TelephonyLinkState::Stopped => write!(f, "stopped"),
        }
    }
}

/// State accumulated over one bridged call.
#[derive(Debug)]
pub struct CallSession {
    /// Provider call identifier, known after `start`
    pub call_sid: Option<String>,
    /// Stream identifier for outbound media, known after `start`
    pub stream_sid: Option<String>,
    /// CRM lead identifier, if the call was placed against a lead
    pub lead_id: Option<String>,
    /// Lead display name for the assistant greeting
    pub lead_name: String,
    /// Telephony leg lifecycle
    pub telephony_state: TelephonyLinkState,
    /// Assistant transcript fragments, in arrival order
    pub transcript: Vec<String>,
    /// Set once a meeting was booked during this call, never cleared
    pub meeting_scheduled: bool,
    /// Guards against writing a second terminal status to the CRM
    pub final_status_written: bool,
}

impl CallSession {
    pub fn new() -> Self {
        Self {
            call_sid: None,
            stream_sid: None,
            lead_id: None,
            lead_name: UNKNOWN_LEAD_NAME.to_string(),
            telephony_state: TelephonyLinkState::Connected,
            transcript: Vec::new(),
            meeting_scheduled: false,
            final_status_written: false,
        }
    }

    /// Record the identity carried by the `start` event.
    pub fn begin_stream(&mut self, start: &crate::core::telephony::StartMeta) {
        self.call_sid = Some(start.call_sid.clone());
        self.stream_sid = Some(start.stream_sid.clone());
        self.lead_id = start.custom_parameters.lead_id.clone();
        if let Some(name) = &start.custom_parameters.lead_name {
            self.lead_name = name.clone();
        }
        self.telephony_state = TelephonyLinkState::Streaming;
    }

    /// Whether caller audio can be forwarded to the model.
    pub fn streaming(&self) -> bool {
        self.telephony_state == TelephonyLinkState::Streaming
    }

    /// Full assistant transcript as a single string.
    pub fn transcript_text(&self) -> String {
        self.transcript.concat()
    }
}

impl Default for CallSession {
    fn default() -> Self {
        Self::new()
    }
}
