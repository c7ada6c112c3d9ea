pub mod bridge;
pub mod realtime;
pub mod telephony;

// Re-export commonly used types for convenience
pub use bridge::{CallBridge, CallSession, TelephonyLinkState};

pub use realtime::{
    ModelEvent, ModelLink, ModelLinkState, OpenAiModelLink, VoiceLinkError, VoiceLinkResult,
    VoiceSessionConfig,
};

pub use telephony::{MediaFrame, TelephonyEvent};
