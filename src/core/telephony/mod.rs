//! Telephony media-stream protocol.

mod messages;

pub use messages::{CustomParameters, MediaFrame, MediaPayload, StartMeta, TelephonyEvent};
