//! Call bridging.
//!
//! The bridge joins one telephony media stream to one voice model
//! session, executes tool calls the model emits, and reports call
//! outcomes to the CRM backend.

mod booking;
mod orchestrator;
mod session;

pub use booking::{BOOK_MEETING_TOOL, BookMeetingArgs, DEFAULT_DURATION_MINUTES, ToolOutcome};
pub use orchestrator::CallBridge;
pub use session::{CallSession, TelephonyLinkState, UNKNOWN_LEAD_NAME};
