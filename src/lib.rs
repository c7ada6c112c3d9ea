pub mod config;
pub mod core;
pub mod crm;
pub mod handlers;
pub mod routes;
pub mod state;

// Re-export commonly used items for convenience
pub use config::ServerConfig;
pub use crate::core::*;
pub use crm::{CallStatus, CallStatusSink, CrmClient, CrmError, MeetingScheduler};
pub use state::AppState;
