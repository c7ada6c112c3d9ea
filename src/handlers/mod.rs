//! HTTP and WebSocket request handlers.

pub mod health;
pub mod telephony;

pub use health::health_check;
pub use telephony::media_stream_handler;
