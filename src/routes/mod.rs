//! Route configuration.

pub mod telephony;

pub use telephony::create_telephony_router;
