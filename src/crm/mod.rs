//! CRM backend integration.
//!
//! The bridge reports call lifecycle and booked meetings to the CRM
//! application server over its REST API. The two concerns are separate
//! traits so tests can observe status updates and bookings
//! independently of HTTP.

mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::CrmClient;

/// Errors from CRM API calls.
#[derive(Error, Debug)]
pub enum CrmError {
    /// Request failed at the transport level
    #[error("CRM request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The CRM returned a non-success status
    #[error("CRM API error {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },
}

/// Call lifecycle as the CRM records it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallStatus {
    /// Call placed, stream not yet started
    Initiated,
    /// Media is flowing
    InProgress,
    /// Call ended normally
    Completed,
    /// Call ended on an error
    Failed,
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallStatus::Initiated => write!(f, "initiated"),
            CallStatus::InProgress => write!(f, "in-progress"),
            CallStatus::Completed => write!(f, "completed"),
            CallStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Partial update for a call record.
#[derive(Debug, Clone, Serialize)]
pub struct CallStatusUpdate {
    /// New lifecycle status
    pub status: CallStatus,

    /// Full assistant transcript, sent on terminal transitions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,

    /// Whether a meeting was booked during the call
    #[serde(skip_serializing_if = "Option::is_none", rename = "meetingScheduled")]
    pub meeting_scheduled: Option<bool>,

    /// Failure detail, set with [`CallStatus::Failed`]
    #[serde(skip_serializing_if = "Option::is_none", rename = "errorMessage")]
    pub error_message: Option<String>,
}

/// A meeting to create in the CRM calendar.
#[derive(Debug, Clone, Serialize)]
pub struct BookingRequest {
    /// Lead the meeting belongs to
    #[serde(skip_serializing_if = "Option::is_none", rename = "leadId")]
    pub lead_id: Option<String>,

    /// Meeting date, YYYY-MM-DD
    pub date: String,

    /// Start time, HH:MM
    #[serde(rename = "startTime")]
    pub start_time: String,

    /// End time, HH:MM
    #[serde(rename = "endTime")]
    pub end_time: String,
}

/// Receives call lifecycle updates.
#[async_trait]
pub trait CallStatusSink: Send + Sync {
    async fn update_call_status(
        &self,
        call_sid: &str,
        update: &CallStatusUpdate,
    ) -> Result<(), CrmError>;
}

/// Books meetings on behalf of the voice assistant.
#[async_trait]
pub trait MeetingScheduler: Send + Sync {
    async fn book_meeting(&self, request: &BookingRequest) -> Result<(), CrmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&CallStatus::InProgress).unwrap(),
            r#""in-progress""#
        );
        assert_eq!(
            serde_json::to_string(&CallStatus::Completed).unwrap(),
            r#""completed""#
        );
        assert_eq!(CallStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_update_omits_unset_fields() {
        let update = CallStatusUpdate {
            status: CallStatus::InProgress,
            transcript: None,
            meeting_scheduled: None,
            error_message: None,
        };
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"status":"in-progress"}"#);
    }

    #[test]
    fn test_terminal_update_serialization() {
        let update = CallStatusUpdate {
            status: CallStatus::Completed,
            transcript: Some("Hello.".to_string()),
            meeting_scheduled: Some(true),
            error_message: None,
        };
        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains(r#""transcript":"Hello.""#));
        assert!(json.contains(r#""meetingScheduled":true"#));
        assert!(!json.contains("errorMessage"));
    }

    #[test]
    fn test_booking_request_serialization() {
        let request = BookingRequest {
            lead_id: Some("lead-1".to_string()),
            date: "2025-03-10".to_string(),
            start_time: "14:00".to_string(),
            end_time: "15:00".to_string(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""leadId":"lead-1""#));
        assert!(json.contains(r#""startTime":"14:00""#));
        assert!(json.contains(r#""endTime":"15:00""#));
    }
}
