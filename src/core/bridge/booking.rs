//! Meeting booking tool.
//!
//! The one tool exposed to the voice model. Arguments arrive as a JSON
//! string from `response.function_call_arguments.done`; the result goes
//! back as a `function_call_output` item so the model can confirm the
//! booking to the caller in speech.

use serde::Deserialize;

use crate::crm::{BookingRequest, MeetingScheduler};

/// Tool name registered in the session configuration.
pub const BOOK_MEETING_TOOL: &str = "book_meeting";

/// Meeting length used when the model omits a duration.
pub const DEFAULT_DURATION_MINUTES: u32 = 60;

/// Longest meeting the tool will book, in minutes.
pub const MAX_DURATION_MINUTES: u32 = 24 * 60;

/// Arguments the model supplies for `book_meeting`.
#[derive(Debug, Clone, Deserialize)]
pub struct BookMeetingArgs {
    /// Meeting date, YYYY-MM-DD
    pub date: String,
    /// Start time, HH:MM 24-hour
    pub time: String,
    /// Meeting length in minutes
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

impl BookMeetingArgs {
    /// Effective duration, treating absent and zero the same.
    pub fn duration(&self) -> u32 {
        self.duration_minutes
            .filter(|d| *d != 0)
            .unwrap_or(DEFAULT_DURATION_MINUTES)
    }
}

/// Result of executing a tool call.
#[derive(Debug)]
pub struct ToolOutcome {
    /// JSON text to return to the model
    pub output: String,
    /// Whether a meeting was actually booked
    pub booked: bool,
}

/// End time for a meeting starting at `time` and running `duration`
/// minutes, wrapping past midnight without touching the date.
pub fn end_time(start_hours: u32, start_minutes: u32, duration: u32) -> (u32, u32) {
    let total = start_minutes + duration;
    let end_hours = (start_hours + total / 60) % 24;
    let end_minutes = total % 60;
    (end_hours, end_minutes)
}

fn parse_hhmm(time: &str) -> Option<(u32, u32)> {
    let (h, m) = time.split_once(':')?;
    let hours: u32 = h.parse().ok()?;
    let minutes: u32 = m.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some((hours, minutes))
}

/// Execute a `book_meeting` call against the scheduler.
///
/// Returns `None` when the arguments cannot be parsed or are out of
/// range; in that case nothing is sent back to the model. Scheduler
/// failures still produce an outcome so the model can tell the caller
/// the booking failed.
pub async fn execute(
    arguments: &str,
    lead_id: Option<&str>,
    scheduler: &dyn MeetingScheduler,
) -> Option<ToolOutcome> {
    let args: BookMeetingArgs = match serde_json::from_str(arguments) {
        Ok(args) => args,
        Err(e) => {
            tracing::warn!("Unparsable book_meeting arguments: {} - {}", e, arguments);
            return None;
        }
    };

    let Some((start_hours, start_minutes)) = parse_hhmm(&args.time) else {
        tracing::warn!(time = %args.time, "Invalid book_meeting start time");
        return None;
    };

    let duration = args.duration();
    if duration > MAX_DURATION_MINUTES {
        tracing::warn!(duration_minutes = duration, "Rejecting book_meeting duration");
        return None;
    }
    let (end_hours, end_minutes) = end_time(start_hours, start_minutes, duration);

    let request = BookingRequest {
        lead_id: lead_id.map(String::from),
        date: args.date.clone(),
        start_time: format!("{:02}:{:02}", start_hours, start_minutes),
        end_time: format!("{:02}:{:02}", end_hours, end_minutes),
    };

    tracing::info!(
        date = %request.date,
        start = %request.start_time,
        end = %request.end_time,
        "Booking meeting"
    );

    match scheduler.book_meeting(&request).await {
        Ok(()) => Some(ToolOutcome {
            output: serde_json::json!({
                "success": true,
                "message": format!(
                    "Meeting booked on {} from {} to {}",
                    request.date, request.start_time, request.end_time
                ),
            })
            .to_string(),
            booked: true,
        }),
        Err(e) => {
            tracing::error!("Meeting booking failed: {}", e);
            Some(ToolOutcome {
                output: serde_json::json!({
                    "success": false,
                    "error": "Could not book the meeting, please try again later.",
                })
                .to_string(),
                booked: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::CrmError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingScheduler {
        requests: Mutex<Vec<BookingRequest>>,
        fail: bool,
    }

    impl RecordingScheduler {
        fn new(fail: bool) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl MeetingScheduler for RecordingScheduler {
        async fn book_meeting(&self, request: &BookingRequest) -> Result<(), CrmError> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                Err(CrmError::Api {
                    status: 500,
                    message: "down".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_end_time_same_hour() {
        assert_eq!(end_time(14, 0, 30), (14, 30));
    }

    #[test]
    fn test_end_time_hour_carry() {
        assert_eq!(end_time(14, 45, 30), (15, 15));
    }

    #[test]
    fn test_end_time_midnight_wraparound() {
        assert_eq!(end_time(23, 30, 60), (0, 30));
        assert_eq!(end_time(23, 0, 120), (1, 0));
    }

    #[test]
    fn test_duration_defaults() {
        let args: BookMeetingArgs =
            serde_json::from_str(r#"{"date":"2025-03-10","time":"14:00"}"#).unwrap();
        assert_eq!(args.duration(), 60);

        let args: BookMeetingArgs =
            serde_json::from_str(r#"{"date":"2025-03-10","time":"14:00","duration_minutes":0}"#)
                .unwrap();
        assert_eq!(args.duration(), 60);

        let args: BookMeetingArgs =
            serde_json::from_str(r#"{"date":"2025-03-10","time":"14:00","duration_minutes":45}"#)
                .unwrap();
        assert_eq!(args.duration(), 45);
    }

    #[tokio::test]
    async fn test_execute_success() {
        let scheduler = RecordingScheduler::new(false);
        let outcome = execute(
            r#"{"date":"2025-03-10","time":"14:30","duration_minutes":45}"#,
            Some("lead-1"),
            &scheduler,
        )
        .await
        .unwrap();
        assert!(outcome.booked);
        assert!(outcome.output.contains(r#""success":true"#));

        let requests = scheduler.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].start_time, "14:30");
        assert_eq!(requests[0].end_time, "15:15");
        assert_eq!(requests[0].lead_id.as_deref(), Some("lead-1"));
    }

    #[tokio::test]
    async fn test_execute_scheduler_failure_reports_to_model() {
        let scheduler = RecordingScheduler::new(true);
        let outcome = execute(
            r#"{"date":"2025-03-10","time":"09:00"}"#,
            None,
            &scheduler,
        )
        .await
        .unwrap();
        assert!(!outcome.booked);
        assert!(outcome.output.contains(r#""success":false"#));
    }

    #[tokio::test]
    async fn test_execute_unparsable_arguments() {
        let scheduler = RecordingScheduler::new(false);
        let outcome = execute("not json", None, &scheduler).await;
        assert!(outcome.is_none());
        assert!(scheduler.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_execute_rejects_oversized_duration() {
        let scheduler = RecordingScheduler::new(false);
        let outcome = execute(
            r#"{"date":"2025-03-10","time":"14:00","duration_minutes":4294967295}"#,
            None,
            &scheduler,
        )
        .await;
        assert!(outcome.is_none());
        assert!(scheduler.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_execute_invalid_time() {
        let scheduler = RecordingScheduler::new(false);
        let outcome = execute(
            r#"{"date":"2025-03-10","time":"25:99"}"#,
            None,
            &scheduler,
        )
        .await;
        assert!(outcome.is_none());
    }
}
