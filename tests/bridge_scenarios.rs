//! End-to-end bridge scenarios.
//!
//! Drives a [`CallBridge`] through whole-call event sequences with a
//! scripted model link and an in-memory CRM, checking the externally
//! visible effects: frames sent to the telephony leg, audio and tool
//! results sent to the model, and status updates written to the CRM.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use dialdesk_bridge::core::bridge::CallBridge;
use dialdesk_bridge::core::realtime::{
    ModelEvent, ModelLink, ModelLinkState, VoiceLinkResult,
};
use dialdesk_bridge::core::telephony::{MediaFrame, TelephonyEvent};
use dialdesk_bridge::crm::{
    BookingRequest, CallStatus, CallStatusSink, CallStatusUpdate, CrmError, MeetingScheduler,
};

#[derive(Default, Clone)]
struct ScriptedModel {
    audio: Arc<Mutex<Vec<String>>>,
    tool_results: Arc<Mutex<Vec<(String, String)>>>,
    closed: Arc<Mutex<bool>>,
}

#[async_trait]
impl ModelLink for ScriptedModel {
    fn state(&self) -> ModelLinkState {
        ModelLinkState::Streaming
    }

    fn send_audio(&self, payload: &str) -> VoiceLinkResult<()> {
        self.audio.lock().unwrap().push(payload.to_string());
        Ok(())
    }

    async fn submit_tool_result(&self, call_id: &str, output: &str) -> VoiceLinkResult<()> {
        self.tool_results
            .lock()
            .unwrap()
            .push((call_id.to_string(), output.to_string()));
        Ok(())
    }

    async fn close(&mut self) {
        *self.closed.lock().unwrap() = true;
    }
}

#[derive(Default)]
struct InMemoryCrm {
    statuses: Mutex<Vec<(String, CallStatus, Option<String>, Option<bool>)>>,
    bookings: Mutex<Vec<BookingRequest>>,
}

#[async_trait]
impl CallStatusSink for InMemoryCrm {
    async fn update_call_status(
        &self,
        call_sid: &str,
        update: &CallStatusUpdate,
    ) -> Result<(), CrmError> {
        self.statuses.lock().unwrap().push((
            call_sid.to_string(),
            update.status,
            update.transcript.clone(),
            update.meeting_scheduled,
        ));
        Ok(())
    }
}

#[async_trait]
impl MeetingScheduler for InMemoryCrm {
    async fn book_meeting(&self, request: &BookingRequest) -> Result<(), CrmError> {
        self.bookings.lock().unwrap().push(request.clone());
        Ok(())
    }
}

struct Call {
    bridge: CallBridge,
    model: ScriptedModel,
    crm: Arc<InMemoryCrm>,
    frames: mpsc::Receiver<MediaFrame>,
}

fn new_call() -> Call {
    let model = ScriptedModel::default();
    let crm = Arc::new(InMemoryCrm::default());
    let (frame_tx, frames) = mpsc::channel(64);
    let bridge = CallBridge::new(Box::new(model.clone()), frame_tx, crm.clone(), crm.clone());
    Call {
        bridge,
        model,
        crm,
        frames,
    }
}

fn event(json: &str) -> TelephonyEvent {
    serde_json::from_str(json).expect("valid telephony event")
}

fn start_event() -> TelephonyEvent {
    event(
        r#"{
            "event": "start",
            "start": {
                "callSid": "CA100",
                "streamSid": "MZ100",
                "customParameters": {"leadId": "lead-7", "leadName": "Grace"}
            }
        }"#,
    )
}

#[tokio::test]
async fn full_call_with_booking() {
    let mut call = new_call();

    // Provider handshake and call start
    assert!(
        call.bridge
            .handle_telephony_event(event(r#"{"event":"connected"}"#))
            .await
    );
    assert!(call.bridge.handle_telephony_event(start_event()).await);

    // Caller speaks, model answers with audio and transcript
    call.bridge
        .handle_telephony_event(event(
            r#"{"event":"media","media":{"payload":"Y2FsbGVy"}}"#,
        ))
        .await;
    call.bridge
        .handle_model_event(ModelEvent::AudioDelta {
            payload: "bW9kZWw=".to_string(),
        })
        .await;
    call.bridge
        .handle_model_event(ModelEvent::TranscriptDelta {
            text: "Hi Grace, let's find a time. ".to_string(),
        })
        .await;

    // Model books a meeting
    call.bridge
        .handle_model_event(ModelEvent::ToolCallDone {
            call_id: "call_b1".to_string(),
            name: "book_meeting".to_string(),
            arguments: r#"{"date":"2025-04-01","time":"10:30","duration_minutes":30}"#.to_string(),
        })
        .await;
    call.bridge
        .handle_model_event(ModelEvent::TranscriptDelta {
            text: "Booked for April first.".to_string(),
        })
        .await;

    // Call ends normally
    assert!(
        !call
            .bridge
            .handle_telephony_event(event(r#"{"event":"stop"}"#))
            .await
    );
    call.bridge.shutdown().await;

    // Caller audio reached the model
    assert_eq!(*call.model.audio.lock().unwrap(), vec!["Y2FsbGVy"]);

    // Model audio was addressed to the stream
    let frame = call.frames.recv().await.unwrap();
    assert_eq!(frame.stream_sid, "MZ100");
    assert_eq!(frame.media.payload, "bW9kZWw=");

    // Booking landed with the lead attached and the computed end time
    let bookings = call.crm.bookings.lock().unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].lead_id.as_deref(), Some("lead-7"));
    assert_eq!(bookings[0].date, "2025-04-01");
    assert_eq!(bookings[0].start_time, "10:30");
    assert_eq!(bookings[0].end_time, "11:00");

    // The tool result went back under the model's call id
    let results = call.model.tool_results.lock().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, "call_b1");
    assert!(results[0].1.contains(r#""success":true"#));

    // CRM saw in-progress then one completed record with the transcript
    let statuses = call.crm.statuses.lock().unwrap();
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[0].1, CallStatus::InProgress);
    assert_eq!(statuses[1].1, CallStatus::Completed);
    assert_eq!(
        statuses[1].2.as_deref(),
        Some("Hi Grace, let's find a time. Booked for April first.")
    );
    assert_eq!(statuses[1].3, Some(true));

    assert!(*call.model.closed.lock().unwrap());
}

#[tokio::test]
async fn audio_in_either_direction_before_start_is_dropped() {
    let mut call = new_call();

    call.bridge
        .handle_telephony_event(event(r#"{"event":"connected"}"#))
        .await;
    call.bridge
        .handle_telephony_event(event(r#"{"event":"media","media":{"payload":"ZWFybHk="}}"#))
        .await;
    call.bridge
        .handle_model_event(ModelEvent::AudioDelta {
            payload: "ZWFybHk=".to_string(),
        })
        .await;

    assert!(call.model.audio.lock().unwrap().is_empty());
    assert!(call.frames.try_recv().is_err());

    call.bridge.handle_telephony_event(start_event()).await;
    call.bridge
        .handle_telephony_event(event(r#"{"event":"media","media":{"payload":"bGF0ZQ=="}}"#))
        .await;

    assert_eq!(*call.model.audio.lock().unwrap(), vec!["bGF0ZQ=="]);
}

#[tokio::test]
async fn model_transport_failure_fails_the_call_once() {
    let mut call = new_call();
    call.bridge.handle_telephony_event(start_event()).await;

    assert!(
        !call
            .bridge
            .handle_model_event(ModelEvent::TransportError {
                message: "connection reset by peer".to_string(),
            })
            .await
    );

    // Handler teardown after the loop must not write a second terminal status
    call.bridge.shutdown().await;

    let statuses = call.crm.statuses.lock().unwrap();
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[1].1, CallStatus::Failed);
    assert!(*call.model.closed.lock().unwrap());
}

#[tokio::test]
async fn socket_drop_without_stop_fails_the_call() {
    let mut call = new_call();
    call.bridge.handle_telephony_event(start_event()).await;
    call.bridge
        .handle_model_event(ModelEvent::TranscriptDelta {
            text: "Hello?".to_string(),
        })
        .await;

    call.bridge.handle_telephony_closed().await;
    call.bridge.shutdown().await;

    // The call was cut off mid-stream, so it is failed, not completed;
    // whatever transcript accumulated still lands in the record
    let statuses = call.crm.statuses.lock().unwrap();
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[1].1, CallStatus::Failed);
    assert_eq!(statuses[1].2.as_deref(), Some("Hello?"));
}

#[tokio::test]
async fn call_that_never_started_reports_nothing() {
    let mut call = new_call();
    call.bridge
        .handle_telephony_event(event(r#"{"event":"connected"}"#))
        .await;
    call.bridge.handle_telephony_closed().await;
    call.bridge.shutdown().await;

    assert!(call.crm.statuses.lock().unwrap().is_empty());
    assert!(*call.model.closed.lock().unwrap());
}

#[tokio::test]
async fn in_band_model_errors_do_not_end_the_call() {
    let mut call = new_call();
    call.bridge.handle_telephony_event(start_event()).await;

    assert!(
        call.bridge
            .handle_model_event(ModelEvent::ModelError {
                message: "response cancelled".to_string(),
            })
            .await
    );

    // Conversation continues afterwards
    call.bridge
        .handle_model_event(ModelEvent::AudioDelta {
            payload: "c3RpbGw=".to_string(),
        })
        .await;
    assert!(call.frames.try_recv().is_ok());
}
