//! Call bridge orchestrator.
//!
//! Joins the two legs of a call: the telephony media stream and the
//! voice model link. The owning WebSocket handler drives the bridge
//! from a single `select!` loop, so all session state lives here
//! unshared and unlocked.
//!
//! Audio moves opaquely in both directions as base64 µ-law text. The
//! bridge never decodes it; its job is addressing, lifecycle, tool
//! execution, and CRM reporting.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::booking::{self, BOOK_MEETING_TOOL};
use super::session::{CallSession, TelephonyLinkState};
use crate::core::realtime::{ModelEvent, ModelLink};
use crate::core::telephony::{MediaFrame, TelephonyEvent};
use crate::crm::{CallStatus, CallStatusSink, CallStatusUpdate, MeetingScheduler};

/// Orchestrates one bridged call.
pub struct CallBridge {
    session: CallSession,
    model: Box<dyn ModelLink>,
    /// Outbound frames for the telephony sender task
    telephony_tx: mpsc::Sender<MediaFrame>,
    status_sink: Arc<dyn CallStatusSink>,
    scheduler: Arc<dyn MeetingScheduler>,
    /// Tool call ids already executed, used to flag model retries
    seen_tool_calls: Vec<String>,
}

impl CallBridge {
    pub fn new(
        model: Box<dyn ModelLink>,
        telephony_tx: mpsc::Sender<MediaFrame>,
        status_sink: Arc<dyn CallStatusSink>,
        scheduler: Arc<dyn MeetingScheduler>,
    ) -> Self {
        Self {
            session: CallSession::new(),
            model,
            telephony_tx,
            status_sink,
            scheduler,
            seen_tool_calls: Vec::new(),
        }
    }

    /// Session state, exposed for the handler's logging.
    pub fn session(&self) -> &CallSession {
        &self.session
    }

    /// Process one telephony event. Returns `false` when the call is
    /// over and the handler loop should stop.
    pub async fn handle_telephony_event(&mut self, event: TelephonyEvent) -> bool {
        match event {
            TelephonyEvent::Connected => {
                tracing::debug!("Telephony stream connected");
                true
            }
            TelephonyEvent::Start { start } => {
                tracing::info!(
                    call_sid = %start.call_sid,
                    stream_sid = %start.stream_sid,
                    lead_id = start.custom_parameters.lead_id.as_deref().unwrap_or("-"),
                    "Call stream started"
                );
                self.session.begin_stream(&start);
                tracing::debug!(lead = %self.session.lead_name, "Lead attached to session");
                self.report_status(CallStatus::InProgress, None).await;
                true
            }
            TelephonyEvent::Media { media } => {
                if !self.session.streaming() {
                    // No call identity yet, stale audio is useless
                    tracing::debug!("Dropping media frame received before start");
                    return true;
                }
                if let Err(e) = self.model.send_audio(&media.payload) {
                    // The model event channel reports link death separately
                    tracing::debug!("Dropping caller audio: {}", e);
                }
                true
            }
            TelephonyEvent::Stop => {
                tracing::info!(
                    call_sid = self.session.call_sid.as_deref().unwrap_or("-"),
                    "Call stream stopped"
                );
                self.session.telephony_state = TelephonyLinkState::Stopped;
                self.finalize(CallStatus::Completed, None).await;
                false
            }
        }
    }

    /// The telephony socket errored underneath us.
    pub async fn handle_telephony_error(&mut self, message: &str) {
        tracing::error!("Telephony WebSocket error: {}", message);
        self.session.telephony_state = TelephonyLinkState::Stopped;
        self.finalize(CallStatus::Failed, Some(message.to_string()))
            .await;
    }

    /// The telephony socket closed without a `stop` event.
    ///
    /// A close mid-stream means the call was cut off, not finished.
    pub async fn handle_telephony_closed(&mut self) {
        tracing::info!(
            call_sid = self.session.call_sid.as_deref().unwrap_or("-"),
            "Telephony stream closed"
        );
        let dropped_mid_call = self.session.streaming();
        self.session.telephony_state = TelephonyLinkState::Stopped;
        if dropped_mid_call {
            self.finalize(
                CallStatus::Failed,
                Some("Telephony stream closed without stop".to_string()),
            )
            .await;
        } else {
            self.finalize(CallStatus::Completed, None).await;
        }
    }

    /// Process one model event. Returns `false` when the link is gone
    /// and the handler loop should stop.
    pub async fn handle_model_event(&mut self, event: ModelEvent) -> bool {
        match event {
            ModelEvent::SessionCreated { session_id } => {
                tracing::info!(session_id = %session_id, "Voice session ready");
                true
            }
            ModelEvent::AudioDelta { payload } => {
                let Some(stream_sid) = &self.session.stream_sid else {
                    // No stream to address yet, drop rather than queue
                    tracing::debug!("Dropping model audio received before start");
                    return true;
                };
                let frame = MediaFrame::new(stream_sid.clone(), payload);
                if let Err(e) = self.telephony_tx.try_send(frame) {
                    tracing::debug!("Dropping model audio frame: {}", e);
                }
                true
            }
            ModelEvent::TranscriptDelta { text } => {
                self.session.transcript.push(text);
                true
            }
            ModelEvent::ToolCallDone {
                call_id,
                name,
                arguments,
            } => {
                self.execute_tool_call(&call_id, &name, &arguments).await;
                true
            }
            ModelEvent::ModelError { message } => {
                // In-band API errors leave the conversation running
                tracing::warn!("Model reported error mid-call: {}", message);
                true
            }
            ModelEvent::TransportError { message } => {
                tracing::error!("Model link lost: {}", message);
                self.finalize(CallStatus::Failed, Some(message)).await;
                false
            }
            ModelEvent::Closed => {
                tracing::info!("Model link closed");
                if self.session.streaming() {
                    // The caller is still on the line with nobody to talk to
                    self.finalize(
                        CallStatus::Failed,
                        Some("Voice model link closed mid-call".to_string()),
                    )
                    .await;
                } else {
                    self.finalize(CallStatus::Completed, None).await;
                }
                false
            }
        }
    }

    async fn execute_tool_call(&mut self, call_id: &str, name: &str, arguments: &str) {
        if name != BOOK_MEETING_TOOL {
            tracing::warn!(name = %name, "Model requested unknown tool");
            return;
        }
        if self.seen_tool_calls.iter().any(|id| id == call_id) {
            // Executed anyway so the model gets its answer; the CRM
            // backend treats identical bookings as upserts
            tracing::warn!(call_id = %call_id, "Model repeated a tool call");
        } else {
            self.seen_tool_calls.push(call_id.to_string());
        }

        let outcome = booking::execute(
            arguments,
            self.session.lead_id.as_deref(),
            self.scheduler.as_ref(),
        )
        .await;

        let Some(outcome) = outcome else {
            return;
        };
        if outcome.booked {
            self.session.meeting_scheduled = true;
        }
        if let Err(e) = self.model.submit_tool_result(call_id, &outcome.output).await {
            tracing::warn!("Could not deliver tool result to model: {}", e);
        }
    }

    /// Non-terminal status report, skipped when the call is unknown.
    async fn report_status(&self, status: CallStatus, error_message: Option<String>) {
        let Some(call_sid) = &self.session.call_sid else {
            return;
        };
        let update = CallStatusUpdate {
            status,
            transcript: None,
            meeting_scheduled: None,
            error_message,
        };
        if let Err(e) = self.status_sink.update_call_status(call_sid, &update).await {
            tracing::error!(call_sid = %call_sid, "CRM status update failed: {}", e);
        }
    }

    /// Terminal status report carrying the transcript. Written at most
    /// once per call; later terminal transitions are ignored.
    async fn finalize(&mut self, status: CallStatus, error_message: Option<String>) {
        if self.session.final_status_written {
            tracing::debug!("Final status already written, skipping {}", status);
            return;
        }
        let Some(call_sid) = self.session.call_sid.clone() else {
            tracing::debug!("Call ended before start, nothing to report");
            self.session.final_status_written = true;
            return;
        };
        self.session.final_status_written = true;
        let update = CallStatusUpdate {
            status,
            transcript: Some(self.session.transcript_text()),
            meeting_scheduled: Some(self.session.meeting_scheduled),
            error_message,
        };
        if let Err(e) = self.status_sink.update_call_status(&call_sid, &update).await {
            tracing::error!(call_sid = %call_sid, "CRM final status update failed: {}", e);
        }
    }

    /// Tear down the bridge. Closes the model link and, when the call
    /// ended without a terminal transition, records it as completed.
    pub async fn shutdown(&mut self) {
        self.finalize(CallStatus::Completed, None).await;
        self.model.close().await;
    }
}
