//! Telephony media-stream WebSocket handler.
//!
//! Accepts the media stream the telephony provider opens for each
//! outbound call, connects a voice model session, and hands both legs
//! to a [`CallBridge`] driven from a single `select!` loop.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::select;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::bridge::CallBridge;
use crate::core::realtime::{ModelEvent, ModelLink, OpenAiModelLink};
use crate::core::telephony::{MediaFrame, TelephonyEvent};
use crate::state::AppState;

/// Channel buffer size for audio workloads.
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Telephony media-stream WebSocket handler.
///
/// Upgrades the HTTP connection to a WebSocket carrying the call's
/// bidirectional G.711 µ-law media stream.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("Telephony media stream upgrade requested");
    ws.on_upgrade(move |socket| handle_media_stream(socket, state))
}

/// Handle one bridged call.
async fn handle_media_stream(socket: WebSocket, state: Arc<AppState>) {
    info!("Telephony media stream established");

    let (mut sender, mut receiver) = socket.split();
    let (frame_tx, mut frame_rx) = mpsc::channel::<MediaFrame>(CHANNEL_BUFFER_SIZE);

    // Sender task for outbound media frames
    let sender_task = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize media frame: {}", e);
                    continue;
                }
            };
            if let Err(e) = sender.send(Message::Text(json.into())).await {
                debug!("Telephony sender stopped: {}", e);
                break;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    // Connect the model leg before any caller audio arrives
    let (event_tx, mut event_rx) = mpsc::channel::<ModelEvent>(CHANNEL_BUFFER_SIZE);
    let session = state.config.voice_session();
    let model = match OpenAiModelLink::connect(state.config.openai_link(), session, event_tx).await
    {
        Ok(link) => Box::new(link) as Box<dyn ModelLink>,
        Err(e) => {
            error!("Could not connect voice model, dropping call: {}", e);
            sender_task.abort();
            return;
        }
    };

    let mut bridge = CallBridge::new(model, frame_tx, state.crm.clone(), state.crm.clone());

    loop {
        select! {
            maybe_msg = receiver.next() => {
                match maybe_msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<TelephonyEvent>(&text) {
                            Ok(event) => {
                                if !bridge.handle_telephony_event(event).await {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!("Unrecognized telephony event: {} - {}", e, text);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        bridge.handle_telephony_closed().await;
                        break;
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                        // axum answers pings itself
                    }
                    Some(Ok(_)) => {
                        debug!("Ignoring non-text telephony frame");
                    }
                    Some(Err(e)) => {
                        bridge.handle_telephony_error(&e.to_string()).await;
                        break;
                    }
                }
            }

            maybe_event = event_rx.recv() => {
                match maybe_event {
                    Some(event) => {
                        if !bridge.handle_model_event(event).await {
                            break;
                        }
                    }
                    None => {
                        bridge.handle_model_event(ModelEvent::Closed).await;
                        break;
                    }
                }
            }
        }
    }

    bridge.shutdown().await;
    sender_task.abort();
    info!(
        call_sid = bridge.session().call_sid.as_deref().unwrap_or("-"),
        "Telephony media stream handler finished"
    );
}
