//! OpenAI Realtime API client implementation.
//!
//! Implements the [`ModelLink`] trait over OpenAI's WebSocket-based
//! Realtime API.
//!
//! # API Reference
//!
//! - Endpoint: `wss://api.openai.com/v1/realtime?model=<model>`
//! - Protocol: WebSocket with JSON events
//! - Audio: G.711 µ-law, 8kHz, base64 encoded (configured via session.update)
//!
//! The connection lives for exactly one phone call. When the link drops,
//! the owning bridge ends the call rather than reconnecting; resuming a
//! live phone conversation against a fresh model session is not useful.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};

use super::config::{AuthScheme, OpenAiLinkConfig};
use super::messages::{ClientEvent, ServerEvent, SessionConfig};
use crate::core::realtime::base::{
    ModelEvent, ModelLink, ModelLinkState, VoiceLinkError, VoiceLinkResult, VoiceSessionConfig,
};

/// Channel capacity for outgoing client events.
///
/// Sized for roughly five seconds of 20ms telephony frames. When the
/// channel is full, `send_audio` drops the frame instead of waiting.
const WS_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// OpenAI Model Link
// =============================================================================

/// OpenAI Realtime API link for one voice session.
///
/// # Thread Safety
///
/// State is shared with the spawned WebSocket task through an
/// `Arc<AtomicU8>` so the owning bridge can check it without locking.
pub struct OpenAiModelLink {
    /// Link state, shared with the connection task
    state: Arc<AtomicU8>,
    /// Outgoing client events, consumed by the connection task
    ws_tx: mpsc::Sender<ClientEvent>,
    /// Connection task handle
    task: Option<JoinHandle<()>>,
}

impl OpenAiModelLink {
    /// Connect to the Realtime API and start the session.
    ///
    /// Performs the WebSocket handshake, sends `session.update` with the
    /// given session configuration, and spawns the read/write task. All
    /// server activity is delivered to `events` as [`ModelEvent`]s; the
    /// channel closing after a `TransportError` or `Closed` event marks
    /// the end of the link.
    pub async fn connect(
        config: OpenAiLinkConfig,
        session: VoiceSessionConfig,
        events: mpsc::Sender<ModelEvent>,
    ) -> VoiceLinkResult<Self> {
        if config.api_key.is_empty() {
            return Err(VoiceLinkError::InvalidConfiguration(
                "OpenAI API key is empty".to_string(),
            ));
        }

        let url = config.ws_url();
        let request = build_handshake(&url, &config)?;

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| match e {
                tungstenite::Error::Http(ref resp) if resp.status().as_u16() == 401 => {
                    VoiceLinkError::AuthenticationFailed(e.to_string())
                }
                other => VoiceLinkError::ConnectionFailed(other.to_string()),
            })?;

        tracing::info!(model = config.model.as_str(), "Connected to OpenAI Realtime API");

        let (mut ws_sink, mut ws_rx) = ws_stream.split();

        // Configure the session before any audio flows
        let update = ClientEvent::SessionUpdate {
            session: SessionConfig::from_session(&session),
        };
        let json = serde_json::to_string(&update)
            .map_err(|e| VoiceLinkError::SerializationError(e.to_string()))?;
        ws_sink
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| VoiceLinkError::WebSocketError(e.to_string()))?;

        let (tx, mut rx) = mpsc::channel::<ClientEvent>(WS_CHANNEL_CAPACITY);

        let state = Arc::new(AtomicU8::new(ModelLinkState::Configured as u8));
        let task_state = state.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    // Outgoing events from the bridge
                    maybe_event = rx.recv() => {
                        let Some(event) = maybe_event else {
                            // Link handle dropped, close gracefully
                            let _ = ws_sink.send(Message::Close(None)).await;
                            break;
                        };
                        let json = match serde_json::to_string(&event) {
                            Ok(j) => j,
                            Err(e) => {
                                tracing::error!("Failed to serialize client event: {}", e);
                                continue;
                            }
                        };
                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            tracing::error!("Failed to send to model: {}", e);
                            let _ = events.send(ModelEvent::TransportError {
                                message: e.to_string(),
                            }).await;
                            break;
                        }
                    }

                    // Incoming events from the model
                    maybe_msg = ws_rx.next() => {
                        let Some(msg) = maybe_msg else {
                            let _ = events.send(ModelEvent::Closed).await;
                            break;
                        };
                        match msg {
                            Ok(Message::Text(text)) => {
                                match serde_json::from_str::<ServerEvent>(&text) {
                                    Ok(event) => {
                                        if dispatch_server_event(event, &events, &task_state).await.is_err() {
                                            // Receiver side gone, stop reading
                                            break;
                                        }
                                    }
                                    Err(e) => {
                                        tracing::warn!("Failed to parse server event: {} - {}", e, text);
                                    }
                                }
                            }
                            Ok(Message::Ping(data)) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    tracing::error!("Failed to send pong: {}", e);
                                }
                            }
                            Ok(Message::Close(_)) => {
                                tracing::info!("Model WebSocket closed by server");
                                let _ = events.send(ModelEvent::Closed).await;
                                break;
                            }
                            Err(e) => {
                                tracing::error!("Model WebSocket error: {}", e);
                                let _ = events.send(ModelEvent::TransportError {
                                    message: e.to_string(),
                                }).await;
                                break;
                            }
                            _ => {}
                        }
                    }
                }
            }

            task_state.store(ModelLinkState::Closed as u8, Ordering::SeqCst);
        });

        Ok(Self {
            state,
            ws_tx: tx,
            task: Some(handle),
        })
    }
}

/// Build the WebSocket upgrade request for the configured auth scheme.
fn build_handshake(
    url: &str,
    config: &OpenAiLinkConfig,
) -> VoiceLinkResult<http::Request<()>> {
    let builder = http::Request::builder()
        .uri(url)
        .header(
            "Sec-WebSocket-Key",
            tungstenite::handshake::client::generate_key(),
        )
        .header("Sec-WebSocket-Version", "13")
        .header("Connection", "Upgrade")
        .header("Upgrade", "websocket")
        .header("Host", "api.openai.com");

    let builder = match config.auth {
        AuthScheme::Header => builder
            .header("Authorization", format!("Bearer {}", config.api_key))
            .header("OpenAI-Beta", "realtime=v1")
            .header("Sec-WebSocket-Protocol", "realtime"),
        AuthScheme::Subprotocol => builder.header(
            "Sec-WebSocket-Protocol",
            format!(
                "realtime, openai-insecure-api-key.{}, openai-beta.realtime-v1",
                config.api_key
            ),
        ),
    };

    builder
        .body(())
        .map_err(|e| VoiceLinkError::ConnectionFailed(e.to_string()))
}

/// Map one server event onto the bridge event channel.
///
/// Returns `Err` only when the receiving side of the channel is gone.
async fn dispatch_server_event(
    event: ServerEvent,
    events: &mpsc::Sender<ModelEvent>,
    state: &Arc<AtomicU8>,
) -> Result<(), mpsc::error::SendError<ModelEvent>> {
    match event {
        ServerEvent::SessionCreated { session } => {
            tracing::info!(session_id = %session.id, "Model session created");
            events
                .send(ModelEvent::SessionCreated {
                    session_id: session.id,
                })
                .await?;
        }
        ServerEvent::AudioDelta { delta } => {
            state.store(ModelLinkState::Streaming as u8, Ordering::Relaxed);
            events.send(ModelEvent::AudioDelta { payload: delta }).await?;
        }
        ServerEvent::AudioTranscriptDelta { delta } => {
            events.send(ModelEvent::TranscriptDelta { text: delta }).await?;
        }
        ServerEvent::FunctionCallArgumentsDone {
            call_id,
            name,
            arguments,
        } => {
            tracing::info!(call_id = %call_id, name = %name, "Model requested tool call");
            events
                .send(ModelEvent::ToolCallDone {
                    call_id,
                    name,
                    arguments,
                })
                .await?;
        }
        ServerEvent::Error { error } => {
            // In-band API errors do not terminate the session
            tracing::warn!(
                error_type = %error.error_type,
                "OpenAI Realtime API error: {}",
                error.message
            );
            events
                .send(ModelEvent::ModelError {
                    message: error.message,
                })
                .await?;
        }
        ServerEvent::Unknown => {}
    }
    Ok(())
}

#[async_trait]
impl ModelLink for OpenAiModelLink {
    fn state(&self) -> ModelLinkState {
        ModelLinkState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn send_audio(&self, payload: &str) -> VoiceLinkResult<()> {
        if !self.state().accepts_audio() {
            return Err(VoiceLinkError::NotConnected);
        }
        match self.ws_tx.try_send(ClientEvent::audio_append(payload)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                // Audio is fire-and-forget; a stale frame is worthless
                tracing::debug!("Model send channel full, dropping audio frame");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(VoiceLinkError::NotConnected),
        }
    }

    async fn submit_tool_result(&self, call_id: &str, output: &str) -> VoiceLinkResult<()> {
        self.ws_tx
            .send(ClientEvent::tool_output(call_id, output))
            .await
            .map_err(|_| VoiceLinkError::NotConnected)
    }

    async fn close(&mut self) {
        if self.state() == ModelLinkState::Closed {
            return;
        }
        self.state
            .store(ModelLinkState::Closed as u8, Ordering::SeqCst);
        // Dropping the sender makes the connection task send Close and exit
        let (dummy_tx, _) = mpsc::channel(1);
        let old_tx = std::mem::replace(&mut self.ws_tx, dummy_tx);
        drop(old_tx);
        if let Some(handle) = self.task.take() {
            // The task may be parked on a full event channel nobody
            // reads anymore; don't wait on it forever
            let abort = handle.abort_handle();
            if tokio::time::timeout(std::time::Duration::from_secs(2), handle)
                .await
                .is_err()
            {
                tracing::debug!("Model connection task did not finish in time, aborting");
                abort.abort();
            }
        }
        tracing::info!("Model link closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::realtime::openai::config::OpenAiRealtimeModel;

    fn test_config(auth: AuthScheme) -> OpenAiLinkConfig {
        OpenAiLinkConfig {
            api_key: "sk-test".to_string(),
            model: OpenAiRealtimeModel::Gpt4oRealtimePreview,
            auth,
        }
    }

    #[test]
    fn test_handshake_header_auth() {
        let config = test_config(AuthScheme::Header);
        let request = build_handshake(&config.ws_url(), &config).unwrap();
        assert_eq!(
            request.headers().get("Authorization").unwrap(),
            "Bearer sk-test"
        );
        assert_eq!(request.headers().get("OpenAI-Beta").unwrap(), "realtime=v1");
        assert_eq!(
            request.headers().get("Sec-WebSocket-Protocol").unwrap(),
            "realtime"
        );
    }

    #[test]
    fn test_handshake_subprotocol_auth() {
        let config = test_config(AuthScheme::Subprotocol);
        let request = build_handshake(&config.ws_url(), &config).unwrap();
        assert!(request.headers().get("Authorization").is_none());
        let protocol = request
            .headers()
            .get("Sec-WebSocket-Protocol")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(protocol.contains("openai-insecure-api-key.sk-test"));
        assert!(protocol.contains("openai-beta.realtime-v1"));
    }

    #[tokio::test]
    async fn test_dispatch_audio_delta_marks_streaming() {
        let (tx, mut rx) = mpsc::channel(4);
        let state = Arc::new(AtomicU8::new(ModelLinkState::Configured as u8));
        dispatch_server_event(
            ServerEvent::AudioDelta {
                delta: "AAAA".to_string(),
            },
            &tx,
            &state,
        )
        .await
        .unwrap();
        assert_eq!(
            ModelLinkState::from_u8(state.load(Ordering::SeqCst)),
            ModelLinkState::Streaming
        );
        assert!(matches!(
            rx.recv().await,
            Some(ModelEvent::AudioDelta { .. })
        ));
    }

    #[tokio::test]
    async fn test_dispatch_error_is_nonfatal_event() {
        let (tx, mut rx) = mpsc::channel(4);
        let state = Arc::new(AtomicU8::new(ModelLinkState::Streaming as u8));
        dispatch_server_event(
            ServerEvent::Error {
                error: super::super::messages::ApiError {
                    error_type: "invalid_request_error".to_string(),
                    code: None,
                    message: "boom".to_string(),
                },
            },
            &tx,
            &state,
        )
        .await
        .unwrap();
        // State is untouched by in-band errors
        assert_eq!(
            ModelLinkState::from_u8(state.load(Ordering::SeqCst)),
            ModelLinkState::Streaming
        );
        assert!(matches!(
            rx.recv().await,
            Some(ModelEvent::ModelError { .. })
        ));
    }
}
