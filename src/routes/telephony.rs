//! Telephony WebSocket route configuration.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::telephony::media_stream_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the telephony media-stream router.
///
/// # Endpoint
///
/// `GET /telephony/media-stream` - WebSocket upgrade for one call's
/// bidirectional media stream
///
/// # Protocol
///
/// After upgrade the provider sends JSON events tagged by `event`:
/// `connected`, then `start` with the call identity, then `media`
/// frames carrying base64 G.711 µ-law audio, and finally `stop`.
/// The server sends back `media` frames addressed by streamSid.
pub fn create_telephony_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/telephony/media-stream", get(media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
