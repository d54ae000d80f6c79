//! The `/media` websocket: real-time audio for a single call.
//!
//! One connection = one call = one pipeline. The receive loop feeds inbound
//! media into the session; a relay task drains synthesized audio back out
//! in arrival order. `stop`, a close frame, or a socket error all end in
//! the same teardown path.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::events::{parse_events, InboundEvent, OutboundMedia};
use super::AppState;
use crate::audio::resample::resample_all;
use crate::audio::{codec, WIRE_SAMPLE_RATE};
use crate::pipeline::{CallSession, Feed};
use crate::services::build_collaborators;

#[derive(Debug, Deserialize)]
pub struct MediaParams {
    #[serde(default)]
    pub callsid: Option<String>,
    #[serde(default)]
    pub streamsid: Option<String>,
}

pub async fn media_ws(
    ws: WebSocketUpgrade,
    Query(params): Query<MediaParams>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_media(socket, state, params))
}

async fn handle_media(socket: WebSocket, state: AppState, params: MediaParams) {
    let call_id = params
        .callsid
        .unwrap_or_else(|| format!("call-{}", Uuid::new_v4()));
    let stream_id = params
        .streamsid
        .unwrap_or_else(|| format!("stream-{}", Uuid::new_v4()));
    info!(%call_id, %stream_id, "media websocket accepted");

    if let Err(e) = state.registry.register(&call_id).await {
        warn!(%call_id, "refusing connection: {e}");
        return;
    }

    // Fatal init: a pipeline that cannot speak must not start.
    let collaborators = match build_collaborators(&state.config) {
        Ok(c) => c,
        Err(e) => {
            error!(%call_id, "failed to initialize collaborators, closing call: {e}");
            state.registry.deregister(&call_id).await;
            return;
        }
    };

    let mut session = CallSession::start(&state.config, collaborators, call_id.clone(), stream_id);
    let Some(mut audio_rx) = session.take_audio_rx() else {
        error!(%call_id, "outbound audio queue unavailable");
        session.shutdown().await;
        state.registry.deregister(&call_id).await;
        return;
    };

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Outbound relay: synthesized audio -> wire format -> websocket, in
    // arrival order.
    let ctx = session.context();
    let relay_stream_id = session.stream_id().to_string();
    let relay = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                _ = ctx.cancelled() => break,
                msg = audio_rx.recv() => msg,
            };
            let audio = match msg {
                Some(Feed::Item(audio)) => audio,
                Some(Feed::Stop) | None => break,
            };

            let wire = match resample_all(&audio.samples, audio.sample_rate, WIRE_SAMPLE_RATE) {
                Ok(wire) => wire,
                Err(e) => {
                    warn!("dropping outbound audio, resample failed: {e}");
                    continue;
                }
            };
            let message = OutboundMedia::new(&relay_stream_id, codec::encode_wire_payload(&wire));
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    warn!("dropping outbound audio, serialization failed: {e}");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                debug!("websocket send failed, relay exiting");
                break;
            }
        }
    });

    // Inbound loop.
    'receive: while let Some(Ok(message)) = ws_rx.next().await {
        match message {
            Message::Text(text) => {
                for event in parse_events(text.as_str()) {
                    match event {
                        InboundEvent::Start { stream_sid } => {
                            info!(%call_id, ?stream_sid, "media stream started");
                        }
                        InboundEvent::Media { media } => session.feed_wire(&media.payload),
                        InboundEvent::Stop {} => {
                            info!(%call_id, "media stream stopped by provider");
                            break 'receive;
                        }
                        InboundEvent::Unknown => debug!(%call_id, "ignoring unknown media event"),
                    }
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    info!(%call_id, "media websocket closing");
    session.shutdown().await;
    // Shutdown cancelled the context, so the relay exits on its own; the
    // timeout only guards a wedged socket send.
    let relay_abort = relay.abort_handle();
    if tokio::time::timeout(Duration::from_secs(2), relay).await.is_err() {
        warn!(%call_id, "outbound relay did not exit within grace, aborting it");
        relay_abort.abort();
    }
    state.registry.deregister(&call_id).await;
    let active_calls = state.registry.active_count().await;
    info!(
        %call_id,
        active_calls,
        "call resources released"
    );
}
