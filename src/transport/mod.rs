//! Telephony-facing surface: the signaling webhook and the `/media`
//! websocket carrying the call audio.

pub mod events;
pub mod registry;
pub mod webhook;
pub mod ws;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::config::Config;
use registry::CallRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<CallRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(CallRegistry::new()),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/voice-webhook",
            get(webhook::voice_webhook).post(webhook::voice_webhook),
        )
        .route("/media", get(ws::media_ws))
        .with_state(state)
}
