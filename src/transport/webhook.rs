//! Call-establishment hook.
//!
//! The provider calls this endpoint when a call comes in; the response is an
//! action document telling it to open the duplex media websocket.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::info;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct ActionDocument {
    pub actions: Vec<StreamAction>,
}

#[derive(Debug, Serialize)]
pub struct StreamAction {
    pub action: &'static str,
    pub url: String,
    pub parameters: StreamParameters,
}

#[derive(Debug, Serialize)]
pub struct StreamParameters {
    pub listen_mode: &'static str,
}

pub async fn voice_webhook(State(state): State<AppState>) -> Json<ActionDocument> {
    let url = format!("{}/media", state.config.server.ws_base_url);
    info!("signaling webhook hit, directing media stream to {url}");
    Json(ActionDocument {
        actions: vec![StreamAction {
            action: "stream",
            url,
            parameters: StreamParameters {
                listen_mode: "caller",
            },
        }],
    })
}
