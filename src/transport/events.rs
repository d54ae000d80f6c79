//! Wire-level media stream messages.
//!
//! The provider sends JSON text frames; a single websocket frame has been
//! observed to carry several concatenated JSON objects, so inbound parsing
//! walks the frame with a stream deserializer instead of assuming one
//! object per frame.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum InboundEvent {
    Start {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
    },
    Media {
        media: MediaPayload,
    },
    Stop {},
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct MediaPayload {
    pub payload: String,
}

#[derive(Debug, Serialize)]
pub struct OutboundMedia<'a> {
    pub event: &'static str,
    #[serde(rename = "streamSid")]
    pub stream_sid: &'a str,
    pub media: OutboundPayload,
}

#[derive(Debug, Serialize)]
pub struct OutboundPayload {
    pub payload: String,
}

impl<'a> OutboundMedia<'a> {
    pub fn new(stream_sid: &'a str, payload: String) -> Self {
        Self {
            event: "media",
            stream_sid,
            media: OutboundPayload { payload },
        }
    }
}

/// Parse every JSON object in one text frame. Stops at the first
/// undecodable object; whatever parsed before it is still handled.
pub fn parse_events(text: &str) -> Vec<InboundEvent> {
    let mut events = Vec::new();
    let mut stream = serde_json::Deserializer::from_str(text).into_iter::<InboundEvent>();
    for item in &mut stream {
        match item {
            Ok(event) => events.push(event),
            Err(e) => {
                tracing::debug!("stopping at undecodable media event: {e}");
                break;
            }
        }
    }
    events
}
