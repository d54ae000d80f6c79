//! Synthesis dispatch: reply text in, playable audio out.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::context::CallContext;
use super::msg::{Feed, Reply, SynthesizedAudio};
use crate::services::SpeechSynthesizer;

pub struct SynthesizeStage {
    rx: mpsc::Receiver<Feed<Reply>>,
    tx: mpsc::Sender<Feed<SynthesizedAudio>>,
    tts: Arc<dyn SpeechSynthesizer>,
    ctx: Arc<CallContext>,
}

impl SynthesizeStage {
    pub fn new(
        rx: mpsc::Receiver<Feed<Reply>>,
        tx: mpsc::Sender<Feed<SynthesizedAudio>>,
        tts: Arc<dyn SpeechSynthesizer>,
        ctx: Arc<CallContext>,
    ) -> Self {
        Self { rx, tx, tts, ctx }
    }

    pub async fn run(mut self) {
        debug!("synthesize stage started");
        loop {
            let msg = tokio::select! {
                _ = self.ctx.cancelled() => break,
                msg = self.rx.recv() => msg,
            };
            let Reply(text) = match msg {
                Some(Feed::Item(reply)) => reply,
                Some(Feed::Stop) | None => break,
            };
            if text.trim().is_empty() {
                debug!("blank reply, nothing to synthesize");
                continue;
            }

            let result = tokio::select! {
                _ = self.ctx.cancelled() => break,
                r = self.tts.synthesize(&text) => r,
            };

            match result {
                Ok(audio) => {
                    debug!(
                        samples = audio.samples.len(),
                        rate = audio.sample_rate,
                        "reply synthesized"
                    );
                    if self.tx.try_send(Feed::Item(audio)).is_err() {
                        warn!("outbound audio queue full, dropping synthesized reply");
                    }
                }
                // Deliberate degrade: this turn stays silent, the next one
                // can still proceed.
                Err(e) => warn!("synthesis failed, skipping turn: {e}"),
            }
        }
        debug!("synthesize stage stopped");
    }
}
