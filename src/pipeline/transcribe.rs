//! Transcription dispatch: one candidate utterance in, one transcript out.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::context::CallContext;
use super::msg::{AudioSegment, Feed, Transcript};
use crate::audio::PIPELINE_SAMPLE_RATE;
use crate::services::SpeechToText;

pub struct TranscribeStage {
    rx: mpsc::Receiver<Feed<AudioSegment>>,
    tx: mpsc::Sender<Feed<Transcript>>,
    stt: Arc<dyn SpeechToText>,
    ctx: Arc<CallContext>,
}

impl TranscribeStage {
    pub fn new(
        rx: mpsc::Receiver<Feed<AudioSegment>>,
        tx: mpsc::Sender<Feed<Transcript>>,
        stt: Arc<dyn SpeechToText>,
        ctx: Arc<CallContext>,
    ) -> Self {
        Self { rx, tx, stt, ctx }
    }

    pub async fn run(mut self) {
        debug!("transcribe stage started");
        loop {
            let msg = tokio::select! {
                _ = self.ctx.cancelled() => break,
                msg = self.rx.recv() => msg,
            };
            let utterance = match msg {
                Some(Feed::Item(segment)) => segment,
                Some(Feed::Stop) | None => break,
            };

            let result = tokio::select! {
                _ = self.ctx.cancelled() => break,
                r = self.stt.transcribe(utterance.samples(), PIPELINE_SAMPLE_RATE) => r,
            };

            // Empty or failed recognition still flows forward: downstream
            // treats it as "no actionable input", not as an error.
            let transcript = match result {
                Ok(text) => {
                    let text = text.trim();
                    if text.is_empty() {
                        debug!("recognition produced no text");
                        Transcript::Empty
                    } else {
                        info!(text, "utterance transcribed");
                        Transcript::Text(text.to_string())
                    }
                }
                Err(e) => {
                    warn!("recognition failed: {e}");
                    Transcript::Empty
                }
            };

            if self.tx.try_send(Feed::Item(transcript)).is_err() {
                warn!("response queue full, dropping transcript");
            }
        }
        debug!("transcribe stage stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;

    struct FixedStt(Option<String>);

    #[async_trait]
    impl SpeechToText for FixedStt {
        async fn transcribe(&self, _samples: &[f32], _rate: u32) -> anyhow::Result<String> {
            self.0.clone().ok_or_else(|| anyhow!("recognizer offline"))
        }
    }

    async fn run_one(stt: FixedStt) -> Transcript {
        let (in_tx, in_rx) = mpsc::channel(4);
        let (out_tx, mut out_rx) = mpsc::channel(4);
        let ctx = Arc::new(CallContext::new());
        let worker = tokio::spawn(TranscribeStage::new(in_rx, out_tx, Arc::new(stt), ctx).run());

        in_tx
            .send(Feed::Item(AudioSegment::new(vec![0.1; 480])))
            .await
            .unwrap();
        in_tx.send(Feed::Stop).await.unwrap();
        worker.await.unwrap();

        match out_rx.try_recv().expect("transcript forwarded") {
            Feed::Item(t) => t,
            Feed::Stop => panic!("unexpected stop"),
        }
    }

    #[tokio::test]
    async fn success_forwards_trimmed_text() {
        let t = run_one(FixedStt(Some("  hello there  ".to_string()))).await;
        assert_eq!(t, Transcript::Text("hello there".to_string()));
    }

    #[tokio::test]
    async fn empty_recognition_forwards_empty_marker() {
        let t = run_one(FixedStt(Some("   ".to_string()))).await;
        assert_eq!(t, Transcript::Empty);
    }

    #[tokio::test]
    async fn failure_forwards_empty_marker() {
        let t = run_one(FixedStt(None)).await;
        assert_eq!(t, Transcript::Empty);
    }
}
