//! Denoise stage: fixed-size raw frames in, same-size denoised frames out.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::context::CallContext;
use super::msg::{AudioFrame, Feed};
use crate::audio::FRAME_SAMPLES;
use crate::services::Denoiser;

pub struct DenoiseStage {
    rx: mpsc::Receiver<Feed<AudioFrame>>,
    tx: mpsc::Sender<Feed<AudioFrame>>,
    denoiser: Box<dyn Denoiser>,
    ctx: Arc<CallContext>,
}

impl DenoiseStage {
    pub fn new(
        rx: mpsc::Receiver<Feed<AudioFrame>>,
        tx: mpsc::Sender<Feed<AudioFrame>>,
        denoiser: Box<dyn Denoiser>,
        ctx: Arc<CallContext>,
    ) -> Self {
        Self {
            rx,
            tx,
            denoiser,
            ctx,
        }
    }

    pub async fn run(mut self) {
        debug!("denoise stage started");
        loop {
            let msg = tokio::select! {
                _ = self.ctx.cancelled() => break,
                msg = self.rx.recv() => msg,
            };
            let AudioFrame(mut samples) = match msg {
                Some(Feed::Item(frame)) => frame,
                Some(Feed::Stop) | None => break,
            };

            // Downstream assumes the fixed size; resizing would shift the
            // window clock, so misfit frames are dropped instead.
            if samples.len() != FRAME_SAMPLES {
                warn!(len = samples.len(), "dropping frame of unexpected length");
                continue;
            }

            self.denoiser.process(&mut samples);

            if self.tx.try_send(Feed::Item(AudioFrame(samples))).is_err() {
                warn!("segmenter queue full, dropping denoised frame");
            }
        }
        debug!("denoise stage stopped");
    }
}
