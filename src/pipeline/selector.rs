//! Utterance selector: buffers voiced windows and, when the utterance ends,
//! emits the loudest one as the candidate for transcription.
//!
//! A noisy call produces several overlapping voiced windows (echo,
//! cross-talk); the loudest window is the cheap proxy for the primary
//! speaker without running recognition on every window.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::context::CallContext;
use super::msg::{AudioSegment, Feed};
use super::session::CallStats;
use crate::config::PipelineConfig;

/// Bounded segment buffer with watermark eviction: once `high_water`
/// segments are held, the oldest are dropped down to `keep_recent`. The
/// memory bound holds for arbitrarily long utterances.
pub struct UtteranceBuffer {
    segments: VecDeque<AudioSegment>,
    high_water: usize,
    keep_recent: usize,
}

impl UtteranceBuffer {
    pub fn new(high_water: usize, keep_recent: usize) -> Self {
        Self {
            segments: VecDeque::with_capacity(high_water.min(1_024)),
            high_water: high_water.max(1),
            keep_recent: keep_recent.clamp(1, high_water.max(1)),
        }
    }

    pub fn push(&mut self, segment: AudioSegment) {
        self.segments.push_back(segment);
        if self.segments.len() > self.high_water {
            let excess = self.segments.len() - self.keep_recent;
            self.segments.drain(..excess);
        }
    }

    /// Take the loudest buffered segment (ties go to the most recent) and
    /// clear the buffer. `None` when nothing was buffered.
    pub fn take_loudest(&mut self) -> Option<AudioSegment> {
        let mut best: Option<usize> = None;
        for (i, segment) in self.segments.iter().enumerate() {
            match best {
                Some(b) if segment.loudness() < self.segments[b].loudness() => {}
                _ => best = Some(i),
            }
        }
        let chosen = best.map(|i| self.segments[i].clone());
        self.segments.clear();
        chosen
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

pub struct SelectorStage {
    rx: mpsc::Receiver<Feed<AudioSegment>>,
    tx: mpsc::Sender<Feed<AudioSegment>>,
    ctx: Arc<CallContext>,
    stats: Arc<CallStats>,
    buffer: UtteranceBuffer,
}

impl SelectorStage {
    pub fn new(
        rx: mpsc::Receiver<Feed<AudioSegment>>,
        tx: mpsc::Sender<Feed<AudioSegment>>,
        ctx: Arc<CallContext>,
        stats: Arc<CallStats>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            rx,
            tx,
            ctx,
            stats,
            buffer: UtteranceBuffer::new(config.selector_high_water, config.selector_keep_recent),
        }
    }

    pub async fn run(mut self) {
        debug!("selector stage started");
        loop {
            tokio::select! {
                _ = self.ctx.cancelled() => break,
                _ = self.ctx.utterance_wake() => {}
                msg = self.rx.recv() => {
                    match msg {
                        Some(Feed::Item(segment)) => self.buffer.push(segment),
                        Some(Feed::Stop) | None => break,
                    }
                }
            }

            if self.ctx.take_speech_ended() {
                match self.buffer.take_loudest() {
                    Some(utterance) => {
                        self.stats.record_utterance();
                        info!(
                            loudness = utterance.loudness(),
                            samples = utterance.len(),
                            "utterance selected"
                        );
                        if self.tx.try_send(Feed::Item(utterance)).is_err() {
                            warn!("transcription queue full, dropping utterance");
                        }
                    }
                    None => debug!("speech ended with no buffered segments"),
                }
            }
        }
        debug!("selector stage stopped");
    }
}
