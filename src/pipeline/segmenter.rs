//! Segmentation stage: voice activity and utterance boundary detection.
//!
//! Denoised frames accumulate into ~1 s analysis windows; each window is
//! classified and drives a three-state machine. Time is the stream's sample
//! clock, not wall time, so boundary behavior is identical for live audio
//! and for tests that feed frames as fast as they can.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::context::CallContext;
use super::msg::{AudioFrame, AudioSegment, Feed};
use crate::audio::PIPELINE_SAMPLE_RATE;
use crate::config::PipelineConfig;
use crate::services::VoiceClassifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpeechState {
    Silent,
    Speaking,
    TrailingSilence { since_ms: u64 },
}

/// The window/state-machine core, separate from the queue plumbing.
pub struct Segmenter {
    classifier: Box<dyn VoiceClassifier>,
    ctx: Arc<CallContext>,
    window_samples: usize,
    overlap_samples: usize,
    silence_timeout_ms: u64,
    buffer: Vec<f32>,
    state: SpeechState,
    /// Stream time in ms, advanced by consumed frames.
    clock_ms: u64,
}

impl Segmenter {
    pub fn new(
        classifier: Box<dyn VoiceClassifier>,
        ctx: Arc<CallContext>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            classifier,
            ctx,
            window_samples: config.window_samples,
            overlap_samples: config.overlap_samples,
            silence_timeout_ms: config.silence_timeout_ms,
            buffer: Vec::with_capacity(config.window_samples),
            state: SpeechState::Silent,
            clock_ms: 0,
        }
    }

    /// Feed one denoised frame. Returns a voice-tagged segment when the
    /// window that just completed contained speech.
    pub fn push_frame(&mut self, frame: &[f32]) -> Option<AudioSegment> {
        if frame.is_empty() {
            return None;
        }
        self.clock_ms += (frame.len() as u64 * 1_000) / u64::from(PIPELINE_SAMPLE_RATE);
        self.buffer.extend_from_slice(frame);
        if self.buffer.len() < self.window_samples {
            return None;
        }

        let speech_present = self.classifier.classify(&self.buffer);
        let forwarded = self.transition(speech_present);

        // Retain a trailing overlap so a word straddling the window
        // boundary is not cut.
        let keep_from = self.buffer.len().saturating_sub(self.overlap_samples);
        self.buffer.drain(..keep_from);

        forwarded
    }

    fn transition(&mut self, speech_present: bool) -> Option<AudioSegment> {
        match (self.state, speech_present) {
            (SpeechState::Silent, true) => {
                self.state = SpeechState::Speaking;
                self.ctx.set_voice_detected(true);
                info!("voice start");
                Some(AudioSegment::new(self.buffer.clone()))
            }
            (SpeechState::Silent, false) => None,
            (SpeechState::Speaking, true) => Some(AudioSegment::new(self.buffer.clone())),
            (SpeechState::Speaking, false) => {
                self.state = SpeechState::TrailingSilence {
                    since_ms: self.clock_ms,
                };
                None
            }
            // A gap shorter than the timeout is still the same utterance.
            (SpeechState::TrailingSilence { .. }, true) => {
                self.state = SpeechState::Speaking;
                Some(AudioSegment::new(self.buffer.clone()))
            }
            (SpeechState::TrailingSilence { since_ms }, false) => {
                if self.clock_ms.saturating_sub(since_ms) >= self.silence_timeout_ms {
                    self.state = SpeechState::Silent;
                    self.ctx.set_voice_detected(false);
                    self.ctx.signal_speech_ended();
                    info!("voice end after {}ms of trailing silence", self.clock_ms - since_ms);
                }
                None
            }
        }
    }

    #[cfg(test)]
    fn is_speaking(&self) -> bool {
        self.state != SpeechState::Silent
    }
}

/// Queue-facing worker around [`Segmenter`].
pub struct SegmenterStage {
    rx: mpsc::Receiver<Feed<AudioFrame>>,
    tx: mpsc::Sender<Feed<AudioSegment>>,
    core: Segmenter,
    ctx: Arc<CallContext>,
}

impl SegmenterStage {
    pub fn new(
        rx: mpsc::Receiver<Feed<AudioFrame>>,
        tx: mpsc::Sender<Feed<AudioSegment>>,
        classifier: Box<dyn VoiceClassifier>,
        ctx: Arc<CallContext>,
        config: &PipelineConfig,
    ) -> Self {
        let core = Segmenter::new(classifier, ctx.clone(), config);
        Self { rx, tx, core, ctx }
    }

    pub async fn run(mut self) {
        debug!("segmenter stage started");
        loop {
            let msg = tokio::select! {
                _ = self.ctx.cancelled() => break,
                msg = self.rx.recv() => msg,
            };
            let AudioFrame(samples) = match msg {
                Some(Feed::Item(frame)) => frame,
                Some(Feed::Stop) | None => break,
            };

            if let Some(segment) = self.core.push_frame(&samples) {
                if self.tx.try_send(Feed::Item(segment)).is_err() {
                    warn!("selector queue full, dropping voiced window");
                }
            }
        }
        debug!("segmenter stage stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::FRAME_SAMPLES;
    use crate::services::VoiceClassifier;

    /// Classifier scripted per window: pops the front of the list, and
    /// fails open once the script runs out.
    struct Scripted(std::collections::VecDeque<bool>);

    impl Scripted {
        fn new(script: &[bool]) -> Box<Self> {
            Box::new(Self(script.iter().copied().collect()))
        }
    }

    impl VoiceClassifier for Scripted {
        fn classify(&mut self, _window: &[f32]) -> bool {
            self.0.pop_front().unwrap_or(true)
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            silence_timeout_ms: 700,
            window_samples: 48_000,
            overlap_samples: 4_800,
            ..PipelineConfig::default()
        }
    }

    /// Feed whole windows of frames; returns the segment forwarded per
    /// window, if any. The first window takes 100 frames, later ones 90
    /// because the overlap is retained.
    fn feed_windows(seg: &mut Segmenter, windows: usize) -> Vec<Option<AudioSegment>> {
        let frame = vec![0.1f32; FRAME_SAMPLES];
        let mut out = Vec::new();
        for w in 0..windows {
            let frames = if w == 0 { 100 } else { 90 };
            let mut forwarded = None;
            for _ in 0..frames {
                if let Some(segment) = seg.push_frame(&frame) {
                    forwarded = Some(segment);
                }
            }
            out.push(forwarded);
        }
        out
    }

    #[test]
    fn speech_ended_fires_exactly_once_after_timeout() {
        let ctx = Arc::new(CallContext::new());
        // speech, speech, silence, silence, silence
        let mut seg = Segmenter::new(
            Scripted::new(&[true, true, false, false, false]),
            ctx.clone(),
            &config(),
        );

        let forwarded = feed_windows(&mut seg, 5);

        assert!(forwarded[0].is_some(), "first voiced window forwarded");
        assert!(forwarded[1].is_some(), "second voiced window forwarded");
        assert!(forwarded[2].is_none(), "silent window not forwarded");
        assert!(!ctx.voice_detected());
        assert!(ctx.take_speech_ended(), "utterance boundary signalled");
        assert!(!ctx.take_speech_ended(), "signalled exactly once");
        assert!(!seg.is_speaking());
    }

    #[test]
    fn brief_gap_does_not_end_utterance() {
        let ctx = Arc::new(CallContext::new());
        // Each 1 s silent gap sits below the 1.5 s timeout and is reset by
        // the following voiced window, so the utterance never ends even
        // though total silence across the call exceeds the timeout.
        let mut cfg = config();
        cfg.silence_timeout_ms = 1_500;
        let mut seg = Segmenter::new(
            Scripted::new(&[true, false, true, false, true]),
            ctx.clone(),
            &cfg,
        );

        feed_windows(&mut seg, 5);
        assert!(!ctx.take_speech_ended(), "sub-timeout gaps never end the utterance");
        assert!(seg.is_speaking());
    }

    #[test]
    fn voiced_window_during_trailing_silence_resumes_speaking() {
        let ctx = Arc::new(CallContext::new());
        let mut cfg = config();
        cfg.silence_timeout_ms = 1_500;
        let mut seg = Segmenter::new(
            Scripted::new(&[true, false, true]),
            ctx.clone(),
            &cfg,
        );

        let forwarded = feed_windows(&mut seg, 3);
        assert!(forwarded[0].is_some());
        assert!(forwarded[1].is_none(), "trailing window held back");
        assert!(forwarded[2].is_some(), "resumed speech forwarded again");
        assert!(seg.is_speaking());
        assert!(!ctx.take_speech_ended());
    }

    #[test]
    fn window_retains_trailing_overlap() {
        let ctx = Arc::new(CallContext::new());
        let mut seg = Segmenter::new(Scripted::new(&[true]), ctx, &config());

        let frame = vec![0.1f32; FRAME_SAMPLES];
        let mut segment = None;
        for _ in 0..100 {
            if let Some(s) = seg.push_frame(&frame) {
                segment = Some(s);
            }
        }
        let segment = segment.expect("window completed");
        assert_eq!(segment.len(), 48_000, "full window forwarded");
        assert_eq!(seg.buffer.len(), 4_800, "overlap retained for the next window");
    }

    #[test]
    fn silence_only_never_signals() {
        let ctx = Arc::new(CallContext::new());
        let mut seg = Segmenter::new(Scripted::new(&[false; 10]), ctx.clone(), &config());
        let forwarded = feed_windows(&mut seg, 10);
        assert!(forwarded.iter().all(Option::is_none));
        assert!(!ctx.take_speech_ended());
        assert!(!ctx.voice_detected());
    }
}
