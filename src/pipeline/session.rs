//! Call session: owns one pipeline instance for one live call.
//!
//! The session allocates the queues and coordination state, starts one
//! worker per stage, feeds framed wire audio in at the front, hands the
//! outbound audio receiver to the transport relay, and drives shutdown when
//! the call ends. Stages get read access to their input queue and write
//! access to their output queue, nothing else.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::context::CallContext;
use super::denoise::DenoiseStage;
use super::msg::{AudioFrame, AudioSegment, Feed, Reply, SynthesizedAudio, Transcript};
use super::respond::RespondStage;
use super::segmenter::SegmenterStage;
use super::selector::SelectorStage;
use super::synthesize::SynthesizeStage;
use super::transcribe::TranscribeStage;
use crate::audio::framer::Framer;
use crate::audio::resample::StreamResampler;
use crate::audio::{codec, PIPELINE_SAMPLE_RATE, WIRE_SAMPLE_RATE};
use crate::config::Config;
use crate::services::Collaborators;

/// Inbound resampler chunk: 20 ms at the wire rate.
const INBOUND_CHUNK: usize = 160;

/// Framer capacity: one second of pipeline audio.
const FRAMER_CAPACITY: usize = PIPELINE_SAMPLE_RATE as usize;

/// Per-call counters, logged at teardown.
#[derive(Debug, Default)]
pub struct CallStats {
    frames_in: AtomicU64,
    frames_dropped: AtomicU64,
    utterances: AtomicU64,
    replies: AtomicU64,
}

impl CallStats {
    pub fn record_frame(&self) {
        self.frames_in.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_frame(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_utterance(&self) {
        self.utterances.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reply(&self) {
        self.replies.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_in(&self) -> u64 {
        self.frames_in.load(Ordering::Relaxed)
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    pub fn utterances(&self) -> u64 {
        self.utterances.load(Ordering::Relaxed)
    }

    pub fn replies(&self) -> u64 {
        self.replies.load(Ordering::Relaxed)
    }
}

/// Clones of every stage input, kept by the session so shutdown can push a
/// stop sentinel into each queue.
struct StageInputs {
    frame_tx: mpsc::Sender<Feed<AudioFrame>>,
    denoised_tx: mpsc::Sender<Feed<AudioFrame>>,
    segment_tx: mpsc::Sender<Feed<AudioSegment>>,
    utterance_tx: mpsc::Sender<Feed<AudioSegment>>,
    transcript_tx: mpsc::Sender<Feed<Transcript>>,
    reply_tx: mpsc::Sender<Feed<Reply>>,
}

impl StageInputs {
    /// Best effort: a full queue is fine, the cancellation token covers it.
    fn send_stops(&self) {
        let _ = self.frame_tx.try_send(Feed::Stop);
        let _ = self.denoised_tx.try_send(Feed::Stop);
        let _ = self.segment_tx.try_send(Feed::Stop);
        let _ = self.utterance_tx.try_send(Feed::Stop);
        let _ = self.transcript_tx.try_send(Feed::Stop);
        let _ = self.reply_tx.try_send(Feed::Stop);
    }
}

pub struct CallSession {
    call_id: String,
    stream_id: String,
    ctx: Arc<CallContext>,
    stats: Arc<CallStats>,
    framer: Framer,
    inbound_resampler: Option<StreamResampler>,
    inputs: StageInputs,
    audio_rx: Option<mpsc::Receiver<Feed<SynthesizedAudio>>>,
    workers: Vec<(&'static str, JoinHandle<()>)>,
    shutdown_grace: Duration,
}

impl CallSession {
    /// Wire the queues, start all six workers, and queue the greeting.
    pub fn start(
        config: &Config,
        collaborators: Collaborators,
        call_id: String,
        stream_id: String,
    ) -> Self {
        let p = &config.pipeline;
        let ctx = Arc::new(CallContext::new());
        let stats = Arc::new(CallStats::default());

        let (frame_tx, frame_rx) = mpsc::channel(p.frame_queue_depth);
        let (denoised_tx, denoised_rx) = mpsc::channel(p.frame_queue_depth);
        let (segment_tx, segment_rx) = mpsc::channel(p.segment_queue_depth);
        let (utterance_tx, utterance_rx) = mpsc::channel(p.text_queue_depth);
        let (transcript_tx, transcript_rx) = mpsc::channel(p.text_queue_depth);
        let (reply_tx, reply_rx) = mpsc::channel(p.text_queue_depth);
        let (audio_tx, audio_rx) = mpsc::channel(p.audio_queue_depth);

        let mut workers: Vec<(&'static str, JoinHandle<()>)> = Vec::with_capacity(6);
        workers.push((
            "denoise",
            tokio::spawn(
                DenoiseStage::new(frame_rx, denoised_tx.clone(), collaborators.denoiser, ctx.clone())
                    .run(),
            ),
        ));
        workers.push((
            "segmenter",
            tokio::spawn(
                SegmenterStage::new(
                    denoised_rx,
                    segment_tx.clone(),
                    collaborators.classifier,
                    ctx.clone(),
                    p,
                )
                .run(),
            ),
        ));
        workers.push((
            "selector",
            tokio::spawn(
                SelectorStage::new(
                    segment_rx,
                    utterance_tx.clone(),
                    ctx.clone(),
                    stats.clone(),
                    p,
                )
                .run(),
            ),
        ));
        workers.push((
            "transcribe",
            tokio::spawn(
                TranscribeStage::new(
                    utterance_rx,
                    transcript_tx.clone(),
                    collaborators.stt,
                    ctx.clone(),
                )
                .run(),
            ),
        ));
        workers.push((
            "respond",
            tokio::spawn(
                RespondStage::new(
                    transcript_rx,
                    reply_tx.clone(),
                    collaborators.agent,
                    ctx.clone(),
                    stats.clone(),
                    config.agent.fallback_reply.clone(),
                )
                .run(),
            ),
        ));
        workers.push((
            "synthesize",
            tokio::spawn(
                SynthesizeStage::new(reply_rx, audio_tx, collaborators.tts, ctx.clone()).run(),
            ),
        ));

        let inputs = StageInputs {
            frame_tx,
            denoised_tx,
            segment_tx,
            utterance_tx,
            transcript_tx,
            reply_tx,
        };

        // The agent speaks first.
        let greeting = config.agent.greeting.trim();
        if !greeting.is_empty() {
            let _ = inputs.reply_tx.try_send(Feed::Item(Reply(greeting.to_string())));
        }

        let inbound_resampler =
            match StreamResampler::new(WIRE_SAMPLE_RATE, PIPELINE_SAMPLE_RATE, INBOUND_CHUNK) {
                Ok(r) => Some(r),
                Err(e) => {
                    // Inbound audio is unusable without it; feed_wire will
                    // drop payloads and say so.
                    warn!(%call_id, "inbound resampler unavailable: {e}");
                    None
                }
            };

        info!(%call_id, %stream_id, "pipeline started");
        Self {
            call_id,
            stream_id,
            ctx,
            stats,
            framer: Framer::new(FRAMER_CAPACITY),
            inbound_resampler,
            inputs,
            audio_rx: Some(audio_rx),
            workers,
            shutdown_grace: Duration::from_millis(p.shutdown_grace_ms),
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn context(&self) -> Arc<CallContext> {
        self.ctx.clone()
    }

    pub fn stats(&self) -> Arc<CallStats> {
        self.stats.clone()
    }

    /// The outbound audio queue, taken once by the transport relay.
    pub fn take_audio_rx(&mut self) -> Option<mpsc::Receiver<Feed<SynthesizedAudio>>> {
        self.audio_rx.take()
    }

    /// Accept one inbound media payload: decode, resample, frame, enqueue.
    /// Never blocks; when the frame queue is saturated the newest frames
    /// are dropped so the transport stays live.
    pub fn feed_wire(&mut self, payload: &str) {
        if self.ctx.is_shutdown() {
            return;
        }
        let wire = match codec::decode_wire_payload(payload) {
            Ok(samples) => samples,
            Err(e) => {
                warn!(call_id = %self.call_id, "discarding undecodable payload: {e}");
                return;
            }
        };
        let Some(resampler) = self.inbound_resampler.as_mut() else {
            return;
        };
        let samples = match resampler.push(&wire) {
            Ok(samples) => samples,
            Err(e) => {
                warn!(call_id = %self.call_id, "discarding chunk, resample failed: {e}");
                return;
            }
        };
        self.feed_samples(&samples);
    }

    /// Accept pipeline-rate samples directly (already decoded).
    pub fn feed_samples(&mut self, samples: &[f32]) {
        let overflow = self.framer.push(samples);
        if overflow > 0 {
            trace!(call_id = %self.call_id, overflow, "framer full, dropping input samples");
        }
        while let Some(frame) = self.framer.next_frame() {
            self.stats.record_frame();
            match self.inputs.frame_tx.try_send(Feed::Item(AudioFrame(frame))) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.stats.record_dropped_frame();
                    trace!(call_id = %self.call_id, "frame queue full, dropping newest frame");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => return,
            }
        }
    }

    /// Tear the pipeline down: signal shutdown, unblock every queue, then
    /// join each worker within the grace period and abort any straggler.
    pub async fn shutdown(mut self) {
        info!(call_id = %self.call_id, "shutting down pipeline");
        self.ctx.shutdown();
        self.inputs.send_stops();

        for (name, mut handle) in self.workers.drain(..) {
            match tokio::time::timeout(self.shutdown_grace, &mut handle).await {
                Ok(Ok(())) => debug!(call_id = %self.call_id, worker = name, "worker exited"),
                Ok(Err(e)) => warn!(call_id = %self.call_id, worker = name, "worker panicked: {e}"),
                Err(_) => {
                    warn!(
                        call_id = %self.call_id,
                        worker = name, "worker did not exit within grace period, aborting"
                    );
                    handle.abort();
                }
            }
        }

        info!(
            call_id = %self.call_id,
            frames_in = self.stats.frames_in(),
            frames_dropped = self.stats.frames_dropped(),
            utterances = self.stats.utterances(),
            replies = self.stats.replies(),
            "pipeline stopped"
        );
    }
}

