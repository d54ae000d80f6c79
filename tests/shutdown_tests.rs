//! Teardown guarantees: workers exit within the grace period for any input
//! history, including a worker stuck in a slow collaborator call.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

use voxline::config::Config;
use voxline::pipeline::{CallSession, SynthesizedAudio};
use voxline::services::denoise::NoOpDenoiser;
use voxline::services::vad::AlwaysVoiced;
use voxline::services::{Collaborators, ResponseGenerator, SpeechSynthesizer, SpeechToText};

struct IdleStt;

#[async_trait]
impl SpeechToText for IdleStt {
    async fn transcribe(&self, _samples: &[f32], _rate: u32) -> anyhow::Result<String> {
        Ok(String::new())
    }
}

struct IdleAgent;

#[async_trait]
impl ResponseGenerator for IdleAgent {
    async fn respond(&self, _transcript: &str) -> anyhow::Result<String> {
        Ok("ok".to_string())
    }
}

/// Synthesizer that never returns: models a collaborator hung mid-call.
struct HungTts;

#[async_trait]
impl SpeechSynthesizer for HungTts {
    async fn synthesize(&self, _text: &str) -> anyhow::Result<SynthesizedAudio> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        unreachable!("the pipeline must not wait this long");
    }
}

struct InstantTts;

#[async_trait]
impl SpeechSynthesizer for InstantTts {
    async fn synthesize(&self, _text: &str) -> anyhow::Result<SynthesizedAudio> {
        Ok(SynthesizedAudio {
            samples: vec![0.0; 240],
            sample_rate: 24_000,
        })
    }
}

fn collaborators(tts: Arc<dyn SpeechSynthesizer>) -> Collaborators {
    Collaborators {
        denoiser: Box::new(NoOpDenoiser),
        classifier: Box::new(AlwaysVoiced),
        stt: Arc::new(IdleStt),
        agent: Arc::new(IdleAgent),
        tts,
    }
}

#[tokio::test]
async fn idle_pipeline_shuts_down_promptly() {
    let mut config = Config::default();
    config.agent.greeting = String::new();
    let session = CallSession::start(
        &config,
        collaborators(Arc::new(InstantTts)),
        "call-idle".to_string(),
        "stream-idle".to_string(),
    );

    // All six workers are parked on empty queues.
    let started = Instant::now();
    session.shutdown().await;
    assert!(
        started.elapsed() < Duration::from_millis(config.pipeline.shutdown_grace_ms),
        "idle workers exit well inside the grace period"
    );
}

#[tokio::test]
async fn pipeline_blocked_on_hung_collaborator_still_shuts_down() {
    let mut config = Config::default();
    // The greeting routes straight into the synthesize stage, which then
    // hangs inside the collaborator call.
    config.agent.greeting = "hello".to_string();
    let session = CallSession::start(
        &config,
        collaborators(Arc::new(HungTts)),
        "call-hung".to_string(),
        "stream-hung".to_string(),
    );

    // Let the synthesize worker pick the greeting up and enter the hang.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    session.shutdown().await;
    let grace = Duration::from_millis(config.pipeline.shutdown_grace_ms);
    assert!(
        started.elapsed() < grace + Duration::from_millis(500),
        "teardown makes forward progress past a stuck collaborator (took {:?})",
        started.elapsed()
    );
}

#[tokio::test]
async fn shutdown_is_safe_with_queued_unprocessed_work() {
    let mut config = Config::default();
    config.agent.greeting = String::new();
    let mut session = CallSession::start(
        &config,
        collaborators(Arc::new(InstantTts)),
        "call-busy".to_string(),
        "stream-busy".to_string(),
    );

    // Push a burst of audio and tear down immediately, while frames are
    // still in flight between stages.
    let noise: Vec<f32> = (0..48_000).map(|i| ((i % 17) as f32 - 8.0) * 0.01).collect();
    session.feed_samples(&noise);

    let started = Instant::now();
    session.shutdown().await;
    assert!(
        started.elapsed() < Duration::from_millis(config.pipeline.shutdown_grace_ms + 500),
        "in-flight work does not stall teardown"
    );
}
