//! External collaborators behind capability traits.
//!
//! Each collaborator is a capability object chosen at construction time, so
//! stage code never branches on availability: a missing denoiser becomes
//! [`denoise::NoOpDenoiser`], a dead classifier fails open, and the HTTP
//! services map their failures to safe defaults in the dispatch stages.

pub mod agent;
pub mod denoise;
pub mod stt;
pub mod tts;
pub mod vad;

use std::sync::Arc;

use crate::config::Config;
use crate::error::SessionError;

pub use agent::ResponseGenerator;
pub use denoise::Denoiser;
pub use stt::SpeechToText;
pub use tts::SpeechSynthesizer;
pub use vad::VoiceClassifier;

/// The full collaborator set for one call's pipeline.
pub struct Collaborators {
    pub denoiser: Box<dyn Denoiser>,
    pub classifier: Box<dyn VoiceClassifier>,
    pub stt: Arc<dyn SpeechToText>,
    pub agent: Arc<dyn ResponseGenerator>,
    pub tts: Arc<dyn SpeechSynthesizer>,
}

/// Build the production collaborator set. A required collaborator that
/// cannot be constructed aborts session creation here, before any worker
/// starts.
pub fn build_collaborators(config: &Config) -> Result<Collaborators, SessionError> {
    let denoiser: Box<dyn Denoiser> = if config.pipeline.denoise {
        Box::new(denoise::RnnDenoiser::new())
    } else {
        Box::new(denoise::NoOpDenoiser)
    };

    Ok(Collaborators {
        denoiser,
        classifier: Box::new(vad::WebRtcClassifier::new(&config.vad)),
        stt: Arc::new(stt::WhisperHttp::new(&config.stt)),
        agent: Arc::new(agent::CompletionAgent::new(&config.agent)),
        tts: Arc::new(tts::GoogleTts::new(&config.tts)?),
    })
}
