//! Voice-activity collaborator.

use webrtc_vad::{SampleRate, Vad, VadMode};

use crate::config::VadConfig;

/// Window-level speech classification. Implementations fail open: when the
/// classifier cannot decide, the answer is "speech present", never a silent
/// stop of the transcription path.
pub trait VoiceClassifier: Send {
    fn classify(&mut self, window: &[f32]) -> bool;
}

/// Fail-open fallback: every window counts as speech.
pub struct AlwaysVoiced;

impl VoiceClassifier for AlwaysVoiced {
    fn classify(&mut self, _window: &[f32]) -> bool {
        true
    }
}

/// WebRTC VAD over 30 ms sub-frames with a vote across the window.
pub struct WebRtcClassifier {
    aggressiveness: u8,
    vote_ratio: f32,
}

/// 30 ms at 48 kHz.
const SUB_FRAME: usize = 1_440;

impl WebRtcClassifier {
    pub fn new(config: &VadConfig) -> Self {
        Self {
            aggressiveness: config.aggressiveness.min(3),
            vote_ratio: config.vote_ratio,
        }
    }

    fn mode(&self) -> VadMode {
        match self.aggressiveness {
            0 => VadMode::Quality,
            1 => VadMode::LowBitrate,
            2 => VadMode::Aggressive,
            _ => VadMode::VeryAggressive,
        }
    }
}

impl VoiceClassifier for WebRtcClassifier {
    fn classify(&mut self, window: &[f32]) -> bool {
        // The VAD state is not Send; build it per window. One window per
        // second keeps that negligible.
        let mut vad = Vad::new_with_rate(SampleRate::Rate48kHz);
        vad.set_mode(self.mode());

        let mut sub = [0i16; SUB_FRAME];
        let mut voiced = 0usize;
        let mut total = 0usize;

        for chunk in window.chunks_exact(SUB_FRAME) {
            for (dst, &s) in sub.iter_mut().zip(chunk.iter()) {
                *dst = (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
            }
            total += 1;
            match vad.is_voice_segment(&sub) {
                Ok(true) => voiced += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::debug!("vad error on sub-frame, counting as voiced: {e:?}");
                    voiced += 1;
                }
            }
        }

        if total == 0 {
            return false;
        }
        voiced > 0 && voiced as f32 / total as f32 >= self.vote_ratio
    }
}
