//! Noise-suppression collaborator.

use nnnoiseless::DenoiseState;

use crate::audio::FRAME_SAMPLES;

/// Best-effort, in-place noise suppression over one fixed-size frame.
/// Implementations must leave the frame untouched rather than fail.
pub trait Denoiser: Send {
    fn process(&mut self, frame: &mut [f32]);
}

/// Identity denoiser, selected when suppression is disabled.
pub struct NoOpDenoiser;

impl Denoiser for NoOpDenoiser {
    fn process(&mut self, _frame: &mut [f32]) {}
}

/// RNNoise denoiser. Operates on exactly its native 480-sample frame;
/// anything else passes through untouched.
pub struct RnnDenoiser {
    state: Box<DenoiseState<'static>>,
}

impl RnnDenoiser {
    pub fn new() -> Self {
        Self {
            state: DenoiseState::new(),
        }
    }
}

impl Default for RnnDenoiser {
    fn default() -> Self {
        Self::new()
    }
}

impl Denoiser for RnnDenoiser {
    fn process(&mut self, frame: &mut [f32]) {
        if frame.len() != FRAME_SAMPLES {
            return;
        }
        // RNNoise works in 16-bit sample range, the pipeline in [-1, 1].
        let scaled: Vec<f32> = frame.iter().map(|&s| s * 32_767.0).collect();
        let mut denoised = [0.0f32; FRAME_SAMPLES];
        self.state.process_frame(&mut denoised, &scaled);
        for (dst, &src) in frame.iter_mut().zip(denoised.iter()) {
            *dst = (src / 32_767.0).clamp(-1.0, 1.0);
        }
    }
}
