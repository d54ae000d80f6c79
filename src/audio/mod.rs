//! Audio plumbing between the telephony wire and the pipeline.
//!
//! The wire carries 8 kHz mu-law, base64-encoded inside JSON media events.
//! The pipeline runs on 48 kHz f32 mono in fixed 480-sample frames (10 ms),
//! the frame the noise suppressor operates on.

pub mod codec;
pub mod framer;
pub mod resample;

/// Sample rate of the telephony wire (G.711).
pub const WIRE_SAMPLE_RATE: u32 = 8_000;

/// Internal pipeline sample rate.
pub const PIPELINE_SAMPLE_RATE: u32 = 48_000;

/// Fixed frame entering the denoise stage: 10 ms at 48 kHz.
pub const FRAME_SAMPLES: usize = 480;
