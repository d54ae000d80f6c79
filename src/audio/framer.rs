//! Cuts an arbitrary-length sample stream into fixed frames.
//!
//! Leftover samples stay in the FIFO across pushes, so frame boundaries are
//! independent of how the transport chunks its payloads. If the FIFO fills
//! (the pipeline is not draining), the excess input is dropped rather than
//! blocking the transport.

use ringbuf::{traits::*, HeapRb};

use super::FRAME_SAMPLES;

pub struct Framer {
    fifo: HeapRb<f32>,
}

impl Framer {
    /// `capacity` is in samples; anything beyond it is lossy.
    pub fn new(capacity: usize) -> Self {
        Self {
            fifo: HeapRb::new(capacity.max(FRAME_SAMPLES)),
        }
    }

    /// Append samples. Returns how many were dropped for lack of space.
    pub fn push(&mut self, samples: &[f32]) -> usize {
        let written = self.fifo.push_slice(samples);
        samples.len() - written
    }

    /// Pop one fixed-size frame, if enough samples are buffered.
    pub fn next_frame(&mut self) -> Option<Vec<f32>> {
        if self.fifo.occupied_len() < FRAME_SAMPLES {
            return None;
        }
        let mut frame = vec![0.0f32; FRAME_SAMPLES];
        self.fifo.pop_slice(&mut frame);
        Some(frame)
    }

    pub fn buffered(&self) -> usize {
        self.fifo.occupied_len()
    }
}
