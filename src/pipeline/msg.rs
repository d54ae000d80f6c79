//! Queue message types.
//!
//! Every inter-stage queue carries [`Feed`], so the shutdown sentinel is a
//! distinct variant and can never be confused with a domain value such as an
//! empty transcript.

/// Envelope for every stage input queue.
#[derive(Debug, Clone)]
pub enum Feed<T> {
    Item(T),
    /// No more real items will arrive; the worker should exit.
    Stop,
}

/// Fixed-size PCM frame entering the denoise stage (480 samples at 48 kHz).
#[derive(Debug, Clone)]
pub struct AudioFrame(pub Vec<f32>);

/// Variable-length buffered audio with its loudness score.
///
/// The score is root-mean-square amplitude, computed once at construction
/// and immutable after.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    samples: Vec<f32>,
    loudness: f32,
}

impl AudioSegment {
    pub fn new(samples: Vec<f32>) -> Self {
        let loudness = if samples.is_empty() {
            0.0
        } else {
            let sq_sum: f32 = samples.iter().map(|&x| x * x).sum();
            (sq_sum / samples.len() as f32).sqrt()
        };
        Self { samples, loudness }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn loudness(&self) -> f32 {
        self.loudness
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Recognized text for one utterance. `Empty` is a first-class value: it
/// flows forward so downstream stages can observe "no actionable input".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcript {
    Empty,
    Text(String),
}

/// Generated response text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply(pub String);

/// Audio produced by the synthesis collaborator, at its native rate.
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loudness_is_rms() {
        let segment = AudioSegment::new(vec![0.5; 100]);
        assert!((segment.loudness() - 0.5).abs() < 1e-6);

        let segment = AudioSegment::new(vec![0.3, -0.3, 0.3, -0.3]);
        assert!((segment.loudness() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn empty_segment_has_zero_loudness() {
        let segment = AudioSegment::new(Vec::new());
        assert_eq!(segment.loudness(), 0.0);
        assert!(segment.is_empty());
    }
}
