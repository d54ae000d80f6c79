//! Sample-rate conversion between the wire and the pipeline.
//!
//! Built on rubato's `FastFixedIn` with linear interpolation: both of our
//! conversions are fixed integer ratios (8 k -> 48 k inbound, synthesis
//! rate -> 8 k outbound), so the cheap polynomial path is enough for
//! telephone-band audio.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};

use crate::error::AudioError;

/// Streaming mono resampler. Input of arbitrary length is accumulated to
/// the processor's fixed chunk; output is returned as it becomes available.
pub struct StreamResampler {
    inner: FastFixedIn<f32>,
    chunk: usize,
    pending: Vec<f32>,
}

impl StreamResampler {
    pub fn new(from_hz: u32, to_hz: u32, chunk: usize) -> Result<Self, AudioError> {
        let ratio = f64::from(to_hz) / f64::from(from_hz);
        let inner = FastFixedIn::new(ratio, 1.0, PolynomialDegree::Linear, chunk, 1)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        Ok(Self {
            inner,
            chunk,
            pending: Vec::new(),
        })
    }

    /// Feed input samples; returns all full output chunks produced so far.
    pub fn push(&mut self, input: &[f32]) -> Result<Vec<f32>, AudioError> {
        self.pending.extend_from_slice(input);
        let mut out = Vec::new();
        while self.pending.len() >= self.chunk {
            let chunk: Vec<f32> = self.pending.drain(..self.chunk).collect();
            let mut produced = self
                .inner
                .process(std::slice::from_ref(&chunk), None)
                .map_err(|e| AudioError::Resample(e.to_string()))?;
            out.append(&mut produced.remove(0));
        }
        Ok(out)
    }

    /// Drain buffered input shorter than one chunk plus the processor tail.
    pub fn finish(&mut self) -> Result<Vec<f32>, AudioError> {
        let mut out = Vec::new();
        if !self.pending.is_empty() {
            let tail: Vec<f32> = self.pending.drain(..).collect();
            let mut produced = self
                .inner
                .process_partial(Some(std::slice::from_ref(&tail)), None)
                .map_err(|e| AudioError::Resample(e.to_string()))?;
            out.append(&mut produced.remove(0));
        }
        let mut flushed = self
            .inner
            .process_partial::<Vec<f32>>(None, None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        out.append(&mut flushed.remove(0));
        Ok(out)
    }
}

/// One-shot conversion of a whole buffer.
pub fn resample_all(samples: &[f32], from_hz: u32, to_hz: u32) -> Result<Vec<f32>, AudioError> {
    if from_hz == to_hz || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    let chunk = samples.len().min(1_024);
    let mut resampler = StreamResampler::new(from_hz, to_hz, chunk)?;
    let mut out = resampler.push(samples)?;
    out.extend(resampler.finish()?);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsample_ratio_holds() {
        let input = vec![0.5f32; 8_000];
        let out = resample_all(&input, 8_000, 48_000).unwrap();
        let expected = 48_000.0;
        assert!(
            (out.len() as f32 - expected).abs() / expected < 0.02,
            "got {} samples",
            out.len()
        );
    }

    #[test]
    fn downsample_ratio_holds() {
        let input = vec![0.1f32; 24_000];
        let out = resample_all(&input, 24_000, 8_000).unwrap();
        let expected = 8_000.0;
        assert!(
            (out.len() as f32 - expected).abs() / expected < 0.02,
            "got {} samples",
            out.len()
        );
    }

    #[test]
    fn identity_rate_is_passthrough() {
        let input = vec![0.3f32; 100];
        let out = resample_all(&input, 8_000, 8_000).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn streaming_matches_arbitrary_chunking() {
        // Feeding in uneven slices must produce the same sample count as a
        // single push of the whole buffer.
        let input: Vec<f32> = (0..4_000).map(|i| (i as f32 * 0.01).sin() * 0.5).collect();

        let mut a = StreamResampler::new(8_000, 48_000, 160).unwrap();
        let mut out_a = Vec::new();
        for piece in input.chunks(77) {
            out_a.extend(a.push(piece).unwrap());
        }
        out_a.extend(a.finish().unwrap());

        let mut b = StreamResampler::new(8_000, 48_000, 160).unwrap();
        let mut out_b = b.push(&input).unwrap();
        out_b.extend(b.finish().unwrap());

        assert_eq!(out_a.len(), out_b.len());
    }
}
