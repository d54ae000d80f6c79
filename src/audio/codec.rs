//! G.711 mu-law codec and base64 wire payload helpers.
//!
//! Pure functions, no state. A failed decode surfaces as an error the
//! adapter logs and drops; nothing here panics on caller input.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::AudioError;

const BIAS: i32 = 0x84;
const CLIP: i32 = 32_635;

/// Encode one linear PCM sample to a mu-law byte.
pub fn linear_to_mulaw(sample: i16) -> u8 {
    let mut pcm = i32::from(sample);
    let sign: u8 = if pcm < 0 {
        pcm = -pcm;
        0x80
    } else {
        0x00
    };
    if pcm > CLIP {
        pcm = CLIP;
    }
    pcm += BIAS;

    let mut exponent: u8 = 7;
    let mut mask = 0x4000;
    while exponent > 0 && pcm & mask == 0 {
        exponent -= 1;
        mask >>= 1;
    }
    let mantissa = ((pcm >> (exponent + 3)) & 0x0f) as u8;

    !(sign | (exponent << 4) | mantissa)
}

/// Decode one mu-law byte to a linear PCM sample.
pub fn mulaw_to_linear(byte: u8) -> i16 {
    let byte = !byte;
    let sign = byte & 0x80;
    let exponent = (byte >> 4) & 0x07;
    let mantissa = i32::from(byte & 0x0f);

    let magnitude = (((mantissa << 3) + BIAS) << exponent) - BIAS;
    if sign != 0 {
        -magnitude as i16
    } else {
        magnitude as i16
    }
}

/// Decode a base64 mu-law media payload into f32 samples at the wire rate.
pub fn decode_wire_payload(payload: &str) -> Result<Vec<f32>, AudioError> {
    let bytes = BASE64
        .decode(payload)
        .map_err(|e| AudioError::Base64(e.to_string()))?;
    Ok(bytes
        .iter()
        .map(|&b| f32::from(mulaw_to_linear(b)) / 32_768.0)
        .collect())
}

/// Encode f32 samples at the wire rate into a base64 mu-law payload.
pub fn encode_wire_payload(samples: &[f32]) -> String {
    let bytes: Vec<u8> = samples
        .iter()
        .map(|&s| linear_to_mulaw((s.clamp(-1.0, 1.0) * 32_767.0) as i16))
        .collect();
    BASE64.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_encodes_to_ff() {
        assert_eq!(linear_to_mulaw(0), 0xff);
        assert_eq!(mulaw_to_linear(0xff), 0);
    }

    #[test]
    fn roundtrip_within_quantization_error() {
        for &sample in &[100i16, -100, 1_000, -1_000, 12_345, -12_345, 30_000, -30_000] {
            let decoded = mulaw_to_linear(linear_to_mulaw(sample));
            // Mu-law step size grows with magnitude; allow one segment step.
            let tolerance = (i32::from(sample).abs() / 16).max(16) + 16;
            let err = (i32::from(decoded) - i32::from(sample)).abs();
            assert!(
                err <= tolerance,
                "sample {sample} decoded to {decoded} (err {err} > {tolerance})"
            );
        }
    }

    #[test]
    fn extremes_do_not_overflow() {
        let _ = mulaw_to_linear(linear_to_mulaw(i16::MAX));
        let _ = mulaw_to_linear(linear_to_mulaw(i16::MIN));
    }

    #[test]
    fn wire_payload_roundtrip() {
        let samples = vec![0.0f32, 0.25, -0.25, 0.9, -0.9];
        let payload = encode_wire_payload(&samples);
        let decoded = decode_wire_payload(&payload).unwrap();
        assert_eq!(decoded.len(), samples.len());
        for (a, b) in samples.iter().zip(decoded.iter()) {
            assert!((a - b).abs() < 0.05, "{a} vs {b}");
        }
    }

    #[test]
    fn bad_base64_is_an_error() {
        assert!(decode_wire_payload("not base64 !!!").is_err());
    }
}
