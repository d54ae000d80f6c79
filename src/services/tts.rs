//! Speech-synthesis collaborator.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::TtsConfig;
use crate::error::SessionError;
use crate::pipeline::SynthesizedAudio;

/// Google TTS rejects inputs beyond this many characters.
const MAX_INPUT_CHARS: usize = 5_000;

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize one reply. A failure means no audio for this turn; the
    /// dispatch stage skips the turn and the conversation continues.
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio>;
}

/// Client for the Google Cloud `text:synthesize` REST endpoint.
pub struct GoogleTts {
    client: reqwest::Client,
    api_key: String,
    language_code: String,
    voice_name: String,
    sample_rate_hertz: u32,
}

#[derive(Deserialize)]
struct SynthesizeResponse {
    #[serde(rename = "audioContent")]
    audio_content: String,
}

impl GoogleTts {
    /// Fails without an API key: synthesis has no local fallback, and a
    /// pipeline that can never speak should not start.
    pub fn new(config: &TtsConfig) -> Result<Self, SessionError> {
        if config.api_key.trim().is_empty() {
            return Err(SessionError::Init(
                "tts.api_key is not configured".to_string(),
            ));
        }
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(config.timeout_ms))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key: config.api_key.clone(),
            language_code: config.language_code.clone(),
            voice_name: config.voice_name.clone(),
            sample_rate_hertz: config.sample_rate_hertz,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTts {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio> {
        let text = text.trim();
        if text.is_empty() {
            return Err(anyhow!("empty synthesis input"));
        }
        let text: String = text.chars().take(MAX_INPUT_CHARS).collect();

        let payload = json!({
            "input": { "text": text },
            "voice": {
                "languageCode": self.language_code,
                "name": self.voice_name,
            },
            "audioConfig": {
                "audioEncoding": "LINEAR16",
                "sampleRateHertz": self.sample_rate_hertz,
            },
        });

        let url = format!(
            "https://texttospeech.googleapis.com/v1/text:synthesize?key={}",
            self.api_key
        );
        let response = self.client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("tts server error: {}", response.status()));
        }

        let parsed: SynthesizeResponse = response.json().await?;
        let wav = BASE64.decode(parsed.audio_content)?;
        decode_linear16_wav(&wav)
    }
}

/// LINEAR16 responses arrive as a WAV container; pull out mono samples and
/// the actual rate.
fn decode_linear16_wav(bytes: &[u8]) -> Result<SynthesizedAudio> {
    let mut reader = hound::WavReader::new(std::io::Cursor::new(bytes))?;
    let spec = reader.spec();
    if spec.channels != 1 {
        return Err(anyhow!("expected mono synthesis output, got {} channels", spec.channels));
    }
    let samples: Result<Vec<f32>, _> = reader
        .samples::<i16>()
        .map(|s| s.map(|v| f32::from(v) / 32_768.0))
        .collect();
    Ok(SynthesizedAudio {
        samples: samples?,
        sample_rate: spec.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_fatal() {
        let config = TtsConfig::default();
        assert!(matches!(GoogleTts::new(&config), Err(SessionError::Init(_))));
    }

    #[test]
    fn configured_key_constructs() {
        let config = TtsConfig {
            api_key: "k".to_string(),
            ..TtsConfig::default()
        };
        assert!(GoogleTts::new(&config).is_ok());
    }

    #[test]
    fn linear16_wav_decodes() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 24_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for s in [0i16, 8_192, -8_192] {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }

        let audio = decode_linear16_wav(&cursor.into_inner()).unwrap();
        assert_eq!(audio.sample_rate, 24_000);
        assert_eq!(audio.samples.len(), 3);
        assert!((audio.samples[1] - 0.25).abs() < 1e-3);
    }
}
