//! Speech-recognition collaborator.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::audio::resample::resample_all;
use crate::config::SttConfig;

/// Recognition models expect 16 kHz input.
const STT_SAMPLE_RATE: u32 = 16_000;

#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe one utterance. Errors and timeouts are mapped to the
    /// empty-transcript marker by the dispatch stage, not here.
    async fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<String>;
}

/// Client for a whisper-server style endpoint taking a multipart WAV upload.
pub struct WhisperHttp {
    client: reqwest::Client,
    endpoint: String,
    language: String,
}

#[derive(Deserialize)]
struct InferenceResponse {
    text: String,
}

impl WhisperHttp {
    pub fn new(config: &SttConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(config.timeout_ms))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            endpoint: config.endpoint.clone(),
            language: config.language.clone(),
        }
    }
}

#[async_trait]
impl SpeechToText for WhisperHttp {
    async fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<String> {
        if samples.is_empty() {
            return Ok(String::new());
        }

        let audio = resample_all(samples, sample_rate, STT_SAMPLE_RATE)?;
        let wav = wav_bytes(&audio, STT_SAMPLE_RATE)?;

        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("utterance.wav")
            .mime_str("audio/wav")?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("language", self.language.clone())
            .text("response_format", "json");

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("stt server error: {}", response.status()));
        }

        let parsed: InferenceResponse = response.json().await?;
        Ok(parsed.text)
    }
}

/// Encode mono f32 samples as a 16-bit PCM WAV in memory.
fn wav_bytes(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &s in samples {
            writer.write_sample((s.clamp(-1.0, 1.0) * 32_767.0) as i16)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}
