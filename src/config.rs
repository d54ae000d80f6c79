//! Configuration loading and validation.
//!
//! Every tunable of the pipeline lives here rather than as a magic number:
//! the silence timeout, the analysis window and its overlap, queue depths,
//! and the selector watermarks. Loaded from a TOML file with full defaults,
//! so a bare `voxline` starts with a usable local setup.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    pub vad: VadConfig,
    pub stt: SttConfig,
    pub agent: AgentConfig,
    pub tts: TtsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            pipeline: PipelineConfig::default(),
            vad: VadConfig::default(),
            stt: SttConfig::default(),
            agent: AgentConfig::default(),
            tts: TtsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address for the webhook + media websocket server.
    pub bind_addr: String,
    /// Public base URL the telephony provider is told to stream to,
    /// e.g. `wss://example.ngrok.app`. The `/media` path is appended.
    pub ws_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            ws_base_url: "ws://localhost:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Continuous trailing silence that ends an utterance, in ms.
    pub silence_timeout_ms: u64,
    /// Analysis window handed to the voice classifier, in samples at 48 kHz.
    pub window_samples: usize,
    /// Trailing samples retained across windows so a word is not cut at the
    /// window boundary.
    pub overlap_samples: usize,
    /// Depth of the raw frame queue feeding the denoise stage.
    pub frame_queue_depth: usize,
    /// Depth of the voiced-segment queue feeding the selector.
    pub segment_queue_depth: usize,
    /// Depth of the utterance/transcript/reply queues.
    pub text_queue_depth: usize,
    /// Depth of the outbound synthesized-audio queue.
    pub audio_queue_depth: usize,
    /// Selector buffer: evict down to `selector_keep_recent` once this
    /// many segments are buffered.
    pub selector_high_water: usize,
    pub selector_keep_recent: usize,
    /// Per-worker join budget during shutdown, in ms.
    pub shutdown_grace_ms: u64,
    /// Run the noise-suppression collaborator. Off means pass-through.
    pub denoise: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            silence_timeout_ms: 700,
            window_samples: 48_000,
            overlap_samples: 4_800,
            frame_queue_depth: 256,
            segment_queue_depth: 16,
            text_queue_depth: 8,
            audio_queue_depth: 16,
            selector_high_water: 100,
            selector_keep_recent: 50,
            shutdown_grace_ms: 2_000,
            denoise: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    /// webrtc-vad aggressiveness, 0 (quality) to 3 (very aggressive).
    pub aggressiveness: u8,
    /// Fraction of 30 ms sub-frames that must be voiced for a window to
    /// count as speech.
    pub vote_ratio: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            aggressiveness: 2,
            vote_ratio: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// whisper-server style endpoint accepting a multipart WAV upload.
    pub endpoint: String,
    pub language: String,
    pub timeout_ms: u64,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8178/inference".to_string(),
            language: "en".to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// llama-server style completion endpoint.
    pub endpoint: String,
    pub timeout_ms: u64,
    /// Spoken when response generation fails. The call never goes silent
    /// because the generator did.
    pub fallback_reply: String,
    /// Spoken as soon as the call connects. Empty disables the greeting.
    pub greeting: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/completion".to_string(),
            timeout_ms: 8_000,
            fallback_reply: "I'm sorry, I didn't understand that. Could you please repeat?"
                .to_string(),
            greeting: "Welcome to customer care support. May I know your name please?".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Google Cloud TTS API key. Required: synthesis has no local fallback.
    pub api_key: String,
    pub language_code: String,
    pub voice_name: String,
    /// LINEAR16 output rate requested from the synthesizer.
    pub sample_rate_hertz: u32,
    pub timeout_ms: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            language_code: "en-US".to_string(),
            voice_name: "en-US-Standard-D".to_string(),
            sample_rate_hertz: 24_000,
            timeout_ms: 10_000,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e)))?;
        let config: Config = toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `VOXLINE_CONFIG` or `voxline.toml`, falling back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var("VOXLINE_CONFIG") {
            tracing::info!("loading config from {path}");
            return Self::from_file(path);
        }
        let default_path = Path::new("voxline.toml");
        if default_path.exists() {
            tracing::info!("loading config from voxline.toml");
            return Self::from_file(default_path);
        }
        tracing::info!("no config file found, using defaults");
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.window_samples == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.window_samples".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if self.pipeline.overlap_samples >= self.pipeline.window_samples {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.overlap_samples".to_string(),
                message: "must be smaller than window_samples".to_string(),
            });
        }
        if self.pipeline.selector_keep_recent > self.pipeline.selector_high_water {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.selector_keep_recent".to_string(),
                message: "must not exceed selector_high_water".to_string(),
            });
        }
        if self.vad.aggressiveness > 3 {
            return Err(ConfigError::InvalidValue {
                field: "vad.aggressiveness".to_string(),
                message: "must be 0-3".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.vad.vote_ratio) {
            return Err(ConfigError::InvalidValue {
                field: "vad.vote_ratio".to_string(),
                message: "must be between 0.0 and 1.0".to_string(),
            });
        }
        if self.tts.sample_rate_hertz == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tts.sample_rate_hertz".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overlap_must_fit_window() {
        let mut config = Config::default();
        config.pipeline.overlap_samples = config.pipeline.window_samples;
        assert!(config.validate().is_err());
    }

    #[test]
    fn selector_watermarks_ordered() {
        let mut config = Config::default();
        config.pipeline.selector_keep_recent = config.pipeline.selector_high_water + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [pipeline]
            silence_timeout_ms = 500

            [tts]
            api_key = "k"
            "#,
        )
        .unwrap();
        assert_eq!(config.pipeline.silence_timeout_ms, 500);
        assert_eq!(config.tts.api_key, "k");
        // Untouched sections keep their defaults
        assert_eq!(config.pipeline.window_samples, 48_000);
        assert_eq!(config.tts.sample_rate_hertz, 24_000);
    }
}
