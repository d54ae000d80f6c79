//! Response-generation collaborator.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::AgentConfig;

#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Produce a reply for one transcript. Failures are mapped to the fixed
    /// fallback reply by the dispatch stage.
    async fn respond(&self, transcript: &str) -> Result<String>;
}

/// Client for a llama-server style `/completion` endpoint.
pub struct CompletionAgent {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
struct CompletionRequest {
    prompt: String,
    stream: bool,
    n_predict: usize,
    temperature: f32,
    stop: Vec<String>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    content: String,
}

const SYSTEM_PROMPT: &str = "You are a phone support agent. You answer in one or two short, \
     spoken-friendly sentences. No markdown, no lists. Be polite and direct.";

impl CompletionAgent {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(config.timeout_ms))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            endpoint: config.endpoint.clone(),
        }
    }
}

#[async_trait]
impl ResponseGenerator for CompletionAgent {
    async fn respond(&self, transcript: &str) -> Result<String> {
        let full_prompt = format!("System: {SYSTEM_PROMPT}\nCaller: {transcript}\nAgent:");

        let request_body = CompletionRequest {
            prompt: full_prompt,
            stream: false,
            n_predict: 96,
            temperature: 0.4,
            stop: vec!["Caller:".to_string(), "System:".to_string()],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("completion server error: {}", response.status()));
        }

        let parsed: CompletionResponse = response.json().await?;
        Ok(parsed.content.trim().to_string())
    }
}
