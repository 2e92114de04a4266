//! Chat-completion providers.
//!
//! - **[`OpenAIChat`]**: `POST /v1/chat/completions`.
//! - **[`OllamaChat`]**: `POST /api/chat` with `stream: false`.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use papis_qa_core::llm::ChatModel;

use crate::config::Config;
use crate::embedding::{OLLAMA_URL, OPENAI_URL};
use crate::http::{openai_api_key, JsonEndpoint};

/// Sampling temperature for every request; answers should be reproducible.
const TEMPERATURE: f64 = 0.0;

pub struct OpenAIChat {
    model: String,
    endpoint: JsonEndpoint,
}

impl OpenAIChat {
    pub fn new(config: &Config) -> Result<Self> {
        let base = config.models.url.as_deref().unwrap_or(OPENAI_URL);
        let endpoint = JsonEndpoint::new(
            &config.providers,
            format!("{}/chat/completions", base.trim_end_matches('/')),
            Some(openai_api_key()?),
            "OpenAI",
        )?;
        Ok(Self {
            model: config.models.llm.clone(),
            endpoint,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAIChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": TEMPERATURE,
            "messages": [{"role": "user", "content": prompt}],
        });
        let json = self.endpoint.post(&body).await?;
        json.pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Invalid OpenAI response: missing choices[0].message.content"))
    }
}

pub struct OllamaChat {
    model: String,
    endpoint: JsonEndpoint,
}

impl OllamaChat {
    pub fn new(config: &Config) -> Result<Self> {
        let base = config.models.url.as_deref().unwrap_or(OLLAMA_URL);
        let endpoint = JsonEndpoint::new(
            &config.providers,
            format!("{}/api/chat", base.trim_end_matches('/')),
            None,
            "Ollama",
        )?;
        Ok(Self {
            model: config.models.llm.clone(),
            endpoint,
        })
    }
}

#[async_trait]
impl ChatModel for OllamaChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "stream": false,
            "options": {"temperature": TEMPERATURE},
            "messages": [{"role": "user", "content": prompt}],
        });
        let json = self.endpoint.post(&body).await?;
        json.pointer("/message/content")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                anyhow!(
                    "Invalid Ollama response from {}: missing message.content",
                    self.endpoint.url()
                )
            })
    }
}
