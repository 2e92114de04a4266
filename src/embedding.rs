//! Embedding providers.
//!
//! - **[`OpenAIEmbedder`]**: `POST /v1/embeddings`, needs `OPENAI_API_KEY`.
//! - **[`OllamaEmbedder`]**: `POST /api/embed` on a local Ollama
//!   (default `http://localhost:11434`).
//!
//! Both implement [`EmbeddingProvider`] from the core crate and retry
//! through [`JsonEndpoint`].

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use papis_qa_core::embedding::EmbeddingProvider;

use crate::config::Config;
use crate::http::{openai_api_key, JsonEndpoint};

pub const OPENAI_URL: &str = "https://api.openai.com/v1";
pub const OLLAMA_URL: &str = "http://localhost:11434";

pub struct OpenAIEmbedder {
    model: String,
    endpoint: JsonEndpoint,
}

impl OpenAIEmbedder {
    pub fn new(config: &Config) -> Result<Self> {
        let base = config.models.url.as_deref().unwrap_or(OPENAI_URL);
        let endpoint = JsonEndpoint::new(
            &config.providers,
            format!("{}/embeddings", base.trim_end_matches('/')),
            Some(openai_api_key()?),
            "OpenAI",
        )?;
        Ok(Self {
            model: config.models.embedding.clone(),
            endpoint,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = self.endpoint.post(&body).await?;
        parse_openai_response(&json)
    }
}

/// Extract `data[].embedding`, ordered by `data[].index`.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow!("Invalid OpenAI response: missing embedding"))?;
        indexed.push((index, to_vector(embedding)));
    }
    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

pub struct OllamaEmbedder {
    model: String,
    endpoint: JsonEndpoint,
}

impl OllamaEmbedder {
    pub fn new(config: &Config) -> Result<Self> {
        let base = config.models.url.as_deref().unwrap_or(OLLAMA_URL);
        let endpoint = JsonEndpoint::new(
            &config.providers,
            format!("{}/api/embed", base.trim_end_matches('/')),
            None,
            "Ollama",
        )?;
        Ok(Self {
            model: config.models.embedding.clone(),
            endpoint,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = self.endpoint.post(&body).await?;
        parse_ollama_response(&json)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing embeddings array"))?;

    embeddings
        .iter()
        .map(|embedding| {
            embedding
                .as_array()
                .map(|values| to_vector(values))
                .ok_or_else(|| anyhow!("Invalid Ollama response: embedding is not an array"))
        })
        .collect()
}

fn to_vector(values: &[serde_json::Value]) -> Vec<f32> {
    values
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn openai_response_is_reordered_by_index() {
        let json = json!({
            "data": [
                {"index": 1, "embedding": [0.5, 0.5]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        });
        let vectors = parse_openai_response(&json).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.5, 0.5]]);
    }

    #[test]
    fn openai_response_without_data_fails() {
        assert!(parse_openai_response(&json!({"error": "nope"})).is_err());
    }

    #[test]
    fn ollama_response() {
        let json = json!({"embeddings": [[0.25, 1.0], [0.0, -1.0]]});
        let vectors = parse_ollama_response(&json).unwrap();
        assert_eq!(vectors, vec![vec![0.25, 1.0], vec![0.0, -1.0]]);
        assert!(parse_ollama_response(&json!({"embeddings": [1]})).is_err());
    }
}
