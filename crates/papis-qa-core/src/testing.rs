//! Offline collaborators for tests: no network, no PDF parsing.
//!
//! Enabled for this crate's own tests and, through the `test-support`
//! feature, for dependents' tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::docs::{Clients, TextLoader};
use crate::embedding::EmbeddingProvider;
use crate::llm::ChatModel;

/// Letter-frequency vectors, so texts sharing words land close together.
pub struct LetterEmbedder;

#[async_trait]
impl EmbeddingProvider for LetterEmbedder {
    fn model_name(&self) -> &str {
        "letters"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0f32; 26];
                for b in t.to_ascii_lowercase().bytes().filter(u8::is_ascii_lowercase) {
                    v[(b - b'a') as usize] += 1.0;
                }
                v
            })
            .collect())
    }
}

/// Fails every request, like a provider that is down.
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn model_name(&self) -> &str {
        "letters"
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(anyhow!("embedding provider unavailable"))
    }
}

/// Scores excerpts containing `keyword` 8, everything else 0, and replies
/// to answer prompts with a fixed `answer`.
pub struct KeywordChat {
    pub keyword: String,
    pub answer: String,
}

impl KeywordChat {
    pub fn new(keyword: &str, answer: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            answer: answer.to_string(),
        }
    }
}

#[async_trait]
impl ChatModel for KeywordChat {
    fn model_name(&self) -> &str {
        "keyword"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        if prompt.starts_with("Summarize") {
            let score = if prompt.contains(&self.keyword) { 8 } else { 0 };
            Ok(format!(
                r#"{{"summary": "Mentions {}.", "relevance_score": {}}}"#,
                self.keyword, score
            ))
        } else {
            Ok(self.answer.clone())
        }
    }
}

/// Serves registered bodies by path; anything else is unreadable.
///
/// Clones share the same map.
#[derive(Clone, Default)]
pub struct MapLoader {
    bodies: Arc<Mutex<HashMap<PathBuf, String>>>,
}

impl MapLoader {
    pub fn insert(&self, path: impl Into<PathBuf>, body: &str) {
        if let Ok(mut bodies) = self.bodies.lock() {
            bodies.insert(path.into(), body.to_string());
        }
    }
}

impl TextLoader for MapLoader {
    fn load(&self, path: &Path) -> Result<String> {
        self.bodies
            .lock()
            .map_err(|_| anyhow!("loader poisoned"))?
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("no text in {}", path.display()))
    }
}

/// Letter embedder, keyword chat, and `loader`.
pub fn offline_clients(chat: KeywordChat, loader: &MapLoader) -> Clients {
    Clients {
        embedder: Arc::new(LetterEmbedder),
        llm: Arc::new(chat),
        loader: Arc::new(loader.clone()),
    }
}
