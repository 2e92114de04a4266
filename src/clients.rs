//! Builds the runtime collaborators attached to a loaded index.

use std::sync::Arc;

use anyhow::Result;
use papis_qa_core::docs::{Clients, Docs};
use tracing::warn;

use crate::config::Config;
use crate::embedding::{OllamaEmbedder, OpenAIEmbedder};
use crate::extract::PdfLoader;
use crate::llm::{OllamaChat, OpenAIChat};

/// Create the embedding, chat, and PDF collaborators for `config`.
pub fn create_clients(config: &Config) -> Result<Clients> {
    let clients = match config.models.provider.as_str() {
        "ollama" => Clients {
            embedder: Arc::new(OllamaEmbedder::new(config)?),
            llm: Arc::new(OllamaChat::new(config)?),
            loader: Arc::new(PdfLoader),
        },
        _ => Clients {
            embedder: Arc::new(OpenAIEmbedder::new(config)?),
            llm: Arc::new(OpenAIChat::new(config)?),
            loader: Arc::new(PdfLoader),
        },
    };
    Ok(clients)
}

/// Warn when a loaded index was built with other models than configured.
///
/// Vectors from a different embedding model are not comparable, so a
/// mismatch there usually calls for `index --force`.
pub fn check_models(docs: &Docs, config: &Config) {
    if docs.embedding != config.models.embedding {
        warn!(
            "Index was built with embedding model {} but {} is configured; run `index --force` to rebuild",
            docs.embedding, config.models.embedding
        );
    }
    if docs.llm != config.models.llm {
        warn!(
            "Index was built for {} but {} is configured",
            docs.llm, config.models.llm
        );
    }
}
