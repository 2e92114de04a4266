//! The persisted index: indexed files, their display names, and their
//! embedded texts.
//!
//! [`Docs`] serializes as a whole (the `.qa` blob). Its collaborators
//! ([`Clients`]) are connection handles and are never serialized; after
//! loading, [`Docs::set_client`] must be called before anything that
//! reads files, embeds, or queries.
//!
//! # Invariants
//!
//! - `docs` is keyed by fingerprint, so a fingerprint has at most one entry.
//! - `docnames` holds exactly the display names in use; every name in it
//!   is unique.
//! - Every text's name starts with its owning entry's display name.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chunk::chunk_text;
use crate::embedding::{cosine_similarity, EmbeddingProvider};
use crate::engine::{Added, QaEngine, Renamed};
use crate::llm::{answer_prompt, parse_summary, summary_prompt, ChatModel, CANNOT_ANSWER};
use crate::models::{Answer, Context, Doc, Text};

/// Texts sent to the embedding provider per request.
const EMBED_BATCH: usize = 64;

fn default_max_tokens() -> usize {
    700
}

/// Reads a file into plain text.
pub trait TextLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<String>;
}

/// Connection handles attached to a [`Docs`] at runtime.
#[derive(Clone)]
pub struct Clients {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub llm: Arc<dyn ChatModel>,
    pub loader: Arc<dyn TextLoader>,
}

#[derive(Serialize, Deserialize)]
pub struct Docs {
    /// Chat model identifier the index was built for.
    pub llm: String,
    /// Embedding model identifier; vectors from another model are not comparable.
    pub embedding: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    docs: BTreeMap<String, Doc>,
    docnames: BTreeSet<String>,
    texts: Vec<Text>,
    #[serde(skip)]
    clients: Option<Clients>,
}

impl Docs {
    pub fn new(llm: &str, embedding: &str, max_tokens: usize) -> Self {
        Self {
            llm: llm.to_string(),
            embedding: embedding.to_string(),
            max_tokens,
            docs: BTreeMap::new(),
            docnames: BTreeSet::new(),
            texts: Vec::new(),
            clients: None,
        }
    }

    /// Attach (or re-attach after loading) the runtime collaborators.
    pub fn set_client(&mut self, clients: Clients) {
        self.clients = Some(clients);
    }

    pub fn has_client(&self) -> bool {
        self.clients.is_some()
    }

    fn clients(&self) -> Result<&Clients> {
        self.clients
            .as_ref()
            .ok_or_else(|| anyhow!("index has no client attached; call set_client after loading"))
    }

    pub fn docs(&self) -> impl Iterator<Item = &Doc> {
        self.docs.values()
    }

    pub fn docnames(&self) -> &BTreeSet<String> {
        &self.docnames
    }

    pub fn texts(&self) -> &[Text] {
        &self.texts
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Return `name`, or the first of `{name}a`, `{name}b`, … not in use.
    pub fn unique_name(&self, name: &str) -> String {
        if !self.docnames.contains(name) {
            return name.to_string();
        }
        ('a'..='z')
            .map(|c| format!("{name}{c}"))
            .chain((27u64..).map(|n| format!("{name}{n}")))
            .find(|candidate| !self.docnames.contains(candidate))
            .unwrap_or_else(|| name.to_string())
    }

    /// The `k` texts most similar to `query_vec`, best first.
    pub fn retrieve(&self, query_vec: &[f32], k: usize) -> Vec<&Text> {
        let mut scored: Vec<(f32, &Text)> = self
            .texts
            .iter()
            .map(|t| (cosine_similarity(query_vec, &t.embedding), t))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().take(k).map(|(_, t)| t).collect()
    }

    async fn embed_texts(&self, embedder: &dyn EmbeddingProvider, texts: &mut [Text]) -> Result<()> {
        for batch in texts.chunks_mut(EMBED_BATCH) {
            let inputs: Vec<String> = batch.iter().map(|t| t.text.clone()).collect();
            let vectors = embedder.embed(&inputs).await?;
            if vectors.len() != batch.len() {
                return Err(anyhow!(
                    "embedding provider returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                ));
            }
            for (text, vector) in batch.iter_mut().zip(vectors) {
                text.embedding = vector;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl QaEngine for Docs {
    async fn add(
        &mut self,
        path: &Path,
        dockey: &str,
        citation: &str,
        docname: &str,
    ) -> Result<Added> {
        if self.docs.contains_key(dockey) {
            return Ok(Added::AlreadyPresent);
        }
        let clients = self.clients()?.clone();

        let body = match clients.loader.load(path) {
            Ok(body) => body,
            Err(e) => {
                return Ok(Added::Unreadable {
                    reason: format!("{:#}", e),
                })
            }
        };

        let docname = self.unique_name(docname);
        let mut texts = chunk_text(&docname, dockey, &body, self.max_tokens);
        if texts.is_empty() {
            return Ok(Added::Unreadable {
                reason: "no text could be extracted".to_string(),
            });
        }
        self.embed_texts(clients.embedder.as_ref(), &mut texts).await?;

        self.docs.insert(
            dockey.to_string(),
            Doc {
                dockey: dockey.to_string(),
                citation: citation.to_string(),
                docname: docname.clone(),
            },
        );
        self.docnames.insert(docname.clone());
        self.texts.extend(texts);
        Ok(Added::New { docname })
    }

    fn doc(&self, dockey: &str) -> Option<&Doc> {
        self.docs.get(dockey)
    }

    fn dockeys(&self) -> Vec<String> {
        self.docs.keys().cloned().collect()
    }

    fn set_citation(&mut self, dockey: &str, citation: &str) -> bool {
        match self.docs.get_mut(dockey) {
            Some(doc) => {
                doc.citation = citation.to_string();
                true
            }
            None => false,
        }
    }

    fn rename(&mut self, old_name: &str, new_name: &str) -> Result<Renamed> {
        let dockey = self
            .docs
            .values()
            .find(|d| d.docname == old_name)
            .map(|d| d.dockey.clone())
            .ok_or_else(|| anyhow!("no indexed document is named {:?}", old_name))?;

        let old_name_registered = self.docnames.remove(old_name);
        let docname = self.unique_name(new_name);

        let mut texts_renamed = 0;
        for text in self.texts.iter_mut().filter(|t| t.dockey == dockey) {
            if let Some(rest) = text.name.strip_prefix(old_name) {
                text.name = format!("{}{}", docname, rest);
                texts_renamed += 1;
            }
        }

        self.docnames.insert(docname.clone());
        if let Some(doc) = self.docs.get_mut(&dockey) {
            doc.docname = docname.clone();
        }

        Ok(Renamed {
            docname,
            old_name_registered,
            texts_renamed,
        })
    }

    fn delete(&mut self, dockey: &str) -> bool {
        let Some(doc) = self.docs.remove(dockey) else {
            return false;
        };
        self.docnames.remove(&doc.docname);
        self.texts.retain(|t| t.dockey != dockey);
        true
    }

    async fn query(&self, question: &str, k: usize, max_sources: usize) -> Result<Answer> {
        let clients = self.clients()?;
        let mut contexts = Vec::new();

        if !self.texts.is_empty() {
            let query_vec = clients
                .embedder
                .embed(&[question.to_string()])
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("empty embedding response"))?;

            for text in self.retrieve(&query_vec, k) {
                let citation = self
                    .docs
                    .get(&text.dockey)
                    .map(|d| d.citation.as_str())
                    .unwrap_or_default();
                let reply = clients
                    .llm
                    .complete(&summary_prompt(question, citation, &text.text))
                    .await?;
                let (summary, score) = parse_summary(&reply);
                if score == 0 {
                    continue;
                }
                contexts.push(Context {
                    name: text.name.clone(),
                    citation: citation.to_string(),
                    summary,
                    score,
                    text: text.text.clone(),
                });
            }
        }

        // Stable sort: equal scores keep retrieval order.
        contexts.sort_by(|a, b| b.score.cmp(&a.score));
        contexts.truncate(max_sources);

        let answer = if contexts.is_empty() {
            CANNOT_ANSWER.to_string()
        } else {
            clients
                .llm
                .complete(&answer_prompt(question, &contexts))
                .await?
                .trim()
                .to_string()
        };

        Ok(Answer {
            question: question.to_string(),
            answer,
            contexts,
        })
    }
}
