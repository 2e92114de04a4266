//! Chat model trait and the prompts the QA engine sends through it.
//!
//! Answering runs in two rounds. Every retrieved text is first summarized
//! against the question with a 0–10 relevance score ([`summary_prompt`],
//! parsed by [`parse_summary`]); the best summaries are then handed to
//! [`answer_prompt`].

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::models::Context;

/// Answer given when no retrieved text is relevant.
pub const CANNOT_ANSWER: &str = "I cannot answer this question due to insufficient information.";

/// A chat-completion backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o"`).
    fn model_name(&self) -> &str;

    /// Send a single user prompt and return the model's reply text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

pub fn summary_prompt(question: &str, citation: &str, excerpt: &str) -> String {
    format!(
        "Summarize the excerpt below to help answer a question.\n\n\
         Excerpt from {citation}\n\
         ------------\n\
         {excerpt}\n\
         ------------\n\n\
         Question: {question}\n\n\
         Do not directly answer the question; instead summarize the evidence \
         the excerpt provides for it. Reply with a single JSON object with the keys \
         \"summary\" (a few sentences, empty if the excerpt is irrelevant) and \
         \"relevance_score\" (an integer from 0 to 10)."
    )
}

pub fn answer_prompt(question: &str, contexts: &[Context]) -> String {
    let context_block = contexts
        .iter()
        .map(|c| format!("{}: {}\nFrom {}", c.name, c.summary, c.citation))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Answer the question below using only the context provided.\n\n\
         Context:\n\n{context_block}\n\n\
         Cite the context names you use in parentheses, for example \
         (Curie, Radium (1904) chunk 2). If the context is insufficient, \
         reply \"{CANNOT_ANSWER}\"\n\n\
         Question: {question}\n\n\
         Answer:"
    )
}

#[derive(Deserialize)]
struct SummaryReply {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    relevance_score: f64,
}

/// Parse a summary reply into `(summary, score)`.
///
/// Tolerates prose or code fences around the JSON object. Anything that
/// cannot be parsed scores 0, which drops the context.
pub fn parse_summary(reply: &str) -> (String, u8) {
    let object = match (reply.find('{'), reply.rfind('}')) {
        (Some(start), Some(end)) if start < end => &reply[start..=end],
        _ => return (reply.trim().to_string(), 0),
    };
    match serde_json::from_str::<SummaryReply>(object) {
        Ok(parsed) => {
            let score = parsed.relevance_score.round().clamp(0.0, 10.0) as u8;
            (parsed.summary.trim().to_string(), score)
        }
        Err(_) => (reply.trim().to_string(), 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let (summary, score) =
            parse_summary(r#"{"summary": "Radium glows.", "relevance_score": 8}"#);
        assert_eq!(summary, "Radium glows.");
        assert_eq!(score, 8);
    }

    #[test]
    fn parses_fenced_json_and_clamps() {
        let reply = "```json\n{\"summary\": \"x\", \"relevance_score\": 14.2}\n```";
        assert_eq!(parse_summary(reply), ("x".to_string(), 10));
    }

    #[test]
    fn garbage_scores_zero() {
        assert_eq!(parse_summary("no idea").1, 0);
        assert_eq!(parse_summary("{not json}").1, 0);
    }

    #[test]
    fn answer_prompt_lists_every_context() {
        let contexts = vec![Context {
            name: "Doe, T (2001) chunk 1".into(),
            citation: "doe2001".into(),
            summary: "Evidence.".into(),
            score: 5,
            text: "raw".into(),
        }];
        let prompt = answer_prompt("Why?", &contexts);
        assert!(prompt.contains("Doe, T (2001) chunk 1: Evidence."));
        assert!(prompt.contains("From doe2001"));
        assert!(prompt.ends_with("Question: Why?\n\nAnswer:"));
    }
}
