//! `papisqa ask`: answer a question from the indexed library.
//!
//! The argument check runs before the index is touched, so a bad
//! `--top-k`/`--max-sources` pair fails fast even for a huge index.

use std::fmt::Write as _;

use anyhow::{bail, Result};
use papis_qa_core::docs::Clients;
use papis_qa_core::engine::QaEngine;
use papis_qa_core::models::Answer;
use tracing::info;

use crate::clients::{check_models, create_clients};
use crate::config::Config;
use crate::store::{FileIndexStore, IndexStore};

#[derive(Debug, Clone)]
pub struct AskOptions {
    /// Texts retrieved and summarized.
    pub top_k: usize,
    /// Contexts kept for the answer; must be smaller than `top_k`.
    pub max_sources: usize,
    pub show_context: bool,
    pub show_excerpt: bool,
    pub json: bool,
}

impl Default for AskOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            max_sources: 5,
            show_context: false,
            show_excerpt: false,
            json: false,
        }
    }
}

/// Rewrite LaTeX delimiters for Markdown renderers: `\(`/`\)` become `$`,
/// `\[`/`\]` become `$$`.
pub fn to_latex_math(text: &str) -> String {
    text.replace(r"\(", "$")
        .replace(r"\)", "$")
        .replace(r"\[", "$$")
        .replace(r"\]", "$$")
}

/// Load the index and query it.
///
/// Returns `Ok(None)` when nothing has been indexed yet. `clients` is only
/// called once an index was found.
pub async fn answer_question<F>(
    config: &Config,
    store: &dyn IndexStore,
    clients: F,
    question: &str,
    options: &AskOptions,
) -> Result<Option<Answer>>
where
    F: FnOnce() -> Result<Clients>,
{
    if options.top_k <= options.max_sources {
        bail!("top_k must be larger than max_sources");
    }

    let Some(mut docs) = store.load()? else {
        return Ok(None);
    };
    check_models(&docs, config);
    docs.set_client(clients()?);

    let answer = docs
        .query(question, options.top_k, options.max_sources)
        .await?;
    Ok(Some(answer))
}

/// Markdown report of an answer.
pub fn render(answer: &Answer, show_context: bool, show_excerpt: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Question");
    let _ = writeln!(out, "{}", answer.question);
    let _ = writeln!(out, "\n# Answer");
    let _ = writeln!(out, "{}", to_latex_math(&answer.answer));
    let _ = writeln!(out, "\n# References");
    for context in &answer.contexts {
        let _ = writeln!(out, " - {}", context.name);
    }

    if show_context {
        let _ = writeln!(out, "\n\n# Contexts");
        for context in &answer.contexts {
            let _ = writeln!(out, "\n## {}", context.name);
            let _ = writeln!(out, "\n### Summary");
            let _ = writeln!(out, "{}", to_latex_math(&context.summary));
            if show_excerpt {
                let _ = writeln!(out, "\n### Excerpt");
                let _ = writeln!(out, "{}", context.text);
            }
            let _ = writeln!(out, "\n - Score: {}", context.score);
        }
    }
    out
}

pub async fn run_ask(config: &Config, question: &str, options: &AskOptions) -> Result<()> {
    let store = FileIndexStore::new(config.index_path()?);
    let answer =
        answer_question(config, &store, || create_clients(config), question, options).await?;

    match answer {
        None => info!("Not indexed"),
        Some(answer) if options.json => println!("{}", serde_json::to_string_pretty(&answer)?),
        Some(answer) => print!(
            "{}",
            render(&answer, options.show_context, options.show_excerpt)
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryIndexStore;
    use crate::sync::{index_documents, IndexOptions};
    use crate::test_support::{fake_clients, FakeLibrary};
    use papis_qa_core::docs::Docs;
    use papis_qa_core::llm::CANNOT_ANSWER;
    use papis_qa_core::models::Context;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts loads and never has an index.
    #[derive(Default)]
    struct CountingStore {
        loads: AtomicUsize,
    }

    impl IndexStore for CountingStore {
        fn load(&self) -> Result<Option<Docs>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
        fn save(&self, _docs: &Docs) -> Result<()> {
            Ok(())
        }
    }

    fn no_clients() -> Result<Clients> {
        bail!("clients must not be created")
    }

    #[test]
    fn latex_delimiters() {
        assert_eq!(to_latex_math(r"\(x\)"), "$x$");
        assert_eq!(to_latex_math(r"\[x^2\]"), "$$x^2$$");
        assert_eq!(to_latex_math("plain $ text"), "plain $ text");
        assert_eq!(
            to_latex_math(r"inline \(a\) and \[b\]"),
            "inline $a$ and $$b$$"
        );
    }

    #[tokio::test]
    async fn top_k_must_exceed_max_sources_before_loading() {
        let store = CountingStore::default();
        for (top_k, max_sources) in [(5, 10), (5, 5)] {
            let options = AskOptions {
                top_k,
                max_sources,
                ..Default::default()
            };
            let err = answer_question(&Config::default(), &store, no_clients, "q", &options)
                .await
                .unwrap_err();
            assert!(err.to_string().contains("top_k must be larger than max_sources"));
        }
        assert_eq!(store.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_index_is_not_an_error() {
        let store = CountingStore::default();
        let answer =
            answer_question(&Config::default(), &store, no_clients, "q", &AskOptions::default())
                .await
                .unwrap();
        assert!(answer.is_none());
        assert_eq!(store.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn answers_from_indexed_library() {
        let lib = FakeLibrary::new();
        let documents = vec![
            lib.document("d1", "curie1904", &["Curie"], Some("1904"), "Radium", "radium decays slowly"),
            lib.document("d2", "rock", &["Stone"], Some("1990"), "Granite", "granite is grey"),
        ];
        let store = MemoryIndexStore::new();
        index_documents(
            &Config::default(),
            &store,
            &documents,
            Some(fake_clients(&lib)),
            &IndexOptions::default(),
        )
        .await
        .unwrap();

        let options = AskOptions {
            top_k: 2,
            max_sources: 1,
            ..Default::default()
        };
        let answer = answer_question(
            &Config::default(),
            &store,
            || Ok(fake_clients(&lib)),
            "How fast does it decay?",
            &options,
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(answer.contexts.len(), 1);
        assert_eq!(answer.contexts[0].name, "Curie, Radium (1904) chunk 1");
        assert_eq!(answer.contexts[0].citation, "curie1904");

        let report = render(&answer, false, false);
        assert!(report.contains("The half-life is $t_{1/2}$, see $$E = mc^2$$."));
        assert!(report.contains("# References\n - Curie, Radium (1904) chunk 1\n"));
        assert!(!report.contains("# Contexts"));
    }

    fn sample_answer() -> Answer {
        Answer {
            question: "Why?".into(),
            answer: r"Because \(x\).".into(),
            contexts: vec![Context {
                name: "Doe, Notes (2001) chunk 3".into(),
                citation: "doe2001".into(),
                summary: r"Shows \[y\].".into(),
                score: 7,
                text: "raw excerpt".into(),
            }],
        }
    }

    #[test]
    fn render_layout() {
        let report = render(&sample_answer(), true, true);
        let expected = "# Question\nWhy?\n\
                        \n# Answer\nBecause $x$.\n\
                        \n# References\n - Doe, Notes (2001) chunk 3\n\
                        \n\n# Contexts\n\
                        \n## Doe, Notes (2001) chunk 3\n\
                        \n### Summary\nShows $$y$$.\n\
                        \n### Excerpt\nraw excerpt\n\
                        \n - Score: 7\n";
        assert_eq!(report, expected);
    }

    #[test]
    fn excerpt_needs_context() {
        let answer = sample_answer();
        assert!(!render(&answer, false, true).contains("Excerpt"));
        let with_context = render(&answer, true, false);
        assert!(with_context.contains("### Summary"));
        assert!(!with_context.contains("raw excerpt"));
    }

    #[test]
    fn cannot_answer_has_no_references() {
        let answer = Answer {
            question: "q".into(),
            answer: CANNOT_ANSWER.into(),
            contexts: vec![],
        };
        assert!(render(&answer, true, false).ends_with("# References\n\n\n# Contexts\n"));
    }
}
