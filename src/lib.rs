//! # papisqa
//!
//! Question answering over a papis bibliography library.
//!
//! `papisqa index` walks the library, extracts the text of every attached
//! PDF, chunks and embeds it, and keeps a per-library index in sync with the
//! library as documents are added, re-cited, renamed, or removed.
//! `papisqa ask` retrieves the most relevant chunks, has a chat model
//! summarize and score them, and renders an answer with its references.
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌───────────────┐
//! │ papis library│──▶│  sync        │──▶│ {library}.qa  │
//! │ info.yaml+PDF│   │ name, chunk, │   │ (JSON index)  │
//! └──────────────┘   │ embed        │   └──────┬────────┘
//!                    └─────────────┘          │
//!                                             ▼
//!                                       ┌──────────┐
//!                                       │   ask    │
//!                                       └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and index location |
//! | [`library`] | papis library scanning and document queries |
//! | [`naming`] | Citation and display-name derivation |
//! | [`extract`] | PDF text extraction |
//! | [`http`] | Retrying JSON client shared by providers |
//! | [`embedding`] | OpenAI and Ollama embedding providers |
//! | [`llm`] | OpenAI and Ollama chat providers |
//! | [`clients`] | Wiring providers into a loaded index |
//! | [`store`] | Index persistence |
//! | [`sync`] | `index` command |
//! | [`ask`] | `ask` command |
//! | [`status`] | `status` command |

pub mod ask;
pub mod clients;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod http;
pub mod library;
pub mod llm;
pub mod naming;
pub mod status;
pub mod store;
pub mod sync;

#[cfg(test)]
mod test_support;
