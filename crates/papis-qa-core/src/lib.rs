//! # papis-qa core
//!
//! Pure logic for papis-qa: the persisted index state ([`docs::Docs`]),
//! paragraph chunking, similarity retrieval, and the [`engine::QaEngine`]
//! trait the synchronizer and the `ask` frontend drive.
//!
//! This crate performs no filesystem or network I/O of its own. Reading
//! PDFs, computing embeddings, and calling a chat model are delegated to
//! the collaborators in [`embedding`], [`llm`], and [`docs::TextLoader`],
//! which the application crate implements and attaches with
//! [`docs::Docs::set_client`].

pub mod chunk;
pub mod docs;
pub mod embedding;
pub mod engine;
pub mod llm;
pub mod models;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;
