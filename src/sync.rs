//! Index synchronization: bring the persisted index in line with the
//! library.
//!
//! One pass over the selected documents:
//!
//! 1. Fingerprint every PDF attachment (SHA-256 of the file bytes).
//! 2. Derive citation and display name; documents that cannot be named are
//!    skipped.
//! 3. Add the file to the engine. If the fingerprint is already indexed,
//!    carry over a changed citation and rename the entry (and its texts)
//!    when the derived display name changed.
//! 4. Delete every indexed fingerprint that no longer belongs to any PDF of
//!    the library.
//! 5. Save the index.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use papis_qa_core::docs::{Clients, Docs};
use papis_qa_core::engine::{Added, QaEngine};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::clients::{check_models, create_clients};
use crate::config::Config;
use crate::library::{scan_library, Document, DocumentQuery};
use crate::naming::{self, Naming, SkipReason};
use crate::store::{FileIndexStore, IndexStore};

/// A PDF attachment of a library document, with its fingerprint.
#[derive(Debug, Clone)]
pub struct LibraryFile {
    pub document: Document,
    pub path: PathBuf,
    pub dockey: String,
}

/// Counts from one synchronization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// PDF attachments considered in this pass.
    pub scanned: usize,
    pub added: usize,
    pub citations_updated: usize,
    pub renamed: usize,
    /// Files of documents that could not be named.
    pub skipped: usize,
    /// Files whose text could not be extracted.
    pub unreadable: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Discard the existing index and rebuild from scratch.
    pub force: bool,
    /// Report what would change without touching the index.
    pub dry_run: bool,
    /// Documents to add or update. Removal always considers the whole library.
    pub query: DocumentQuery,
}

/// SHA-256 of a file's contents, as lowercase hex.
pub fn fingerprint_file(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Fingerprint every PDF attachment of `documents`.
///
/// Attachments missing on disk are logged and left out, so an entry for a
/// deleted file is removed like that of a deleted document.
pub fn collect_files(documents: &[Document]) -> Result<Vec<LibraryFile>> {
    let mut files = Vec::new();
    for document in documents {
        for path in document.pdf_files() {
            if !path.is_file() {
                warn!("Missing file {} of {}", path.display(), document.id);
                continue;
            }
            files.push(LibraryFile {
                document: document.clone(),
                path: path.clone(),
                dockey: fingerprint_file(path)?,
            });
        }
    }
    Ok(files)
}

fn log_skip(document: &Document, reason: SkipReason) {
    let citation = naming::citation(document);
    match reason {
        SkipReason::MissingMetadata => warn!(
            "Skipping {} since author, year or title is missing...",
            citation
        ),
        SkipReason::UnresolvedAuthor => debug!("Skipping {}: {}", citation, reason),
    }
}

/// Run steps 1–4 against `engine`.
///
/// `selected` are the files to add or update; `present` holds the
/// fingerprints of every PDF in the library, and anything indexed outside
/// it is deleted.
pub async fn synchronize<E: QaEngine + ?Sized>(
    engine: &mut E,
    selected: &[LibraryFile],
    present: &HashSet<String>,
) -> Result<SyncReport> {
    let total = selected.len();
    let mut report = SyncReport {
        scanned: total,
        ..Default::default()
    };
    let mut processed: HashSet<&str> = HashSet::new();

    for (i, file) in selected.iter().enumerate() {
        let counter = i + 1;
        if processed.contains(file.dockey.as_str()) {
            debug!(
                "{} has the same content as a file already seen in this pass",
                file.path.display()
            );
            continue;
        }

        let naming = match naming::derive(&file.document) {
            Ok(naming) => naming,
            Err(reason) => {
                log_skip(&file.document, reason);
                report.skipped += 1;
                continue;
            }
        };
        // Only a named document claims the fingerprint; another document
        // attaching the same PDF may still index it.
        processed.insert(file.dockey.as_str());

        match engine
            .add(&file.path, &file.dockey, &naming.citation, &naming.docname)
            .await?
        {
            Added::New { docname } => {
                info!(
                    "{}/{}: Indexing {} ({})...",
                    counter,
                    total,
                    docname,
                    file.path.display()
                );
                report.added += 1;
            }
            Added::Unreadable { reason } => {
                warn!("Skipping {}: {}", file.path.display(), reason);
                report.unreadable += 1;
            }
            Added::AlreadyPresent => reconcile(engine, &file.dockey, &naming, &mut report)?,
        }
    }

    for dockey in engine.dockeys() {
        if !present.contains(&dockey) {
            info!("Removing {}", dockey);
            engine.delete(&dockey);
            report.removed += 1;
        }
    }

    Ok(report)
}

/// Bring an already indexed entry's citation and display name up to date.
fn reconcile<E: QaEngine + ?Sized>(
    engine: &mut E,
    dockey: &str,
    naming: &Naming,
    report: &mut SyncReport,
) -> Result<()> {
    let Some(stored) = engine.doc(dockey).cloned() else {
        return Ok(());
    };

    if stored.citation != naming.citation {
        info!(
            "Updating citation for {}, with {}",
            stored.citation, naming.citation
        );
        engine.set_citation(dockey, &naming.citation);
        report.citations_updated += 1;
    }

    if stored.docname != naming.docname {
        let renamed = engine.rename(&stored.docname, &naming.docname)?;
        if !renamed.old_name_registered {
            error!("Failed to remove the name {}", stored.docname);
        }
        // A collision can resolve back to the stored name; nothing changed then.
        if renamed.docname != stored.docname {
            info!(
                "Updating docname for {}, with {}",
                stored.docname, renamed.docname
            );
            report.renamed += 1;
        }
    }
    Ok(())
}

/// Report what [`synchronize`] would do, without mutating anything.
pub fn preview<E: QaEngine + ?Sized>(
    engine: &E,
    selected: &[LibraryFile],
    present: &HashSet<String>,
) -> SyncReport {
    let mut report = SyncReport {
        scanned: selected.len(),
        ..Default::default()
    };
    let mut processed: HashSet<&str> = HashSet::new();

    for file in selected {
        if processed.contains(file.dockey.as_str()) {
            continue;
        }
        let naming = match naming::derive(&file.document) {
            Ok(naming) => naming,
            Err(reason) => {
                log_skip(&file.document, reason);
                report.skipped += 1;
                continue;
            }
        };
        processed.insert(file.dockey.as_str());
        match engine.doc(&file.dockey) {
            None => {
                info!("Would index {} ({})", naming.docname, file.path.display());
                report.added += 1;
            }
            Some(stored) => {
                if stored.citation != naming.citation {
                    info!(
                        "Would update citation for {}, with {}",
                        stored.citation, naming.citation
                    );
                    report.citations_updated += 1;
                }
                if stored.docname != naming.docname {
                    info!(
                        "Would update docname for {}, with {}",
                        stored.docname, naming.docname
                    );
                    report.renamed += 1;
                }
            }
        }
    }

    report.removed = engine
        .dockeys()
        .iter()
        .filter(|dockey| !present.contains(*dockey))
        .inspect(|dockey| info!("Would remove {}", dockey))
        .count();
    report
}

/// Load (or create) the index, synchronize it with `documents`, and save it.
///
/// `clients` may be `None` only for a dry run.
pub async fn index_documents(
    config: &Config,
    store: &dyn IndexStore,
    documents: &[Document],
    clients: Option<Clients>,
    options: &IndexOptions,
) -> Result<SyncReport> {
    // A forced rebuild starts empty but only replaces the stored index on
    // the final save, so a failed run leaves the old one in place.
    let loaded = if options.force { None } else { store.load()? };
    let mut docs = match loaded {
        Some(docs) => {
            check_models(&docs, config);
            docs
        }
        None => Docs::new(
            &config.models.llm,
            &config.models.embedding,
            config.chunking.max_tokens,
        ),
    };

    let files = collect_files(documents)?;
    let present: HashSet<String> = files.iter().map(|f| f.dockey.clone()).collect();
    let selected: Vec<LibraryFile> = if options.query.matches_all() {
        files
    } else {
        files
            .into_iter()
            .filter(|f| options.query.matches(&f.document))
            .collect()
    };

    if options.dry_run {
        return Ok(preview(&docs, &selected, &present));
    }

    match clients {
        Some(clients) => docs.set_client(clients),
        None => anyhow::bail!("cannot index without embedding and chat clients"),
    }
    let report = synchronize(&mut docs, &selected, &present).await?;
    store.save(&docs)?;
    Ok(report)
}

/// `papisqa index`: synchronize the configured library's index.
pub async fn run_index(config: &Config, query: &str, force: bool, dry_run: bool) -> Result<()> {
    let library_dir = config.library_dir()?;
    let documents = scan_library(&library_dir)?;
    let options = IndexOptions {
        force,
        dry_run,
        query: DocumentQuery::parse(query),
    };
    if !options.query.matches_all() && !documents.iter().any(|d| options.query.matches(d)) {
        warn!("No document matches {:?}", query);
    }

    let store = FileIndexStore::new(config.index_path()?);
    let clients = if dry_run {
        None
    } else {
        Some(create_clients(config)?)
    };
    let report = index_documents(config, &store, &documents, clients, &options).await?;

    print_report(&config.library.name, &report, dry_run);
    Ok(())
}

fn print_report(library: &str, report: &SyncReport, dry_run: bool) {
    if dry_run {
        println!("index {} (dry-run)", library);
    } else {
        println!("index {}", library);
    }
    println!("  scanned: {} files", report.scanned);
    println!("  indexed: {}", report.added);
    println!("  citations updated: {}", report.citations_updated);
    println!("  renamed: {}", report.renamed);
    println!("  skipped: {}", report.skipped);
    println!("  unreadable: {}", report.unreadable);
    println!("  removed: {}", report.removed);
    println!("ok");
}
