//! Doc command handler: manage the uploaded-document index.

use clap::{Args, Subcommand};
use campusbot_core::{AppConfig, AppError, AppResult};
use campusbot_extract::pdf::pdf_text_from_bytes;
use campusbot_retrieval::DocumentStore;
use std::path::Path;

/// Manage uploaded documents
#[derive(Args, Debug)]
pub struct DocCommand {
    #[command(subcommand)]
    pub action: DocAction,
}

#[derive(Subcommand, Debug)]
pub enum DocAction {
    /// Index a single document (pdf, txt, md)
    Add {
        /// Path to the file
        path: std::path::PathBuf,
    },

    /// Index every supported document in a directory
    Scan {
        /// Directory to scan
        dir: std::path::PathBuf,
    },

    /// List indexed documents
    List,

    /// Search indexed documents
    Search {
        /// The search query
        query: Vec<String>,
    },

    /// Remove every indexed document
    Clear,
}

/// File extensions the indexer accepts.
const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md"];

impl DocCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = DocumentStore::open(&config.document_db_path())?;

        match &self.action {
            DocAction::Add { path } => {
                let summary = add_file(&store, path)?;
                println!(
                    "Indexé : {} ({} sections, {} caractères)",
                    summary.filename, summary.chunk_count, summary.char_count
                );
            }

            DocAction::Scan { dir } => {
                let mut added = 0usize;
                let mut skipped = 0usize;

                for entry in walkdir::WalkDir::new(dir)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                {
                    if !is_supported(entry.path()) {
                        continue;
                    }
                    match add_file(&store, entry.path()) {
                        Ok(summary) => {
                            println!("Indexé : {}", summary.filename);
                            added += 1;
                        }
                        Err(e) => {
                            tracing::warn!("Skipping {:?}: {}", entry.path(), e);
                            skipped += 1;
                        }
                    }
                }

                println!("{} document(s) indexé(s), {} ignoré(s)", added, skipped);
            }

            DocAction::List => {
                let summaries = store.summaries()?;
                if summaries.is_empty() {
                    println!("Aucun document indexé.");
                } else {
                    for doc in summaries {
                        println!(
                            "{}  ({} sections, {} caractères, ajouté le {})",
                            doc.filename, doc.chunk_count, doc.char_count, doc.ingested_at
                        );
                    }
                }
            }

            DocAction::Search { query } => {
                let query = query.join(" ");
                if query.trim().is_empty() {
                    return Err(AppError::Config("No query provided".to_string()));
                }

                let hits = store.search(&query, 5)?;
                if hits.is_empty() {
                    println!("Aucun passage pertinent trouvé.");
                } else {
                    for (i, hit) in hits.iter().enumerate() {
                        println!(
                            "[{}] {} (section {}, score {:.2})",
                            i + 1,
                            hit.filename,
                            hit.position + 1,
                            hit.score
                        );
                        println!("{}\n", preview(&hit.text));
                    }
                }
            }

            DocAction::Clear => {
                store.clear()?;
                println!("Index des documents vidé.");
            }
        }

        Ok(())
    }
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Read a file's text content (PDF via extraction, others as UTF-8) and
/// index it.
fn add_file(
    store: &DocumentStore,
    path: &Path,
) -> AppResult<campusbot_retrieval::DocumentSummary> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::Config(format!("Invalid file name: {:?}", path)))?;

    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    let text = if is_pdf {
        let bytes = std::fs::read(path)?;
        pdf_text_from_bytes(&bytes)?
    } else {
        std::fs::read_to_string(path)?
    };

    store.add_document(filename, &text)
}

fn preview(text: &str) -> String {
    const MAX_PREVIEW: usize = 240;
    let trimmed = text.trim();
    if trimmed.len() <= MAX_PREVIEW {
        return trimmed.to_string();
    }
    let mut end = MAX_PREVIEW;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}
