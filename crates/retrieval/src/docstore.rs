//! SQLite-backed index of uploaded documents.
//!
//! Documents are chunked, each chunk gets a lexical vector, and search
//! blends vector similarity with raw token overlap. The store also feeds
//! the classifier's "active upload" flag and the document responder's
//! summaries.

use crate::lexical;
use campusbot_core::{AppError, AppResult};
use chrono::Utc;
use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Mutex;
use text_splitter::TextSplitter;

/// Target chunk size in characters.
const DOC_CHUNK_SIZE: usize = 1000;

/// Hits below this blended score are noise.
const MIN_DOC_SCORE: f32 = 0.1;

/// Preview length used in summaries.
const PREVIEW_LEN: usize = 300;

/// An indexed document, as shown to the user.
#[derive(Debug, Clone)]
pub struct DocumentSummary {
    pub id: String,
    pub filename: String,
    pub ingested_at: String,
    pub chunk_count: u32,
    pub char_count: u32,
    /// Opening excerpt of the document
    pub preview: String,
}

/// A scored chunk returned by document search.
#[derive(Debug, Clone)]
pub struct DocHit {
    pub filename: String,
    pub position: u32,
    pub text: String,
    pub score: f32,
}

/// Local index of uploaded documents.
pub struct DocumentStore {
    conn: Mutex<Connection>,
}

impl DocumentStore {
    /// Open (or create) the store at the given path.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Retrieval(format!("Failed to create index directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Retrieval(format!("Failed to open document index: {}", e)))?;
        init_schema(&conn)?;

        tracing::debug!("Opened document index at {:?}", db_path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// An in-memory store, for tests and throwaway sessions.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Retrieval(format!("Failed to open document index: {}", e)))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> AppResult<T>) -> AppResult<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| AppError::Retrieval("document index lock poisoned".to_string()))?;
        f(&conn)
    }

    /// Chunk, embed and index a document. Re-adding the same content
    /// replaces the previous entry.
    pub fn add_document(&self, filename: &str, text: &str) -> AppResult<DocumentSummary> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Retrieval(format!(
                "Document '{}' has no extractable content",
                filename
            )));
        }

        let doc_id = content_id(text);
        let splitter = TextSplitter::new(DOC_CHUNK_SIZE);
        let chunks: Vec<&str> = splitter
            .chunks(text)
            .filter(|c| !c.trim().is_empty())
            .collect();

        let ingested_at = Utc::now().to_rfc3339();
        let summary = DocumentSummary {
            id: doc_id.clone(),
            filename: filename.to_string(),
            ingested_at: ingested_at.clone(),
            chunk_count: chunks.len() as u32,
            char_count: text.len() as u32,
            preview: preview_of(chunks.first().copied().unwrap_or("")),
        };

        self.with_conn(|conn| {
            conn.execute("DELETE FROM chunks WHERE doc_id = ?1", params![doc_id])
                .map_err(|e| AppError::Retrieval(format!("Failed to clear chunks: {}", e)))?;

            conn.execute(
                "INSERT OR REPLACE INTO documents (id, filename, ingested_at, chunk_count, char_count)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    doc_id,
                    filename,
                    ingested_at,
                    chunks.len() as i64,
                    text.len() as i64
                ],
            )
            .map_err(|e| AppError::Retrieval(format!("Failed to insert document: {}", e)))?;

            for (position, chunk) in chunks.iter().enumerate() {
                let embedding = embedding_to_bytes(&lexical::lexical_embedding(chunk));
                conn.execute(
                    "INSERT INTO chunks (doc_id, position, text, embedding) VALUES (?1, ?2, ?3, ?4)",
                    params![doc_id, position as i64, chunk, embedding],
                )
                .map_err(|e| AppError::Retrieval(format!("Failed to insert chunk: {}", e)))?;
            }

            Ok(())
        })?;

        tracing::info!(
            "Indexed document '{}': {} chunks, {} chars",
            filename,
            summary.chunk_count,
            summary.char_count
        );

        Ok(summary)
    }

    /// Search all indexed documents for passages relevant to the query.
    ///
    /// Score blends vector similarity (0.4) with token-overlap ratio (0.6);
    /// hits below the noise floor are dropped. Results are ordered by
    /// descending score.
    pub fn search(&self, query: &str, top_k: usize) -> AppResult<Vec<DocHit>> {
        let query_embedding = lexical::lexical_embedding(query);
        let query_tokens = lexical::token_set(query);

        let mut hits = self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT d.filename, c.position, c.text, c.embedding
                     FROM chunks c JOIN documents d ON d.id = c.doc_id",
                )
                .map_err(|e| AppError::Retrieval(format!("Failed to prepare query: {}", e)))?;

            let rows = stmt
                .query_map([], |row| {
                    let filename: String = row.get(0)?;
                    let position: i64 = row.get(1)?;
                    let text: String = row.get(2)?;
                    let embedding_bytes: Vec<u8> = row.get(3)?;
                    Ok((filename, position as u32, text, embedding_bytes))
                })
                .map_err(|e| AppError::Retrieval(format!("Failed to query chunks: {}", e)))?;

            let mut hits = Vec::new();
            for row in rows {
                let (filename, position, text, embedding_bytes) =
                    row.map_err(|e| AppError::Retrieval(format!("Row error: {}", e)))?;

                let embedding = bytes_to_embedding(&embedding_bytes);
                let cosine = lexical::cosine_similarity(&query_embedding, &embedding);
                let overlap = lexical::overlap_ratio(&query_tokens, &lexical::token_set(&text));
                let score = 0.4 * cosine + 0.6 * overlap;

                if score >= MIN_DOC_SCORE {
                    hits.push(DocHit {
                        filename,
                        position,
                        text,
                        score,
                    });
                }
            }
            Ok(hits)
        })?;

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);

        Ok(hits)
    }

    /// Summaries of every indexed document, most recent first.
    pub fn summaries(&self) -> AppResult<Vec<DocumentSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT d.id, d.filename, d.ingested_at, d.chunk_count, d.char_count,
                            (SELECT text FROM chunks WHERE doc_id = d.id ORDER BY position LIMIT 1)
                     FROM documents d ORDER BY d.ingested_at DESC",
                )
                .map_err(|e| AppError::Retrieval(format!("Failed to prepare query: {}", e)))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(DocumentSummary {
                        id: row.get(0)?,
                        filename: row.get(1)?,
                        ingested_at: row.get(2)?,
                        chunk_count: row.get::<_, i64>(3)? as u32,
                        char_count: row.get::<_, i64>(4)? as u32,
                        preview: preview_of(&row.get::<_, Option<String>>(5)?.unwrap_or_default()),
                    })
                })
                .map_err(|e| AppError::Retrieval(format!("Failed to query documents: {}", e)))?;

            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| AppError::Retrieval(format!("Row error: {}", e)))
        })
    }

    /// Whether any document has been indexed this session.
    pub fn has_documents(&self) -> bool {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM documents", [], |row| {
                row.get::<_, i64>(0)
            })
            .map_err(|e| AppError::Retrieval(format!("Failed to count documents: {}", e)))
        })
        .map(|count| count > 0)
        .unwrap_or(false)
    }

    /// Find a document whose filename contains `name` (case-insensitive).
    pub fn find_by_name(&self, name: &str) -> AppResult<Option<DocumentSummary>> {
        let needle = name.to_lowercase();
        Ok(self
            .summaries()?
            .into_iter()
            .find(|doc| doc.filename.to_lowercase().contains(&needle)))
    }

    /// Drop every document and chunk.
    pub fn clear(&self) -> AppResult<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM chunks", [])
                .map_err(|e| AppError::Retrieval(format!("Failed to clear chunks: {}", e)))?;
            conn.execute("DELETE FROM documents", [])
                .map_err(|e| AppError::Retrieval(format!("Failed to clear documents: {}", e)))?;
            Ok(())
        })
    }
}

fn init_schema(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            filename TEXT NOT NULL,
            ingested_at TEXT NOT NULL,
            chunk_count INTEGER NOT NULL,
            char_count INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chunks (
            doc_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            PRIMARY KEY (doc_id, position),
            FOREIGN KEY (doc_id) REFERENCES documents(id)
        );
        "#,
    )
    .map_err(|e| AppError::Retrieval(format!("Failed to create tables: {}", e)))
}

/// Stable short identifier derived from the document content.
fn content_id(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest
        .iter()
        .take(6)
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn preview_of(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.len() <= PREVIEW_LEN {
        return trimmed.to_string();
    }
    let mut end = PREVIEW_LEN;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}

/// Little-endian f32 encoding for BLOB storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_search() {
        let store = DocumentStore::open_in_memory().unwrap();

        store
            .add_document(
                "convention-stage.txt",
                "La convention de stage doit être signée par l'entreprise d'accueil \
                 et déposée au service des stages avant le début du stage. \
                 Le rapport de stage est à rendre trois semaines après la fin.",
            )
            .unwrap();

        let hits = store.search("quand rendre le rapport de stage ?", 3).unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].filename, "convention-stage.txt");

        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_empty_document_rejected() {
        let store = DocumentStore::open_in_memory().unwrap();
        assert!(store.add_document("vide.txt", "   \n ").is_err());
    }

    #[test]
    fn test_has_documents_flag() {
        let store = DocumentStore::open_in_memory().unwrap();
        assert!(!store.has_documents());

        store
            .add_document("notes.txt", "Chapitre un : introduction au génie civil.")
            .unwrap();
        assert!(store.has_documents());

        store.clear().unwrap();
        assert!(!store.has_documents());
    }

    #[test]
    fn test_find_by_name() {
        let store = DocumentStore::open_in_memory().unwrap();
        store
            .add_document("Rapport_PFE_2025.txt", "Résumé du projet de fin d'études.")
            .unwrap();

        let found = store.find_by_name("pfe").unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().filename, "Rapport_PFE_2025.txt");

        assert!(store.find_by_name("inexistant").unwrap().is_none());
    }

    #[test]
    fn test_reindex_same_content_replaces() {
        let store = DocumentStore::open_in_memory().unwrap();
        let text = "Contenu identique indexé deux fois.";
        store.add_document("a.txt", text).unwrap();
        store.add_document("a.txt", text).unwrap();

        assert_eq!(store.summaries().unwrap().len(), 1);
    }

    #[test]
    fn test_persists_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("documents.db");

        {
            let store = DocumentStore::open(&path).unwrap();
            store
                .add_document("memo.txt", "Les inscriptions ouvrent en septembre.")
                .unwrap();
        }

        let reopened = DocumentStore::open(&path).unwrap();
        assert!(reopened.has_documents());
        let summaries = reopened.summaries().unwrap();
        assert_eq!(summaries[0].filename, "memo.txt");
    }
}
