//! In-memory retrieval client.
//!
//! Keeps indexed content in process and ranks it with the lexical scorer.
//! Used by tests and by `--offline` runs where no vector service exists.
//! Honors the same contract as the HTTP adapter: descending scores, empty
//! result set when nothing is relevant.

use crate::client::{HitMetadata, RetrievalClient, RetrievalHit};
use crate::lexical;
use campusbot_core::AppResult;
use std::sync::RwLock;

/// Minimum blended score for a hit to be considered relevant.
const MIN_SCORE: f32 = 0.1;

/// How many hits to return per search.
const SEARCH_LIMIT: usize = 5;

struct StoredEntry {
    content: String,
    embedding: Vec<f32>,
    metadata: HitMetadata,
}

/// Lexically-ranked in-process store.
#[derive(Default)]
pub struct MemoryRetrievalClient {
    entries: RwLock<Vec<StoredEntry>>,
}

impl MemoryRetrievalClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed entries.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl RetrievalClient for MemoryRetrievalClient {
    async fn search(&self, question: &str) -> AppResult<Vec<RetrievalHit>> {
        let query_embedding = lexical::lexical_embedding(question);
        let query_tokens = lexical::token_set(question);

        let entries = self
            .entries
            .read()
            .map_err(|_| campusbot_core::AppError::Retrieval("store lock poisoned".to_string()))?;

        let mut hits: Vec<RetrievalHit> = entries
            .iter()
            .map(|entry| {
                let cosine = lexical::cosine_similarity(&query_embedding, &entry.embedding);
                let overlap =
                    lexical::overlap_ratio(&query_tokens, &lexical::token_set(&entry.content));
                let score = 0.4 * cosine + 0.6 * overlap;

                RetrievalHit {
                    url: entry.metadata.url.clone().unwrap_or_default(),
                    title: entry.metadata.title.clone().unwrap_or_default(),
                    snippet: snippet_of(&entry.content),
                    score,
                }
            })
            .filter(|hit| hit.score >= MIN_SCORE)
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(SEARCH_LIMIT);

        Ok(hits)
    }

    async fn index(&self, content: &str, metadata: HitMetadata) -> AppResult<()> {
        let entry = StoredEntry {
            content: content.to_string(),
            embedding: lexical::lexical_embedding(content),
            metadata,
        };

        self.entries
            .write()
            .map_err(|_| campusbot_core::AppError::Retrieval("store lock poisoned".to_string()))?
            .push(entry);

        Ok(())
    }
}

fn snippet_of(content: &str) -> String {
    const MAX_SNIPPET: usize = 200;
    if content.len() <= MAX_SNIPPET {
        return content.to_string();
    }
    let mut end = MAX_SNIPPET;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &content[..end])
}
