//! HTTP adapter for the vector-similarity service.
//!
//! A thin pass-through: the service computes embeddings and similarity on
//! its side; we send the raw question text and receive ranked hits.

use crate::client::{HitMetadata, RetrievalClient, RetrievalHit};
use campusbot_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// How many hits to request per search.
const SEARCH_LIMIT: usize = 5;

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<RetrievalHit>,
}

#[derive(Debug, Serialize)]
struct IndexRequest<'a> {
    content: &'a str,
    metadata: &'a HitMetadata,
}

/// Client for a vector-similarity service exposing a small REST surface.
pub struct HttpRetrievalClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRetrievalClient {
    /// Create a new client against the given service base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl RetrievalClient for HttpRetrievalClient {
    async fn search(&self, question: &str) -> AppResult<Vec<RetrievalHit>> {
        tracing::debug!("Vector search: {}", question);

        let url = format!("{}/v1/search", self.base_url);
        let request = SearchRequest {
            query: question,
            limit: SEARCH_LIMIT,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Retrieval(format!("Vector service unreachable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Retrieval(format!(
                "Vector service error ({}): {}",
                status, error_text
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::Retrieval(format!("Invalid search response: {}", e)))?;

        let mut hits = body.hits;
        // Enforce the ordering contract even if the service misbehaves
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        tracing::info!("Vector search returned {} hits", hits.len());
        Ok(hits)
    }

    async fn index(&self, content: &str, metadata: HitMetadata) -> AppResult<()> {
        let url = format!("{}/v1/objects", self.base_url);
        let request = IndexRequest {
            content,
            metadata: &metadata,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Retrieval(format!("Vector service unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Retrieval(format!(
                "Indexing failed with status {}",
                response.status()
            )));
        }

        Ok(())
    }
}
