//! Retrieval client contract.
//!
//! The vector service itself is an external collaborator; this module only
//! fixes its call contract: `search` returns hits ordered by descending
//! similarity score, and an empty result set means "no relevant source".
//! Responders must report that outcome — a source URL is never invented.

use campusbot_core::AppResult;
use serde::{Deserialize, Serialize};

/// A ranked source returned by the vector service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalHit {
    /// Source URL or document identifier
    pub url: String,

    /// Human-readable title
    #[serde(default)]
    pub title: String,

    /// Short indexed description of the source
    #[serde(default)]
    pub snippet: String,

    /// Similarity score, higher is better
    pub score: f32,
}

/// Metadata attached to indexed content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HitMetadata {
    /// Source URL, when the content came from the web
    pub url: Option<String>,

    /// Title of the source
    pub title: Option<String>,

    /// Topic tags for the source
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Contract over the external vector-similarity service.
#[async_trait::async_trait]
pub trait RetrievalClient: Send + Sync {
    /// Search for sources relevant to a free-text question.
    ///
    /// Results are ordered by descending score. An empty vector signals
    /// that no relevant source exists for the question.
    async fn search(&self, question: &str) -> AppResult<Vec<RetrievalHit>>;

    /// Index a piece of content with its metadata.
    async fn index(&self, content: &str, metadata: HitMetadata) -> AppResult<()>;
}
