//! Retrieval crate for CampusBot.
//!
//! Two retrieval surfaces live here:
//! - [`RetrievalClient`]: the contract over the external vector-similarity
//!   service that maps a free-text question to ranked source URLs, with an
//!   HTTP adapter and an in-memory lexical adapter for tests/offline runs.
//! - [`DocumentStore`]: the local index of uploaded documents (rusqlite),
//!   used by the document responder for Q&A and summaries.

pub mod client;
pub mod docstore;
pub mod http;
mod lexical;
pub mod memory;

pub use client::{HitMetadata, RetrievalClient, RetrievalHit};
pub use docstore::{DocHit, DocumentStore, DocumentSummary};
pub use http::HttpRetrievalClient;
pub use memory::MemoryRetrievalClient;
