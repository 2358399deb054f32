//! Command handlers for the CampusBot CLI.

pub mod ask;
pub mod chat;
pub mod doc;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use doc::DocCommand;

use campusbot_agent::Dispatcher;
use campusbot_core::{AppConfig, AppResult};
use campusbot_extract::{ScheduleExtractor, WebExtractor};
use campusbot_retrieval::{
    DocumentStore, HttpRetrievalClient, MemoryRetrievalClient, RetrievalClient,
};
use std::sync::Arc;

/// Wire the dispatcher from configuration: retrieval client (HTTP or
/// in-memory for --offline), document store, extractors and LLM.
pub fn build_dispatcher(config: &AppConfig) -> AppResult<(Dispatcher, Arc<DocumentStore>)> {
    let retrieval: Arc<dyn RetrievalClient> = if config.offline {
        tracing::info!("Offline mode: in-memory retrieval");
        Arc::new(MemoryRetrievalClient::new())
    } else {
        Arc::new(HttpRetrievalClient::new(config.vector_endpoint.clone()))
    };

    let documents = Arc::new(DocumentStore::open(&config.document_db_path())?);

    let llm = campusbot_llm::create_client(
        &config.provider,
        config.llm_endpoint.as_deref(),
        config.api_key.as_deref(),
    )?;

    let dispatcher = Dispatcher::new(
        retrieval,
        Arc::clone(&documents),
        Arc::new(WebExtractor::new()?),
        Arc::new(ScheduleExtractor::new()?),
        llm,
        config.model.clone(),
        config.schedule_url.clone(),
    )?;

    Ok((dispatcher, documents))
}

/// Render one answer with its sources.
pub fn print_result(result: &campusbot_agent::ResponderResult) {
    println!("{}", result.answer);

    if !result.sources.is_empty() {
        println!();
        for source in &result.sources {
            println!("  Source : {}", source);
        }
    }
}
