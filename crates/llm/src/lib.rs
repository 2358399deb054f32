//! LLM integration crate for CampusBot.
//!
//! Provider-agnostic abstraction for the hosted language model that phrases
//! the final answers. Providers implement the [`LlmClient`] trait; the rest
//! of the system only sees `complete(request) -> response`.
//!
//! # Providers
//! - **Gemini**: Google's hosted model family (the default)
//!
//! # Example
//! ```no_run
//! use campusbot_llm::{LlmClient, LlmRequest, providers::GeminiClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GeminiClient::new("my-api-key");
//! let request = LlmRequest::new("Bonjour !", "gemini-2.5-flash-lite");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::GeminiClient;
