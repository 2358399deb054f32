//! Agent crate for CampusBot.
//!
//! Everything between a raw user message and a finished answer:
//! - [`classify`]: language + intent detection (pure, keyword-driven)
//! - [`context`]: referential-question enrichment from recent turns
//! - [`memory`]: per-session turn buffer and transcript persistence
//! - [`dispatcher`]: the per-turn state machine that gathers evidence
//!   under iteration/time budgets and assembles the final answer
//! - [`synthesis`] / [`clean`]: LLM phrasing and trace stripping

pub mod classify;
pub mod clean;
pub mod context;
pub mod dispatcher;
pub mod memory;
pub mod messages;
mod responders;
pub mod synthesis;
pub mod types;

pub use classify::{classify, Classification};
pub use dispatcher::Dispatcher;
pub use memory::SessionMemory;
pub use types::{Budget, Intent, Language, Query, ResponderResult, Turn};
