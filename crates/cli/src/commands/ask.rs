//! Ask command handler: one question, one answer, exit.

use clap::Args;
use campusbot_agent::SessionMemory;
use campusbot_core::{AppConfig, AppError, AppResult};

/// Ask a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Vec<String>,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let question = self.question.join(" ");
        if question.trim().is_empty() {
            return Err(AppError::Config("No question provided".to_string()));
        }

        let (dispatcher, _documents) = super::build_dispatcher(config)?;
        let mut session = SessionMemory::new();

        let result = dispatcher.process(&question, &mut session).await?;
        super::print_result(&result);

        tracing::debug!(
            "Answered in {:?} with {} tool calls",
            result.elapsed,
            result.iterations
        );

        Ok(())
    }
}
