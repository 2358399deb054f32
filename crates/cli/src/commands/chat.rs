//! Chat command handler: the interactive session loop.
//!
//! Reads questions from stdin, routes each through the dispatcher, prints
//! the answer with its sources, and appends every turn to the session
//! transcript. `exit`/`quit` (or EOF) ends the session with a goodbye in
//! the last detected language.

use clap::Args;
use campusbot_agent::{classify, messages, SessionMemory};
use campusbot_agent::types::Language;
use campusbot_core::{AppConfig, AppResult};
use std::io::{BufRead, Write};

/// Interactive conversation loop
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Do not write a session transcript
    #[arg(long)]
    pub no_transcript: bool,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let (dispatcher, _documents) = super::build_dispatcher(config)?;

        let mut session = if self.no_transcript {
            SessionMemory::new()
        } else {
            SessionMemory::with_transcript(&config.ensure_state_dir()?)?
        };

        println!("CampusBot — assistant étudiant");
        println!("Langues : Français | English | العربية");
        println!("Tape 'exit' ou 'quit' pour quitter.\n");

        let stdin = std::io::stdin();
        let mut last_language = Language::Fr;

        loop {
            print!("Vous> ");
            std::io::stdout().flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                // EOF
                break;
            }

            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
                break;
            }

            last_language = classify::detect_language(question);

            match dispatcher.process(question, &mut session).await {
                Ok(result) => {
                    println!();
                    super::print_result(&result);
                    println!();
                }
                Err(e) => {
                    tracing::error!("Turn failed: {}", e);
                    println!("\n{}\n", messages::turn_failed(last_language));
                }
            }
        }

        println!("{}", messages::goodbye(last_language));

        if let Some(path) = session.transcript_path() {
            tracing::info!("Transcript saved to {:?}", path);
        }
        session.clear();

        Ok(())
    }
}
