//! Session memory and transcript persistence.
//!
//! Each interactive session owns a bounded buffer of its most recent
//! turns (for conversational context) and, optionally, an append-only
//! transcript file under the workspace state directory. Sessions never
//! share memory.

use crate::types::Turn;
use campusbot_core::{AppError, AppResult};
use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Maximum turns kept in memory (and offered to prompts).
pub const MAX_TURNS: usize = 10;

/// Transcript answers are truncated to this length.
const TRANSCRIPT_ANSWER_LEN: usize = 200;

/// Bounded per-session conversation memory.
pub struct SessionMemory {
    session_id: String,
    turns: VecDeque<Turn>,
    transcript: Option<Transcript>,
}

impl SessionMemory {
    /// A memory-only session (no transcript on disk).
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            turns: VecDeque::new(),
            transcript: None,
        }
    }

    /// A session whose turns are also appended to a transcript file under
    /// `<state_dir>/sessions/`.
    pub fn with_transcript(state_dir: &Path) -> AppResult<Self> {
        let session_id = Uuid::new_v4().to_string();
        let transcript = Transcript::create(state_dir, &session_id)?;

        Ok(Self {
            session_id,
            turns: VecDeque::new(),
            transcript: Some(transcript),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Record a completed turn; drops the oldest once the cap is reached
    /// and appends to the transcript when one is attached.
    pub fn remember(&mut self, turn: Turn) -> AppResult<()> {
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.append(&turn)?;
        }

        self.turns.push_back(turn);
        while self.turns.len() > MAX_TURNS {
            self.turns.pop_front();
        }

        Ok(())
    }

    /// Turns in chronological order.
    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// (user message, answer) pairs for prompt context.
    pub fn history_pairs(&self) -> Vec<(String, String)> {
        self.turns
            .iter()
            .map(|turn| (turn.query.raw_text.clone(), turn.result.answer.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Forget everything (session end). The transcript file remains.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Path of the transcript file, when one is attached.
    pub fn transcript_path(&self) -> Option<&Path> {
        self.transcript.as_ref().map(|t| t.path.as_path())
    }
}

impl Default for SessionMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// Append-only per-session transcript.
struct Transcript {
    path: PathBuf,
    written: u32,
}

impl Transcript {
    fn create(state_dir: &Path, session_id: &str) -> AppResult<Self> {
        let sessions_dir = state_dir.join("sessions");
        std::fs::create_dir_all(&sessions_dir).map_err(|e| {
            AppError::Session(format!("Failed to create sessions directory: {}", e))
        })?;

        let path = sessions_dir.join(format!("session-{}.log", session_id));
        std::fs::write(&path, format!("SESSION {}\n\n", session_id))
            .map_err(|e| AppError::Session(format!("Failed to create transcript: {}", e)))?;

        Ok(Self { path, written: 0 })
    }

    fn append(&mut self, turn: &Turn) -> AppResult<()> {
        self.written += 1;

        let mut answer = turn.result.answer.trim().replace('\n', " ");
        if answer.len() > TRANSCRIPT_ANSWER_LEN {
            let mut end = TRANSCRIPT_ANSWER_LEN;
            while !answer.is_char_boundary(end) {
                end -= 1;
            }
            answer.truncate(end);
            answer.push_str("...");
        }

        let entry = format!(
            "[{}] {} | {} | {}\nUSER: {}\nAGENT: {}\n\n",
            self.written,
            turn.query.intent.label().to_uppercase(),
            turn.query.language.code().to_uppercase(),
            turn.at.to_rfc3339(),
            turn.query.raw_text,
            answer,
        );

        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| AppError::Session(format!("Failed to open transcript: {}", e)))?;

        file.write_all(entry.as_bytes())
            .map_err(|e| AppError::Session(format!("Failed to write transcript: {}", e)))?;

        Ok(())
    }
}
