//! Core agent types: queries, results, turns and responder budgets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Detected language of a user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    Fr,
    En,
    Ar,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Fr => "fr",
            Language::En => "en",
            Language::Ar => "ar",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Fr => "Français",
            Language::En => "English",
            Language::Ar => "العربية",
        }
    }

    /// Instruction appended to every synthesis prompt.
    pub fn instruction(&self) -> &'static str {
        match self {
            Language::Fr => "Réponds en français.",
            Language::En => "Answer in English.",
            Language::Ar => "أجب بالعربية.",
        }
    }
}

/// Detected intent of a user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    Schedule,
    Internship,
    Conversation,
    Document,
    /// No rule matched; routed to the fallback responder
    Unknown,
}

impl Intent {
    pub fn label(&self) -> &'static str {
        match self {
            Intent::Schedule => "schedule",
            Intent::Internship => "internship",
            Intent::Conversation => "conversation",
            Intent::Document => "document",
            Intent::Unknown => "unknown",
        }
    }
}

/// A classified user message. Immutable after classification.
#[derive(Debug, Clone)]
pub struct Query {
    pub raw_text: String,
    pub language: Language,
    pub intent: Intent,
}

/// The finished answer for one turn.
#[derive(Debug, Clone)]
pub struct ResponderResult {
    pub answer: String,

    /// Source references in the order they were gathered
    pub sources: Vec<String>,

    /// Tool invocations spent gathering evidence
    pub iterations: u32,

    /// Wall-clock time for the whole turn
    pub elapsed: Duration,

    /// Synthesis stayed below the quality threshold after one retry
    pub degraded: bool,
}

/// One completed exchange.
#[derive(Debug, Clone)]
pub struct Turn {
    pub query: Query,
    pub result: ResponderResult,
    pub at: DateTime<Utc>,
}

/// Iteration and wall-clock bounds for one responder run.
///
/// The timeout is advisory: it gates the evidence-gathering loop's
/// planning, it never cancels an in-flight network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub max_iterations: u32,
    pub timeout: Duration,
}

impl Budget {
    /// Per-responder budgets.
    pub fn for_intent(intent: Intent) -> Self {
        match intent {
            Intent::Conversation => Self {
                max_iterations: 3,
                timeout: Duration::from_secs(60),
            },
            Intent::Schedule | Intent::Document => Self {
                max_iterations: 5,
                timeout: Duration::from_secs(120),
            },
            Intent::Internship | Intent::Unknown => Self {
                max_iterations: 8,
                timeout: Duration::from_secs(300),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budgets_per_intent() {
        assert_eq!(Budget::for_intent(Intent::Conversation).max_iterations, 3);
        assert_eq!(Budget::for_intent(Intent::Schedule).max_iterations, 5);
        assert_eq!(Budget::for_intent(Intent::Document).max_iterations, 5);
        assert_eq!(Budget::for_intent(Intent::Internship).max_iterations, 8);
        // The fallback route gets the relaxed internship budget
        assert_eq!(
            Budget::for_intent(Intent::Unknown),
            Budget::for_intent(Intent::Internship)
        );
    }

    #[test]
    fn test_language_codes() {
        assert_eq!(Language::Fr.code(), "fr");
        assert_eq!(Language::Ar.display_name(), "العربية");
        assert!(Language::En.instruction().contains("English"));
    }
}
