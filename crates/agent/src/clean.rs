//! Response cleaning.
//!
//! Model output occasionally leaks agent narration ("Thought:", "Action:"
//! lines) or wraps the reply in a "Final Answer:" frame. The cleaner
//! strips those markers and flags answers that stay below the quality
//! threshold.

use regex::Regex;
use std::sync::OnceLock;

/// Cleaned answers shorter than this trigger one synthesis retry.
pub const MIN_ANSWER_LEN: usize = 10;

/// Line prefixes that are tool-trace narration, never content.
const TRACE_PREFIXES: &[&str] = &[
    "Thought:",
    "Action:",
    "Action Input:",
    "Previous Action:",
    "Observation:",
];

fn final_answer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)final answer\s*:").unwrap())
}

/// Strip reasoning/tool-trace markers from a generated answer.
pub fn clean_response(raw: &str) -> String {
    let mut text = raw;

    // Keep only what follows the last "Final Answer:" frame, if any
    if let Some(m) = final_answer_re().find_iter(raw).last() {
        text = &raw[m.end()..];
    }

    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim_start();
        if TRACE_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
            continue;
        }
        lines.push(line);
    }

    let mut cleaned = lines.join("\n");

    while cleaned.contains("\n\n\n") {
        cleaned = cleaned.replace("\n\n\n", "\n\n");
    }

    let cleaned = cleaned.trim().to_string();

    // Over-aggressive cleaning must not destroy a real answer
    if cleaned.len() < MIN_ANSWER_LEN && raw.trim().len() >= MIN_ANSWER_LEN {
        return raw.trim().to_string();
    }

    cleaned
}

/// Whether an answer is below the quality threshold.
pub fn is_too_short(answer: &str) -> bool {
    answer.trim().len() < MIN_ANSWER_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_trace_lines() {
        let raw = "Thought: I should look up the schedule.\n\
                   Action: search\n\
                   Voici l'emploi du temps de la semaine 14.";
        let cleaned = clean_response(raw);

        assert!(!cleaned.contains("Thought:"));
        assert!(!cleaned.contains("Action:"));
        assert!(cleaned.contains("semaine 14"));
    }

    #[test]
    fn test_extracts_final_answer() {
        let raw = "Thought: je réfléchis...\nFinal Answer: Les candidatures ouvrent en septembre.";
        let cleaned = clean_response(raw);
        assert_eq!(cleaned, "Les candidatures ouvrent en septembre.");
    }

    #[test]
    fn test_clean_text_passes_through() {
        let raw = "Bonjour ! Comment puis-je t'aider aujourd'hui ?";
        assert_eq!(clean_response(raw), raw);
    }

    #[test]
    fn test_collapses_blank_lines() {
        let raw = "Premier paragraphe.\n\n\n\n\nSecond paragraphe.";
        let cleaned = clean_response(raw);
        assert!(cleaned.contains("Premier paragraphe.\n\nSecond paragraphe."));
    }

    #[test]
    fn test_over_cleaning_falls_back_to_original() {
        // Everything looks like a trace; the original is kept rather than
        // returning an empty answer
        let raw = "Action: demander à l'étudiant de patienter quelques minutes";
        let cleaned = clean_response(raw);
        assert!(!cleaned.is_empty());
    }

    #[test]
    fn test_is_too_short() {
        assert!(is_too_short(""));
        assert!(is_too_short("   ok   "));
        assert!(!is_too_short("Voici une réponse complète."));
    }
}
