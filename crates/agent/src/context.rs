//! Contextual question enrichment.
//!
//! Short or referential follow-ups ("comment y postuler ?", "quels sont
//! ses programmes ?") lose their subject between turns. When the message
//! carries no autonomous subject of its own, the last few turns are
//! scanned for a known topic and the question is annotated with it before
//! classification.

use crate::memory::SessionMemory;

/// How many recent turns are scanned for a topic.
const TOPIC_LOOKBACK: usize = 3;

/// Messages this short without a subject need context.
const SHORT_MESSAGE_TOKENS: usize = 5;

/// Known topics worth recalling, keyword → display name.
const KNOWN_TOPICS: &[(&str, &str)] = &[
    ("mitacs", "Mitacs"),
    ("globalink", "Globalink/Mitacs"),
    ("enigplus", "ENIGPlus"),
    ("enig", "ENIG"),
    ("pfe", "PFE"),
    ("stage d'initiation", "stage d'initiation"),
    ("stage de perfectionnement", "stage de perfectionnement"),
    ("emploi du temps", "emploi du temps"),
];

/// Subjects that make a question self-contained.
const AUTONOMOUS_SUBJECTS: &[&str] = &[
    "mitacs",
    "globalink",
    "enig",
    "enigplus",
    "emploi du temps",
    "semaine",
    "horaire",
    "stage",
    "pfe",
    "initiation",
    "perfectionnement",
    "inscription",
    "procédure",
    "bonjour",
    "salut",
    "hello",
    "مرحبا",
];

/// Referential phrasings that point back at an earlier subject.
const CONTEXT_INDICATORS: &[&str] = &[
    "qu'il",
    "qu'elle",
    "il offre",
    "elle offre",
    "ils offrent",
    "ses programmes",
    "ses services",
    "son site",
    "leurs",
    "ce programme",
    "cette organisation",
    "cet organisme",
    "y postuler",
    "s'y inscrire",
    "it offers",
    "they offer",
    "its programs",
    "this program",
    "this organization",
    "quels sont les",
    "quelles sont les",
    "comment faire",
    "comment postuler",
    "c'est quand",
    "c'est où",
];

/// Annotate a referential question with the topic of recent turns.
/// Self-contained questions pass through untouched.
pub fn enrich(question: &str, memory: &SessionMemory) -> String {
    if memory.is_empty() {
        return question.to_string();
    }

    let lower = question.to_lowercase();

    if AUTONOMOUS_SUBJECTS.iter().any(|s| lower.contains(s)) {
        return question.to_string();
    }

    if !needs_context(&lower) {
        return question.to_string();
    }

    match recall_topic(memory) {
        Some(topic) => {
            tracing::debug!("Enriching question with recalled topic '{}'", topic);
            format!("{} (concernant {})", question, topic)
        }
        None => question.to_string(),
    }
}

/// Whether a (lowercased) question relies on earlier context.
fn needs_context(lower: &str) -> bool {
    if CONTEXT_INDICATORS.iter().any(|ind| lower.contains(ind)) {
        return true;
    }

    // A very short question with no clear subject
    lower.split_whitespace().count() <= SHORT_MESSAGE_TOKENS
        && !AUTONOMOUS_SUBJECTS.iter().any(|s| lower.contains(s))
}

/// Scan recent turns (questions and answers, newest first) for a known
/// topic.
fn recall_topic(memory: &SessionMemory) -> Option<String> {
    let recent: Vec<_> = memory.turns().collect();

    for turn in recent.iter().rev().take(TOPIC_LOOKBACK) {
        let user = turn.query.raw_text.to_lowercase();
        let agent = turn.result.answer.to_lowercase();

        for (keyword, topic) in KNOWN_TOPICS {
            if user.contains(keyword) || agent.contains(keyword) {
                return Some((*topic).to_string());
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Intent, Language, Query, ResponderResult, Turn};
    use chrono::Utc;
    use std::time::Duration;

    fn remember(memory: &mut SessionMemory, question: &str, answer: &str) {
        memory
            .remember(Turn {
                query: Query {
                    raw_text: question.to_string(),
                    language: Language::Fr,
                    intent: Intent::Internship,
                },
                result: ResponderResult {
                    answer: answer.to_string(),
                    sources: vec![],
                    iterations: 1,
                    elapsed: Duration::from_millis(5),
                    degraded: false,
                },
                at: Utc::now(),
            })
            .unwrap();
    }

    #[test]
    fn test_referential_question_gets_topic() {
        let mut memory = SessionMemory::new();
        remember(
            &mut memory,
            "c'est quoi Mitacs ?",
            "Mitacs est un organisme canadien qui finance des stages de recherche.",
        );

        let enriched = enrich("quels sont les programmes qu'il offre ?", &memory);
        assert!(enriched.contains("(concernant Mitacs)"));
    }

    #[test]
    fn test_autonomous_question_untouched() {
        let mut memory = SessionMemory::new();
        remember(&mut memory, "c'est quoi Mitacs ?", "Un organisme canadien.");

        let question = "quel est l'emploi du temps de la semaine 14 ?";
        assert_eq!(enrich(question, &memory), question);
    }

    #[test]
    fn test_empty_memory_untouched() {
        let memory = SessionMemory::new();
        let question = "comment y postuler ?";
        assert_eq!(enrich(question, &memory), question);
    }

    #[test]
    fn test_topic_found_in_agent_answer() {
        let mut memory = SessionMemory::new();
        remember(
            &mut memory,
            "parle-moi des stages au Canada",
            "Le programme Globalink de Mitacs accueille des étudiants chaque été.",
        );

        let enriched = enrich("comment postuler ?", &memory);
        assert!(enriched.contains("concernant"));
    }

    #[test]
    fn test_short_question_without_subject_needs_context() {
        assert!(needs_context("et après ?"));
        assert!(!needs_context("c'est quoi le programme mitacs exactement"));
    }
}
