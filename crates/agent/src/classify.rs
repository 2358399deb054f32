//! Lexical classifier: language and intent detection.
//!
//! Language: Arabic script dominates; otherwise English and French keyword
//! counts compete, French winning ties. Intent: an ordered rule table
//! evaluated top-to-bottom, first match wins — the table order IS the
//! priority (document > schedule > internship > conversation), so a
//! message matching several rules routes to the highest one.
//!
//! Pure functions of the message text and the "has active upload" flag.

use crate::types::{Intent, Language};
use regex::Regex;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

/// Result of classifying one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub language: Language,
    pub intent: Intent,
}

/// English words counted for language detection.
const EN_WORDS: &[&str] = &[
    "i", "you", "the", "is", "are", "hello", "hi", "how", "what", "where", "when", "schedule",
    "internship", "student", "help", "need", "want", "please", "thank", "thanks", "course",
    "week", "teacher",
];

/// French words counted for language detection.
const FR_WORDS: &[&str] = &[
    "je", "tu", "le", "la", "est", "sont", "bonjour", "salut", "comment", "quoi", "où", "quand",
    "emploi", "stage", "étudiant", "aide", "besoin", "merci", "cours", "semaine", "professeur",
];

/// Keywords about uploaded documents (with common accent-less typos).
const DOC_KEYWORDS: &[&str] = &[
    "fichier",
    "le document",
    "ce document",
    "mon document",
    "mes documents",
    "résumé",
    "resume",
    "résumer",
    "resumer",
    "summarize",
    "summary",
    "reformule",
    "reformuler",
    "uploaded",
    "the file",
    "my document",
    "téléchargé",
    "telecharge",
    "de quoi parle",
    "about what",
    "contenu du",
    "dans le fichier",
    "in the file",
    "cherche dans",
    "search in",
    "selon le document",
    "according to the document",
    "liste des documents",
    "list documents",
    ".pdf",
    ".docx",
    ".xlsx",
    ".txt",
];

/// Timetable keywords (fr/en/ar).
const SCHEDULE_KEYWORDS: &[&str] = &[
    "emploi du temps",
    "emplois du temps",
    "edt",
    "horaire",
    "horaires",
    "schedule",
    "timetable",
    "lundi",
    "mardi",
    "mercredi",
    "jeudi",
    "vendredi",
    "samedi",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "salle",
    "amphi",
    "room",
    "disponibilité",
    "disponible",
    "جدول",
    "توقيت",
    "حصة",
];

/// Internship, program and procedure keywords (fr/en/ar).
const INTERNSHIP_KEYWORDS: &[&str] = &[
    "mitacs",
    "globalink",
    "stage",
    "stages",
    "pfe",
    "initiation",
    "perfectionnement",
    "internship",
    "تدريب",
    "inscription",
    "inscrire",
    "procédure",
    "procedure",
    "formulaire",
    "convention",
    "c'est quoi",
    "what is",
    "qu'est-ce que",
    "ما هو",
    "définition",
    "definition",
    "enig",
    "université",
    "university",
    "programmes",
    "programs",
    "formations",
    "bureau",
    "où se trouve",
    "where is",
];

/// Phrasings that signal a request for information rather than small talk.
const DEMAND_INDICATORS: &[&str] = &[
    "je veux",
    "je voudrais",
    "je cherche",
    "je souhaite",
    "i want",
    "i need",
    "i would like",
    "comment",
    "how to",
    "how do",
    "quels sont",
    "quelles sont",
    "what are",
    "peux-tu",
    "can you",
    "could you",
    "أريد",
    "كيف",
];

/// Pure greetings — only conversational when the whole message is short.
const GREETINGS: &[&str] = &[
    "bonjour", "bonsoir", "salut", "coucou", "hello", "hi", "hey", "مرحبا", "أهلا",
    "au revoir", "bye", "goodbye", "ciao", "merci", "thanks",
];

/// Mood and well-being keywords.
const MOOD_KEYWORDS: &[&str] = &[
    "ça va",
    "comment vas",
    "how are",
    "كيف حالك",
    "stressé",
    "stress",
    "fatigué",
    "fatigue",
    "tired",
    "triste",
    "sad",
    "déprimé",
    "depressed",
    "anxieux",
    "anxious",
    "démotivé",
    "je me sens",
    "i feel",
    "pas bien",
];

/// Humor, motivation and bot-identity keywords.
const CHITCHAT_KEYWORDS: &[&str] = &[
    "blague",
    "joke",
    "funny",
    "drôle",
    "humour",
    "lol",
    "mdr",
    "haha",
    "motivation",
    "motivé",
    "courage",
    "encourage",
    "conseil",
    "advice",
    "réviser",
    "procrastin",
    "qui es-tu",
    "qui es tu",
    "who are you",
    "من أنت",
    "tu es qui",
    "what are you",
    "ton nom",
    "your name",
];

fn week_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:semaine|week)\s*\d+").unwrap())
}

/// Classify a message into (language, intent).
pub fn classify(text: &str, has_active_upload: bool) -> Classification {
    Classification {
        language: detect_language(text),
        intent: detect_intent(text, has_active_upload),
    }
}

/// Detect the message language.
///
/// Any Arabic-script character decides `Ar` outright; otherwise English
/// and French keyword counts compete and French wins ties.
pub fn detect_language(text: &str) -> Language {
    if text.chars().any(is_arabic_char) {
        return Language::Ar;
    }

    let tokens: Vec<String> = text.unicode_words().map(|w| w.to_lowercase()).collect();

    let en_count = tokens.iter().filter(|t| EN_WORDS.contains(&t.as_str())).count();
    let fr_count = tokens.iter().filter(|t| FR_WORDS.contains(&t.as_str())).count();

    if en_count > fr_count {
        Language::En
    } else {
        Language::Fr
    }
}

fn is_arabic_char(c: char) -> bool {
    matches!(u32::from(c),
        0x0600..=0x06FF | 0x0750..=0x077F | 0x08A0..=0x08FF)
}

struct MessageView<'a> {
    lower: String,
    tokens: Vec<String>,
    has_active_upload: bool,
    raw: &'a str,
}

/// A keyword matches as a substring when it is a phrase (or a file
/// extension), and as a whole token when it is a single word — so "hi"
/// never fires inside "chimie".
fn matches_keyword(view: &MessageView<'_>, keyword: &str) -> bool {
    if keyword.contains(' ') || keyword.starts_with('.') || keyword.contains('\'') {
        view.lower.contains(keyword)
    } else if keyword.len() <= 4 {
        view.tokens.iter().any(|t| t == keyword)
    } else {
        view.lower.contains(keyword)
    }
}

fn any_keyword(view: &MessageView<'_>, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| matches_keyword(view, kw))
}

fn document_rule(view: &MessageView<'_>) -> bool {
    view.has_active_upload && any_keyword(view, DOC_KEYWORDS)
}

fn schedule_rule(view: &MessageView<'_>) -> bool {
    any_keyword(view, SCHEDULE_KEYWORDS) || week_pattern().is_match(&view.lower)
}

fn internship_rule(view: &MessageView<'_>) -> bool {
    any_keyword(view, INTERNSHIP_KEYWORDS) || any_keyword(view, DEMAND_INDICATORS)
}

fn conversation_rule(view: &MessageView<'_>) -> bool {
    // Bare greetings only count when the message is just a greeting
    if view.raw.split_whitespace().count() <= 4 && any_keyword(view, GREETINGS) {
        return true;
    }

    any_keyword(view, MOOD_KEYWORDS) || any_keyword(view, CHITCHAT_KEYWORDS)
}

/// The ordered rule table. Declared order is the priority.
static INTENT_RULES: &[(Intent, fn(&MessageView<'_>) -> bool)] = &[
    (Intent::Document, document_rule),
    (Intent::Schedule, schedule_rule),
    (Intent::Internship, internship_rule),
    (Intent::Conversation, conversation_rule),
];

/// Detect the message intent via the rule table; no rule matching yields
/// `Unknown`, which the dispatcher routes to the fallback responder.
pub fn detect_intent(text: &str, has_active_upload: bool) -> Intent {
    let view = MessageView {
        lower: text.to_lowercase(),
        tokens: text.unicode_words().map(|w| w.to_lowercase()).collect(),
        has_active_upload,
        raw: text,
    };

    for (intent, rule) in INTENT_RULES {
        if rule(&view) {
            return *intent;
        }
    }

    Intent::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arabic_char_dominates() {
        assert_eq!(detect_language("مرحبا hello bonjour"), Language::Ar);
        assert_eq!(detect_language("ما هو جدول الأسبوع"), Language::Ar);
    }

    #[test]
    fn test_english_keywords() {
        assert_eq!(
            detect_language("what is the schedule for week 14"),
            Language::En
        );
    }

    #[test]
    fn test_french_default_and_tie() {
        assert_eq!(detect_language("emploi du temps semaine 14"), Language::Fr);
        // No recognized keyword at all: French by default
        assert_eq!(detect_language("xyzzy"), Language::Fr);
    }

    #[test]
    fn test_document_priority_over_schedule() {
        // Both "résumé" (document) and "emploi du temps" (schedule) match;
        // with an active upload the document rule wins by table order
        let intent = detect_intent(
            "fais un résumé du fichier, pas de l'emploi du temps",
            true,
        );
        assert_eq!(intent, Intent::Document);

        // Without an upload the document rule cannot fire
        let intent = detect_intent(
            "fais un résumé du fichier, pas de l'emploi du temps",
            false,
        );
        assert_eq!(intent, Intent::Schedule);
    }

    #[test]
    fn test_week_number_routes_to_schedule() {
        assert_eq!(detect_intent("semaine 14 ?", false), Intent::Schedule);
        assert_eq!(detect_intent("week 3 please", false), Intent::Schedule);
    }

    #[test]
    fn test_internship_keywords() {
        assert_eq!(
            detect_intent("quels sont les programmes de Mitacs ?", false),
            Intent::Internship
        );
        assert_eq!(detect_intent("c'est quoi le pfe", false), Intent::Internship);
    }

    #[test]
    fn test_demand_routes_to_internship() {
        assert_eq!(
            detect_intent("je veux des informations", false),
            Intent::Internship
        );
    }

    #[test]
    fn test_conversation_detection() {
        assert_eq!(detect_intent("Bonjour !", false), Intent::Conversation);
        assert_eq!(
            detect_intent("Bonjour, je suis stressé", false),
            Intent::Conversation
        );
        assert_eq!(detect_intent("raconte une blague", false), Intent::Conversation);
    }

    #[test]
    fn test_greeting_not_matched_inside_long_message() {
        // "hi" must not fire as a substring, and a long message with a
        // greeting but a real request is not small talk
        let intent = detect_intent("hello, I need the internship procedure for Canada", false);
        assert_eq!(intent, Intent::Internship);
    }

    #[test]
    fn test_unknown_goes_to_fallback() {
        assert_eq!(detect_intent("azerty uiop", false), Intent::Unknown);
    }

    #[test]
    fn test_classify_end_to_end() {
        let c = classify("emploi étudiants semaine 14", false);
        assert_eq!(c.language, Language::Fr);
        assert_eq!(c.intent, Intent::Schedule);

        let c = classify("Bonjour, je suis stressé", false);
        assert_eq!(c.language, Language::Fr);
        assert_eq!(c.intent, Intent::Conversation);
    }
}
