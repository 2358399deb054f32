//! Answer synthesis.
//!
//! Builds the per-responder prompt (persona, gathered evidence, recent
//! turns, language instruction) and performs the single LLM completion
//! for the turn. Informational responders run at a low temperature so the
//! model sticks to the evidence; conversation runs warmer.

use crate::types::{Intent, Language};
use campusbot_core::{AppError, AppResult};
use campusbot_extract::EvidenceUnit;
use campusbot_llm::{LlmClient, LlmRequest};
use handlebars::Handlebars;
use std::sync::Arc;

/// Max tokens requested per completion.
const MAX_ANSWER_TOKENS: u32 = 1000;

/// Temperature for evidence-grounded answers.
const FACTUAL_TEMPERATURE: f32 = 0.3;

/// Temperature for small talk.
const CONVERSATIONAL_TEMPERATURE: f32 = 0.7;

const USER_PROMPT_TEMPLATE: &str = "\
Question de l'étudiant :
{{{question}}}
{{#if history}}

Échanges récents :
{{{history}}}
{{/if}}
{{#if evidence}}

Informations rassemblées depuis les sources :
{{{evidence}}}
{{/if}}";

/// Everything the synthesizer needs for one turn.
pub struct SynthesisRequest<'a> {
    pub question: &'a str,
    pub intent: Intent,
    pub language: Language,
    pub evidence: &'a [EvidenceUnit],
    pub history: &'a [(String, String)],
}

/// Wraps the LLM client with prompt assembly.
pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
    model: String,
    registry: Handlebars<'static>,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>) -> AppResult<Self> {
        let mut registry = Handlebars::new();
        registry
            .register_template_string("user_prompt", USER_PROMPT_TEMPLATE)
            .map_err(|e| AppError::Other(format!("Invalid prompt template: {}", e)))?;

        Ok(Self {
            llm,
            model: model.into(),
            registry,
        })
    }

    /// Generate the answer text for one turn.
    pub async fn synthesize(&self, request: &SynthesisRequest<'_>) -> AppResult<String> {
        let data = serde_json::json!({
            "question": request.question,
            "history": render_history(request.history),
            "evidence": render_evidence(request.evidence),
        });

        let prompt = self
            .registry
            .render("user_prompt", &data)
            .map_err(|e| AppError::Other(format!("Prompt rendering failed: {}", e)))?;

        let temperature = match request.intent {
            Intent::Conversation => CONVERSATIONAL_TEMPERATURE,
            _ => FACTUAL_TEMPERATURE,
        };

        let llm_request = LlmRequest::new(prompt, self.model.clone())
            .with_system(system_prompt(request.intent, request.language, request.evidence))
            .with_temperature(temperature)
            .with_max_tokens(MAX_ANSWER_TOKENS);

        let response = self.llm.complete(&llm_request).await?;
        Ok(response.content)
    }
}

/// Persona and ground rules per responder, plus the language instruction.
fn system_prompt(intent: Intent, language: Language, evidence: &[EvidenceUnit]) -> String {
    let persona = match intent {
        Intent::Schedule => {
            "Tu es l'assistant emplois du temps d'une école d'ingénieurs. \
             Tu restitues fidèlement les horaires extraits, groupe par groupe, \
             sans les reformuler ni en inventer."
        }
        Intent::Internship | Intent::Unknown => {
            "Tu es l'assistant stages et procédures d'une école d'ingénieurs. \
             Tu réponds précisément aux questions sur les stages, programmes \
             et démarches administratives."
        }
        Intent::Document => {
            "Tu es l'assistant documents : tu réponds uniquement à partir du \
             contenu des fichiers ajoutés par l'étudiant."
        }
        Intent::Conversation => {
            "Tu es un assistant bienveillant pour les étudiants d'une école \
             d'ingénieurs. Tu discutes simplement, tu encourages et tu \
             rassures sans jargon."
        }
    };

    let mut prompt = String::from(persona);
    prompt.push_str(
        "\n\nRègles :\n\
         - Appuie-toi uniquement sur les informations fournies ; n'invente \
         jamais de source ni de lien.\n\
         - Ne mentionne pas de mécanique interne (sources numérotées, \
         extraits, outils).\n\
         - Si les informations ne suffisent pas, dis-le clairement.\n",
    );

    if evidence.is_empty() && !matches!(intent, Intent::Conversation) {
        prompt.push_str(
            "\nAucune source n'a pu être consultée pour cette question : \
             réponds prudemment et dis ce qui manque.\n",
        );
    }

    prompt.push('\n');
    prompt.push_str(language.instruction());
    prompt
}

fn render_history(history: &[(String, String)]) -> String {
    history
        .iter()
        .map(|(user, agent)| format!("Étudiant : {}\nAssistant : {}", user, agent))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_evidence(evidence: &[EvidenceUnit]) -> String {
    evidence
        .iter()
        .enumerate()
        .map(|(i, unit)| {
            let section = unit
                .section
                .as_deref()
                .map(|s| format!(" — {}", s))
                .unwrap_or_default();
            format!("[Source {}] {}{}\n{}", i + 1, unit.source, section, unit.excerpt)
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(source: &str, excerpt: &str) -> EvidenceUnit {
        EvidenceUnit {
            source: source.to_string(),
            excerpt: excerpt.to_string(),
            score: 0.9,
            section: None,
        }
    }

    #[test]
    fn test_render_evidence_numbers_sources() {
        let evidence = vec![
            unit("https://a.test", "Premier extrait."),
            unit("https://b.test", "Second extrait."),
        ];

        let rendered = render_evidence(&evidence);
        assert!(rendered.contains("[Source 1] https://a.test"));
        assert!(rendered.contains("[Source 2] https://b.test"));
        assert!(rendered.contains("---"));
    }

    #[test]
    fn test_render_history() {
        let history = vec![("bonjour".to_string(), "salut !".to_string())];
        let rendered = render_history(&history);
        assert!(rendered.contains("Étudiant : bonjour"));
        assert!(rendered.contains("Assistant : salut !"));
    }

    #[test]
    fn test_system_prompt_carries_language_instruction() {
        let prompt = system_prompt(Intent::Internship, Language::En, &[]);
        assert!(prompt.contains("Answer in English."));
        assert!(prompt.contains("n'invente"));
        // Empty evidence triggers the caution note for informational intents
        assert!(prompt.contains("prudemment"));
    }

    #[test]
    fn test_conversation_prompt_has_no_caution_note() {
        let prompt = system_prompt(Intent::Conversation, Language::Fr, &[]);
        assert!(!prompt.contains("prudemment"));
    }

    #[test]
    fn test_prompt_template_renders() {
        let mut registry = Handlebars::new();
        registry
            .register_template_string("user_prompt", USER_PROMPT_TEMPLATE)
            .unwrap();

        let rendered = registry
            .render(
                "user_prompt",
                &serde_json::json!({
                    "question": "quels sont les programmes ?",
                    "history": "",
                    "evidence": "[Source 1] https://a.test\nExtrait.",
                }),
            )
            .unwrap();

        assert!(rendered.contains("quels sont les programmes ?"));
        assert!(rendered.contains("[Source 1]"));
        // Empty history section is omitted entirely
        assert!(!rendered.contains("Échanges récents"));
    }
}
