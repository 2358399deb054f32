//! Responder dispatcher — the per-turn state machine.
//!
//! Every turn walks the same phases:
//! `Classified → EvidenceGathering → AnswerSynthesis → Cleaned → Delivered`.
//! Conversation skips evidence gathering entirely. Reportable outcomes
//! (no source, week not published, no documents) bypass synthesis so that
//! nothing is ever invented. All domain failures are absorbed here and
//! rendered as user-facing messages; `process` only fails on session
//! infrastructure errors.

use crate::classify::{self, Classification};
use crate::clean::{clean_response, is_too_short};
use crate::context;
use crate::memory::SessionMemory;
use crate::messages;
use crate::responders::{self, BudgetTracker, GatherOutcome};
use crate::synthesis::{SynthesisRequest, Synthesizer};
use crate::types::{Budget, Intent, Language, Query, ResponderResult, Turn};
use campusbot_core::AppResult;
use campusbot_extract::{ScheduleSource, WebSource};
use campusbot_llm::LlmClient;
use campusbot_retrieval::{DocumentStore, RetrievalClient};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

/// Phases of one turn, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnPhase {
    Classified,
    EvidenceGathering,
    AnswerSynthesis,
    Cleaned,
    Delivered,
}

/// Routes classified questions through their responder pipeline.
///
/// Holds only shared immutable collaborators, so independent sessions can
/// call `process` concurrently — each with its own [`SessionMemory`].
pub struct Dispatcher {
    retrieval: Arc<dyn RetrievalClient>,
    documents: Arc<DocumentStore>,
    web: Arc<dyn WebSource>,
    schedule: Arc<dyn ScheduleSource>,
    synthesizer: Synthesizer,
    schedule_url: String,
}

impl Dispatcher {
    pub fn new(
        retrieval: Arc<dyn RetrievalClient>,
        documents: Arc<DocumentStore>,
        web: Arc<dyn WebSource>,
        schedule: Arc<dyn ScheduleSource>,
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        schedule_url: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            retrieval,
            documents,
            web,
            schedule,
            synthesizer: Synthesizer::new(llm, model)?,
            schedule_url: schedule_url.into(),
        })
    }

    /// Process one user message end to end and record the turn in the
    /// session.
    pub async fn process(
        &self,
        question: &str,
        session: &mut SessionMemory,
    ) -> AppResult<ResponderResult> {
        let started = Instant::now();

        let enriched = context::enrich(question, session);
        let Classification { language, intent } =
            classify::classify(&enriched, self.documents.has_documents());

        let query = Query {
            raw_text: question.to_string(),
            language,
            intent,
        };

        tracing::info!(
            language = language.code(),
            intent = intent.label(),
            "phase: {:?}",
            TurnPhase::Classified
        );

        let mut tracker = BudgetTracker::new(Budget::for_intent(intent));
        let history = session.history_pairs();

        let outcome = if intent == Intent::Conversation {
            // No tools for small talk: straight to synthesis
            GatherOutcome::empty()
        } else {
            tracing::debug!("phase: {:?}", TurnPhase::EvidenceGathering);
            match intent {
                Intent::Schedule => {
                    responders::schedule::gather(
                        self.retrieval.as_ref(),
                        self.schedule.as_ref(),
                        &self.schedule_url,
                        &enriched,
                        language,
                        &mut tracker,
                    )
                    .await
                }
                Intent::Document => responders::document::gather(
                    &self.documents,
                    &enriched,
                    language,
                    &mut tracker,
                ),
                Intent::Internship | Intent::Unknown | Intent::Conversation => {
                    responders::internship::gather(
                        self.retrieval.as_ref(),
                        self.web.as_ref(),
                        &enriched,
                        language,
                        &mut tracker,
                    )
                    .await
                }
            }
        };

        let (answer, degraded) = match outcome.report {
            Some(report) => (report, false),
            None => {
                tracing::debug!("phase: {:?}", TurnPhase::AnswerSynthesis);
                let request = SynthesisRequest {
                    question: &enriched,
                    intent,
                    language,
                    evidence: &outcome.evidence,
                    history: &history,
                };
                self.synthesize_and_clean(&request, language).await
            }
        };

        let result = ResponderResult {
            answer,
            sources: outcome.sources,
            iterations: tracker.used(),
            elapsed: started.elapsed(),
            degraded,
        };

        tracing::debug!("phase: {:?}", TurnPhase::Delivered);
        session.remember(Turn {
            query,
            result: result.clone(),
            at: Utc::now(),
        })?;

        Ok(result)
    }

    /// Synthesize and clean; retry once when the cleaned answer is below
    /// the quality threshold, then degrade with a notice instead of
    /// failing the turn.
    async fn synthesize_and_clean(
        &self,
        request: &SynthesisRequest<'_>,
        language: Language,
    ) -> (String, bool) {
        let first = match self.synthesizer.synthesize(request).await {
            Ok(raw) => clean_response(&raw),
            Err(e) => {
                tracing::error!("Synthesis failed: {}", e);
                String::new()
            }
        };
        tracing::debug!("phase: {:?}", TurnPhase::Cleaned);

        if !is_too_short(&first) {
            return (first, false);
        }

        tracing::info!("Answer below threshold, retrying synthesis once");
        let second = match self.synthesizer.synthesize(request).await {
            Ok(raw) => clean_response(&raw),
            Err(e) => {
                tracing::error!("Synthesis retry failed: {}", e);
                String::new()
            }
        };

        if !is_too_short(&second) {
            return (second, false);
        }

        let best = if second.len() >= first.len() { second } else { first };
        let mut answer = messages::degraded_notice(language).to_string();
        if !best.is_empty() {
            answer.push('\n');
            answer.push_str(&best);
        }
        (answer, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campusbot_core::AppResult;
    use campusbot_extract::{
        Audience, Extraction, ScheduleExtract, SchedulePage,
    };
    use campusbot_llm::{LlmRequest, LlmResponse, LlmUsage};
    use campusbot_retrieval::{HitMetadata, RetrievalHit};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct MockLlm {
        default: String,
        queued: Mutex<VecDeque<String>>,
        calls: AtomicU32,
    }

    impl MockLlm {
        fn answering(default: &str) -> Arc<Self> {
            Arc::new(Self {
                default: default.to_string(),
                queued: Mutex::new(VecDeque::new()),
                calls: AtomicU32::new(0),
            })
        }

        fn queued(responses: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                default: String::new(),
                queued: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for MockLlm {
        fn provider_name(&self) -> &str {
            "mock"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let content = self
                .queued
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.default.clone());
            Ok(LlmResponse {
                content,
                model: request.model.clone(),
                usage: LlmUsage::default(),
            })
        }
    }

    struct MockRetrieval {
        hits: Vec<RetrievalHit>,
        calls: AtomicU32,
    }

    impl MockRetrieval {
        fn with_hits(hits: Vec<RetrievalHit>) -> Arc<Self> {
            Arc::new(Self {
                hits,
                calls: AtomicU32::new(0),
            })
        }

        fn empty() -> Arc<Self> {
            Self::with_hits(vec![])
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl RetrievalClient for MockRetrieval {
        async fn search(&self, _question: &str) -> AppResult<Vec<RetrievalHit>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.hits.clone())
        }

        async fn index(&self, _content: &str, _metadata: HitMetadata) -> AppResult<()> {
            Ok(())
        }
    }

    struct MockWeb {
        text: String,
        calls: AtomicU32,
    }

    impl MockWeb {
        fn returning(text: &str) -> Arc<Self> {
            Arc::new(Self {
                text: text.to_string(),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl WebSource for MockWeb {
        async fn extract(&self, url: &str, _keywords: &str) -> AppResult<Extraction> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Extraction {
                text: self.text.clone(),
                source_url: url.to_string(),
                score: 50,
                pdf_links: vec![],
            })
        }
    }

    struct MockSchedule {
        calls: AtomicU32,
        last_week: Mutex<Option<Option<u32>>>,
        last_audience: Mutex<Option<Audience>>,
    }

    impl MockSchedule {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                last_week: Mutex::new(None),
                last_audience: Mutex::new(None),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl ScheduleSource for MockSchedule {
        async fn extract_pdf_schedule(
            &self,
            _url: &str,
            week: Option<u32>,
            audience: Audience,
        ) -> AppResult<ScheduleExtract> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_week.lock().unwrap() = Some(week);
            *self.last_audience.lock().unwrap() = Some(audience);

            if week == Some(14) || week.is_none() {
                Ok(ScheduleExtract::Week {
                    week: Some(14),
                    pdf_url: "https://enigplus.test/files/emploi-semaine-14.pdf".to_string(),
                    page_url: Some("https://enigplus.test/edt/semaine-14/".to_string()),
                    pages: vec![
                        SchedulePage {
                            page_no: 1,
                            group: Some("GCR1A".to_string()),
                            body: "Lundi\n- 08:15 - 09:45 : Analyse (Salle A8)".to_string(),
                        },
                        SchedulePage {
                            page_no: 2,
                            group: Some("GCR2B".to_string()),
                            body: "Lundi\n- 10:00 - 11:30 : Hydraulique (Amphi 2)".to_string(),
                        },
                    ],
                })
            } else {
                Ok(ScheduleExtract::WeekNotFound {
                    requested: week.unwrap_or(0),
                    available: vec![14, 13],
                })
            }
        }
    }

    fn hit(url: &str, snippet: &str, score: f32) -> RetrievalHit {
        RetrievalHit {
            url: url.to_string(),
            title: String::new(),
            snippet: snippet.to_string(),
            score,
        }
    }

    fn dispatcher(
        llm: &Arc<MockLlm>,
        retrieval: &Arc<MockRetrieval>,
        web: &Arc<MockWeb>,
        schedule: &Arc<MockSchedule>,
        docs: Arc<DocumentStore>,
    ) -> Dispatcher {
        Dispatcher::new(
            Arc::clone(retrieval) as Arc<dyn RetrievalClient>,
            docs,
            Arc::clone(web) as Arc<dyn WebSource>,
            Arc::clone(schedule) as Arc<dyn ScheduleSource>,
            Arc::clone(llm) as Arc<dyn LlmClient>,
            "mock-model",
            "https://enigplus.test/emplois-du-temps/",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_conversation_uses_no_tools() {
        let llm = MockLlm::answering(
            "Je comprends, le stress avant les partiels est normal. Courage, ça va bien se passer !",
        );
        let retrieval = MockRetrieval::empty();
        let web = MockWeb::returning("");
        let schedule = MockSchedule::new();
        let d = dispatcher(
            &llm,
            &retrieval,
            &web,
            &schedule,
            Arc::new(DocumentStore::open_in_memory().unwrap()),
        );

        let mut session = SessionMemory::new();
        let result = d.process("Bonjour, je suis stressé", &mut session).await.unwrap();

        assert_eq!(retrieval.calls(), 0);
        assert_eq!(web.calls(), 0);
        assert_eq!(schedule.calls(), 0);
        assert_eq!(result.iterations, 0);
        assert!(result.sources.is_empty());
        assert!(!result.degraded);
        assert!(result.answer.contains("stress"));

        let turn = session.turns().next().unwrap();
        assert_eq!(turn.query.intent, Intent::Conversation);
        assert_eq!(turn.query.language, Language::Fr);
    }

    #[tokio::test]
    async fn test_schedule_week_14_end_to_end() {
        let llm = MockLlm::answering(
            "Emploi du temps semaine 14 :\nGCR1A : Lundi 08:15 Analyse (Salle A8)\nGCR2B : Lundi 10:00 Hydraulique (Amphi 2)",
        );
        let retrieval = MockRetrieval::with_hits(vec![hit(
            "https://enigplus.test/emplois-du-temps/",
            "Emplois du temps GCR",
            0.92,
        )]);
        let web = MockWeb::returning("");
        let schedule = MockSchedule::new();
        let d = dispatcher(
            &llm,
            &retrieval,
            &web,
            &schedule,
            Arc::new(DocumentStore::open_in_memory().unwrap()),
        );

        let mut session = SessionMemory::new();
        let result = d
            .process("emploi étudiants semaine 14", &mut session)
            .await
            .unwrap();

        // (fr, schedule) classification
        let turn = session.turns().next().unwrap();
        assert_eq!(turn.query.intent, Intent::Schedule);
        assert_eq!(turn.query.language, Language::Fr);

        // The extractor was asked for week 14, students
        assert_eq!(*schedule.last_week.lock().unwrap(), Some(Some(14)));
        assert_eq!(*schedule.last_audience.lock().unwrap(), Some(Audience::Students));

        // Per-group timetable answer with the PDF link as a source
        assert!(result.answer.contains("GCR1A"));
        assert!(result
            .sources
            .iter()
            .any(|s| s.ends_with("emploi-semaine-14.pdf")));
        assert_eq!(result.iterations, 2);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_week_not_found_is_reported_without_llm() {
        let llm = MockLlm::answering("ne devrait pas être appelé");
        let retrieval = MockRetrieval::with_hits(vec![hit(
            "https://enigplus.test/emplois-du-temps/",
            "",
            0.9,
        )]);
        let web = MockWeb::returning("");
        let schedule = MockSchedule::new();
        let d = dispatcher(
            &llm,
            &retrieval,
            &web,
            &schedule,
            Arc::new(DocumentStore::open_in_memory().unwrap()),
        );

        let mut session = SessionMemory::new();
        let result = d.process("emploi semaine 99", &mut session).await.unwrap();

        assert_eq!(llm.calls(), 0);
        assert!(result.answer.contains("99"));
        assert!(result.answer.contains("14"));
        assert!(!result.degraded);
        assert_eq!(result.sources, vec!["https://enigplus.test/emplois-du-temps/"]);
    }

    #[tokio::test]
    async fn test_empty_retrieval_reports_no_evidence() {
        let llm = MockLlm::answering("ne devrait pas être appelé");
        let retrieval = MockRetrieval::empty();
        let web = MockWeb::returning("");
        let schedule = MockSchedule::new();
        let d = dispatcher(
            &llm,
            &retrieval,
            &web,
            &schedule,
            Arc::new(DocumentStore::open_in_memory().unwrap()),
        );

        let mut session = SessionMemory::new();
        let result = d
            .process("quels sont les programmes de Mitacs ?", &mut session)
            .await
            .unwrap();

        // No source: reported, never invented, no model call
        assert_eq!(llm.calls(), 0);
        assert_eq!(web.calls(), 0);
        assert!(result.sources.is_empty());
        assert!(result.answer.contains("aucune source"));
        assert_eq!(result.iterations, 1);
    }

    #[tokio::test]
    async fn test_internship_stays_within_budget() {
        let llm = MockLlm::answering("Voici ce que j'ai trouvé sur les stages Mitacs.");
        let hits: Vec<RetrievalHit> = (0..10)
            .map(|i| {
                hit(
                    &format!("https://mitacs.test/page-{}", i),
                    "Mitacs finance des stages de recherche.",
                    0.9 - i as f32 * 0.05,
                )
            })
            .collect();
        let retrieval = MockRetrieval::with_hits(hits);
        // Extractions too short to be useful: the loop keeps trying
        let web = MockWeb::returning("Page vide.");
        let schedule = MockSchedule::new();
        let d = dispatcher(
            &llm,
            &retrieval,
            &web,
            &schedule,
            Arc::new(DocumentStore::open_in_memory().unwrap()),
        );

        let mut session = SessionMemory::new();
        let result = d
            .process("je cherche un stage de recherche Mitacs", &mut session)
            .await
            .unwrap();

        let tool_calls = retrieval.calls() + web.calls() + schedule.calls();
        assert!(tool_calls <= 8, "tool calls: {}", tool_calls);
        assert!(result.iterations <= 8);
        assert_eq!(llm.calls(), 1);
        // Snippets still ground the answer
        assert!(!result.sources.is_empty());
    }

    #[tokio::test]
    async fn test_short_synthesis_retries_then_degrades() {
        let llm = MockLlm::queued(&["", "ok"]);
        let retrieval = MockRetrieval::empty();
        let web = MockWeb::returning("");
        let schedule = MockSchedule::new();
        let d = dispatcher(
            &llm,
            &retrieval,
            &web,
            &schedule,
            Arc::new(DocumentStore::open_in_memory().unwrap()),
        );

        let mut session = SessionMemory::new();
        let result = d.process("Bonjour !", &mut session).await.unwrap();

        assert_eq!(llm.calls(), 2);
        assert!(result.degraded);
        assert!(result.answer.contains("Réponse partielle"));
    }

    #[tokio::test]
    async fn test_document_question_routes_to_docstore() {
        let docs = DocumentStore::open_in_memory().unwrap();
        docs.add_document(
            "reglement.txt",
            "Les absences doivent être justifiées sous 48 heures auprès du département.",
        )
        .unwrap();

        let llm = MockLlm::answering(
            "D'après le règlement, les absences doivent être justifiées sous 48 heures.",
        );
        let retrieval = MockRetrieval::empty();
        let web = MockWeb::returning("");
        let schedule = MockSchedule::new();
        let d = dispatcher(&llm, &retrieval, &web, &schedule, Arc::new(docs));

        let mut session = SessionMemory::new();
        let result = d
            .process("que dit le fichier sur les absences justifiées ?", &mut session)
            .await
            .unwrap();

        let turn = session.turns().next().unwrap();
        assert_eq!(turn.query.intent, Intent::Document);
        assert_eq!(result.sources, vec!["reglement.txt"]);
        assert_eq!(llm.calls(), 1);
        assert_eq!(retrieval.calls(), 0);
    }
}
