//! Document responder: Q&A and summaries over uploaded documents.

use super::{push_source, BudgetTracker, GatherOutcome};
use crate::messages;
use crate::types::Language;
use campusbot_extract::EvidenceUnit;
use campusbot_retrieval::DocumentStore;

/// Chunks offered to synthesis per question.
const SEARCH_TOP_K: usize = 5;

/// Phrasings that ask for a summary or the document list.
const SUMMARY_KEYWORDS: &[&str] = &[
    "résumé",
    "résumer",
    "resume",
    "resumer",
    "summary",
    "summarize",
    "liste des documents",
    "list documents",
    "quels documents",
    "which documents",
];

pub(crate) fn gather(
    docs: &DocumentStore,
    question: &str,
    language: Language,
    tracker: &mut BudgetTracker,
) -> GatherOutcome {
    if !docs.has_documents() {
        return GatherOutcome::report(messages::no_documents(language), Vec::new());
    }

    let lower = question.to_lowercase();
    let wants_summary = SUMMARY_KEYWORDS.iter().any(|kw| lower.contains(kw));

    if !tracker.try_spend() {
        return GatherOutcome::empty();
    }

    if wants_summary {
        return summarize(docs, language);
    }

    match docs.search(question, SEARCH_TOP_K) {
        Ok(hits) if !hits.is_empty() => {
            let mut evidence = Vec::new();
            let mut sources = Vec::new();

            for hit in hits {
                push_source(&mut sources, hit.filename.clone());
                evidence.push(EvidenceUnit {
                    source: hit.filename,
                    excerpt: hit.text,
                    score: hit.score.clamp(0.0, 1.0),
                    section: Some(format!("section {}", hit.position + 1)),
                });
            }

            GatherOutcome {
                evidence,
                sources,
                report: None,
            }
        }
        Ok(_) => GatherOutcome::report(messages::no_evidence(language), Vec::new()),
        Err(e) => {
            tracing::warn!("Document search failed: {}", e);
            GatherOutcome::report(messages::no_evidence(language), Vec::new())
        }
    }
}

fn summarize(docs: &DocumentStore, language: Language) -> GatherOutcome {
    match docs.summaries() {
        Ok(summaries) if !summaries.is_empty() => {
            let mut evidence = Vec::new();
            let mut sources = Vec::new();

            for doc in summaries {
                push_source(&mut sources, doc.filename.clone());
                evidence.push(EvidenceUnit {
                    source: doc.filename.clone(),
                    excerpt: format!(
                        "{} sections, {} caractères, ajouté le {}.\nDébut du document :\n{}",
                        doc.chunk_count, doc.char_count, doc.ingested_at, doc.preview
                    ),
                    score: 1.0,
                    section: None,
                });
            }

            GatherOutcome {
                evidence,
                sources,
                report: None,
            }
        }
        Ok(_) => GatherOutcome::report(messages::no_documents(language), Vec::new()),
        Err(e) => {
            tracing::warn!("Document summaries failed: {}", e);
            GatherOutcome::report(messages::no_documents(language), Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Budget, Intent};

    fn tracker() -> BudgetTracker {
        BudgetTracker::new(Budget::for_intent(Intent::Document))
    }

    #[test]
    fn test_empty_store_reports_no_documents() {
        let docs = DocumentStore::open_in_memory().unwrap();
        let outcome = gather(&docs, "résumé du fichier", Language::Fr, &mut tracker());

        assert!(outcome.report.is_some());
        assert!(outcome.evidence.is_empty());
    }

    #[test]
    fn test_question_over_document() {
        let docs = DocumentStore::open_in_memory().unwrap();
        docs.add_document(
            "reglement.txt",
            "Les absences doivent être justifiées sous 48 heures auprès du \
             département. Trois absences non justifiées entraînent un avertissement.",
        )
        .unwrap();

        let mut t = tracker();
        let outcome = gather(&docs, "que se passe-t-il pour les absences ?", Language::Fr, &mut t);

        assert!(outcome.report.is_none());
        assert!(!outcome.evidence.is_empty());
        assert_eq!(outcome.sources, vec!["reglement.txt"]);
        assert_eq!(t.used(), 1);
    }

    #[test]
    fn test_summary_request() {
        let docs = DocumentStore::open_in_memory().unwrap();
        docs.add_document("cours.txt", "Chapitre 1 : les bases de la mécanique des sols.")
            .unwrap();

        let outcome = gather(&docs, "fais un résumé du document", Language::Fr, &mut tracker());

        assert!(outcome.report.is_none());
        assert_eq!(outcome.evidence.len(), 1);
        assert!(outcome.evidence[0].excerpt.contains("sections"));
        assert!(outcome.evidence[0].excerpt.contains("mécanique"));
    }
}
