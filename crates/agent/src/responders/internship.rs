//! Internship/procedure responder — also the fallback route for
//! unclassified questions.
//!
//! Retrieval first; empty results are reported as "no source found",
//! never papered over. Otherwise the top hits' snippets become baseline
//! evidence and the best pages are extracted, with long extractions
//! re-ranked down to their most relevant excerpts.

use super::{push_source, BudgetTracker, GatherOutcome};
use crate::messages;
use crate::types::Language;
use campusbot_extract::{semantic_search, EvidenceUnit, WebSource};
use campusbot_retrieval::RetrievalClient;

/// Hits considered per question.
const MAX_HITS: usize = 3;

/// Extractions shorter than this add nothing over the snippet.
const MIN_EXTRACT_LEN: usize = 300;

/// Extractions longer than this are re-ranked to excerpts.
const RERANK_THRESHOLD: usize = 1500;

/// Excerpts kept per re-ranked extraction.
const RERANK_TOP_K: usize = 3;

/// Stop gathering once this much evidence is assembled.
const MAX_EVIDENCE: usize = 5;

/// Extraction score that ends the hit loop early.
const GOOD_EXTRACTION_SCORE: u32 = 60;

pub(crate) async fn gather(
    retrieval: &dyn RetrievalClient,
    web: &dyn WebSource,
    question: &str,
    language: Language,
    tracker: &mut BudgetTracker,
) -> GatherOutcome {
    if !tracker.try_spend() {
        return GatherOutcome::empty();
    }

    let hits = match retrieval.search(question).await {
        Ok(hits) => hits,
        Err(e) => {
            tracing::warn!("Retrieval failed: {}", e);
            return GatherOutcome::report(messages::no_evidence(language), Vec::new());
        }
    };

    if hits.is_empty() {
        tracing::info!("No relevant source for question");
        return GatherOutcome::report(messages::no_evidence(language), Vec::new());
    }

    let mut evidence: Vec<EvidenceUnit> = Vec::new();
    let mut sources: Vec<String> = Vec::new();

    // Snippets are the baseline evidence even if extraction fails later
    for hit in hits.iter().take(MAX_HITS) {
        push_source(&mut sources, hit.url.clone());
        if !hit.snippet.is_empty() {
            evidence.push(EvidenceUnit {
                source: hit.url.clone(),
                excerpt: hit.snippet.clone(),
                score: hit.score.clamp(0.0, 1.0),
                section: None,
            });
        }
    }

    let keywords = extraction_keywords(question);

    for hit in hits.iter().take(MAX_HITS) {
        if evidence.len() >= MAX_EVIDENCE || hit.url.is_empty() {
            break;
        }
        if !tracker.try_spend() {
            break;
        }

        let extraction = match web.extract(&hit.url, &keywords).await {
            Ok(extraction) => extraction,
            Err(e) => {
                tracing::warn!("Extraction failed for {}: {}", hit.url, e);
                continue;
            }
        };

        if extraction.text.len() < MIN_EXTRACT_LEN {
            continue;
        }

        push_source(&mut sources, extraction.source_url.clone());
        for pdf in extraction.pdf_links.iter().take(2) {
            push_source(&mut sources, pdf.clone());
        }

        if extraction.text.len() > RERANK_THRESHOLD && tracker.try_spend() {
            let excerpts = semantic_search(&extraction.text, question, RERANK_TOP_K);
            if excerpts.is_empty() {
                evidence.push(whole_page_unit(&extraction.source_url, &extraction.text));
            } else {
                for excerpt in excerpts {
                    evidence.push(EvidenceUnit {
                        source: extraction.source_url.clone(),
                        excerpt: excerpt.text,
                        score: excerpt.score,
                        section: None,
                    });
                }
            }
        } else {
            evidence.push(whole_page_unit(&extraction.source_url, &extraction.text));
        }

        if extraction.score >= GOOD_EXTRACTION_SCORE {
            break;
        }
    }

    GatherOutcome {
        evidence,
        sources,
        report: None,
    }
}

fn whole_page_unit(source_url: &str, text: &str) -> EvidenceUnit {
    const MAX_WHOLE_PAGE: usize = 3000;

    let excerpt = if text.len() <= MAX_WHOLE_PAGE {
        text.to_string()
    } else {
        let mut end = MAX_WHOLE_PAGE;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &text[..end])
    };

    EvidenceUnit {
        source: source_url.to_string(),
        excerpt,
        score: 0.5,
        section: None,
    }
}

/// Significant question words used to steer page traversal.
fn extraction_keywords(question: &str) -> String {
    question
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() > 3)
        .take(6)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_keywords_keep_significant_words() {
        let keywords = extraction_keywords("quels sont les programmes de Mitacs ?");
        assert!(keywords.contains("programmes"));
        assert!(keywords.contains("Mitacs"));
        assert!(!keywords.contains("les"));
    }

    #[test]
    fn test_whole_page_unit_truncates() {
        let text = "é".repeat(4000);
        let unit = whole_page_unit("https://a.test", &text);
        assert!(unit.excerpt.ends_with("..."));
        assert!(unit.excerpt.len() <= 3010);
    }
}
