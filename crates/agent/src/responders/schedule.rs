//! Schedule responder: week/audience parsing and timetable gathering.

use super::{push_source, BudgetTracker, GatherOutcome};
use crate::messages;
use crate::types::Language;
use campusbot_extract::{Audience, EvidenceUnit, ScheduleExtract, ScheduleSource};
use campusbot_retrieval::RetrievalClient;
use regex::Regex;
use std::sync::OnceLock;

/// Per-page excerpt length offered to synthesis.
const MAX_PAGE_EXCERPT: usize = 2000;

fn week_capture_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:semaine|week)\s*-?\s*(\d+)").unwrap())
}

/// Week number named in the question, if any.
pub(crate) fn parse_week(question: &str) -> Option<u32> {
    week_capture_re()
        .captures(&question.to_lowercase())
        .and_then(|caps| caps[1].parse().ok())
}

/// Instructor timetables only when the question names them.
pub(crate) fn parse_audience(question: &str) -> Audience {
    let lower = question.to_lowercase();
    if lower.contains("enseignant") || lower.contains("prof") || lower.contains("teacher") {
        Audience::Instructors
    } else {
        Audience::Students
    }
}

/// Gather timetable evidence: locate the schedule index via retrieval
/// (falling back to the configured URL), then extract the requested
/// week's PDF page by page.
pub(crate) async fn gather(
    retrieval: &dyn RetrievalClient,
    schedule: &dyn ScheduleSource,
    default_index_url: &str,
    question: &str,
    language: Language,
    tracker: &mut BudgetTracker,
) -> GatherOutcome {
    let week = parse_week(question);
    let audience = parse_audience(question);

    let mut index_url = default_index_url.to_string();

    if tracker.try_spend() {
        match retrieval.search(question).await {
            Ok(hits) => {
                let schedule_hit = hits
                    .iter()
                    .find(|hit| looks_like_schedule_url(&hit.url))
                    .or_else(|| hits.first());
                if let Some(hit) = schedule_hit {
                    if !hit.url.is_empty() {
                        index_url = hit.url.clone();
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Retrieval unavailable, using configured schedule URL: {}", e);
            }
        }
    }

    if !tracker.try_spend() {
        return GatherOutcome::empty();
    }

    match schedule.extract_pdf_schedule(&index_url, week, audience).await {
        Ok(ScheduleExtract::Week {
            week,
            pdf_url,
            page_url,
            pages,
        }) => {
            let evidence: Vec<EvidenceUnit> = pages
                .into_iter()
                .map(|page| {
                    let section = page
                        .group
                        .clone()
                        .unwrap_or_else(|| format!("page {}", page.page_no));
                    EvidenceUnit {
                        source: pdf_url.clone(),
                        excerpt: truncate(&page.body, MAX_PAGE_EXCERPT),
                        score: 1.0,
                        section: Some(section),
                    }
                })
                .collect();

            tracing::info!(
                "Schedule gathered: week {:?}, {} group pages",
                week,
                evidence.len()
            );

            let mut sources = Vec::new();
            if let Some(page_url) = page_url {
                push_source(&mut sources, page_url);
            }
            push_source(&mut sources, pdf_url);

            GatherOutcome {
                evidence,
                sources,
                report: None,
            }
        }

        Ok(ScheduleExtract::WeekNotFound {
            requested,
            available,
        }) => GatherOutcome::report(
            messages::week_not_found(language, requested, &available),
            vec![index_url],
        ),

        Err(e) => {
            tracing::warn!("Schedule extraction failed: {}", e);
            GatherOutcome::report(messages::extraction_failed(language), vec![index_url])
        }
    }
}

fn looks_like_schedule_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.contains("emploi") || lower.contains("edt") || lower.contains("schedule")
}

fn truncate(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
