//! Evidence and extraction result types.

use serde::{Deserialize, Serialize};

/// A scored excerpt of source text used to ground an answer.
///
/// Produced by the extractor or from retrieval snippets, consumed once
/// during answer assembly, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceUnit {
    /// Source URL or document name
    pub source: String,

    /// The excerpt itself
    pub excerpt: String,

    /// Relevance in [0, 1]
    pub score: f32,

    /// Optional page/section reference (e.g., a group tag, "page 3")
    pub section: Option<String>,
}

/// Result of extracting a web page (or its best internal page).
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Cleaned text of the best-matching page
    pub text: String,

    /// URL the text came from (root page or an internal page)
    pub source_url: String,

    /// Lexical match score against the keywords, 0–100
    pub score: u32,

    /// PDF links discovered along the way
    pub pdf_links: Vec<String>,
}

/// Whose timetable a schedule page describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Students,
    Instructors,
}

/// One page of a schedule PDF — one academic group's timetable.
#[derive(Debug, Clone)]
pub struct SchedulePage {
    /// 1-based page number
    pub page_no: u32,

    /// Group tag found in the page header (e.g., "GCR2A")
    pub group: Option<String>,

    /// Cleaned page text
    pub body: String,
}

/// Outcome of a schedule extraction.
///
/// A missing week is a reportable value, not an error: the responder
/// relays it to the user together with the weeks that do exist.
#[derive(Debug, Clone)]
pub enum ScheduleExtract {
    /// The timetable for one week, one page per group
    Week {
        /// Week number, when the source labels one
        week: Option<u32>,
        /// Direct link to the PDF
        pdf_url: String,
        /// The week's HTML page, when one exists
        page_url: Option<String>,
        pages: Vec<SchedulePage>,
    },

    /// The requested week has no published timetable
    WeekNotFound {
        requested: u32,
        /// Weeks that were found, newest first
        available: Vec<u32>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evidence_unit_serializes() {
        let unit = EvidenceUnit {
            source: "https://example.test/stages".to_string(),
            excerpt: "Les candidatures ouvrent en janvier.".to_string(),
            score: 0.8,
            section: None,
        };

        let json = serde_json::to_string(&unit).unwrap();
        assert!(json.contains("stages"));
    }
}
