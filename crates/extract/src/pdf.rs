//! Weekly schedule extraction from PDF timetables.
//!
//! Schedule sites publish one page per week, each linking a PDF where one
//! PDF page holds one academic group's timetable. The extractor scans the
//! index page for week links (filtered by audience: student pages vs
//! instructor pages), resolves the requested week's PDF, and extracts its
//! pages with lopdf.
//!
//! A requested week with no published timetable is a reportable value
//! ([`ScheduleExtract::WeekNotFound`]), not an error.

use crate::types::{Audience, ScheduleExtract, SchedulePage};
use campusbot_core::{AppError, AppResult};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

/// Pause before the single retry of a failed download.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Pages whose extracted text is shorter than this are likely scans.
const MIN_PAGE_TEXT: usize = 20;

fn week_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:semaine|week)[-\s]?(\d+)").unwrap())
}

fn group_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"GCR\d[AB]?").unwrap())
}

/// Week links discovered on a schedule index page.
#[derive(Debug, Default)]
struct WeekLinks {
    /// (week number, HTML page URL)
    pages: Vec<(u32, String)>,
    /// (week number, PDF URL)
    pdfs: Vec<(u32, String)>,
}

/// Contract for schedule evidence gathering, implemented by
/// [`ScheduleExtractor`] and by stand-ins in dispatcher tests.
#[async_trait::async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Extract the timetable published at `url` for the given week.
    /// `week = None` selects the most recent week available.
    async fn extract_pdf_schedule(
        &self,
        url: &str,
        week: Option<u32>,
        audience: Audience,
    ) -> AppResult<ScheduleExtract>;
}

/// HTTP + lopdf backed schedule extractor.
pub struct ScheduleExtractor {
    client: reqwest::Client,
}

impl ScheduleExtractor {
    pub fn new() -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("CampusBot/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::Extraction(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Download a resource, retrying once after a short backoff.
    async fn fetch_bytes(&self, url: &str) -> AppResult<Vec<u8>> {
        match self.try_fetch_bytes(url).await {
            Ok(bytes) => Ok(bytes),
            Err(first) => {
                tracing::warn!("Download failed for {}, retrying: {}", url, first);
                tokio::time::sleep(RETRY_BACKOFF).await;
                self.try_fetch_bytes(url).await
            }
        }
    }

    async fn try_fetch_bytes(&self, url: &str) -> AppResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Extraction(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(AppError::Extraction(format!(
                "{} returned status {}",
                url,
                response.status()
            )));
        }

        Ok(response
            .bytes()
            .await
            .map_err(|e| AppError::Extraction(format!("Failed to read {}: {}", url, e)))?
            .to_vec())
    }
}

#[async_trait::async_trait]
impl ScheduleSource for ScheduleExtractor {
    async fn extract_pdf_schedule(
        &self,
        url: &str,
        week: Option<u32>,
        audience: Audience,
    ) -> AppResult<ScheduleExtract> {
        tracing::info!("Schedule extraction: {} (week: {:?})", url, week);

        let bytes = self.fetch_bytes(url).await?;

        // Direct PDF link: no index to scan
        if is_pdf(&bytes) || url.to_lowercase().ends_with(".pdf") {
            let pages = parse_schedule_pdf(&bytes)?;
            return Ok(ScheduleExtract::Week {
                week,
                pdf_url: url.to_string(),
                page_url: None,
                pages,
            });
        }

        let base = Url::parse(url)
            .map_err(|e| AppError::Extraction(format!("Invalid URL {}: {}", url, e)))?;
        let body = String::from_utf8_lossy(&bytes);
        let links = scan_week_links(&body, &base, audience);

        let mut available: Vec<u32> = links
            .pages
            .iter()
            .map(|(num, _)| *num)
            .chain(links.pdfs.iter().map(|(num, _)| *num))
            .collect();
        available.sort_unstable_by(|a, b| b.cmp(a));
        available.dedup();

        if available.is_empty() {
            return Err(AppError::Extraction(format!(
                "No week links found on schedule page {}",
                url
            )));
        }

        let target_week = match week {
            Some(requested) => {
                if !available.contains(&requested) {
                    tracing::info!(
                        "Week {} not published (available: {:?})",
                        requested,
                        available
                    );
                    return Ok(ScheduleExtract::WeekNotFound {
                        requested,
                        available,
                    });
                }
                requested
            }
            None => available[0],
        };

        let page_url = links
            .pages
            .iter()
            .find(|(num, _)| *num == target_week)
            .map(|(_, link)| link.clone());

        let mut pdf_url = links
            .pdfs
            .iter()
            .find(|(num, _)| *num == target_week)
            .map(|(_, link)| link.clone());

        // The PDF is often linked from the week's own page, not the index
        if pdf_url.is_none() {
            if let Some(ref page_link) = page_url {
                let page_bytes = self.fetch_bytes(page_link).await?;
                let page_base = Url::parse(page_link)
                    .map_err(|e| AppError::Extraction(format!("Invalid URL: {}", e)))?;
                let page_body = String::from_utf8_lossy(&page_bytes);
                pdf_url = first_pdf_link(&page_body, &page_base, audience);
            }
        }

        let Some(pdf_url) = pdf_url else {
            return Err(AppError::Extraction(format!(
                "No PDF found for week {} on {}",
                target_week, url
            )));
        };

        let pdf_bytes = self.fetch_bytes(&pdf_url).await?;
        let pages = parse_schedule_pdf(&pdf_bytes)?;

        tracing::info!(
            "Extracted week {}: {} pages from {}",
            target_week,
            pages.len(),
            pdf_url
        );

        Ok(ScheduleExtract::Week {
            week: Some(target_week),
            pdf_url,
            page_url,
            pages,
        })
    }
}

fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

/// Whether a link (href + anchor text) belongs to the instructor side of
/// the schedule site.
fn is_instructor_link(combined: &str) -> bool {
    combined.contains("enseignant") || combined.contains("prof") || combined.contains("teacher")
}

/// Scan an index page for week links, keeping only those matching the
/// requested audience.
fn scan_week_links(body: &str, base: &Url, audience: Audience) -> WeekLinks {
    let doc = Html::parse_document(body);
    let link_sel = Selector::parse("a[href]").unwrap();

    let mut links = WeekLinks::default();

    for el in doc.select(&link_sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };

        let anchor = el.text().collect::<Vec<_>>().join(" ");
        let combined = format!("{} {}", href.to_lowercase(), anchor.to_lowercase());

        let link_is_instructor = is_instructor_link(&combined);
        let keep = match audience {
            Audience::Instructors => link_is_instructor,
            Audience::Students => !link_is_instructor,
        };
        if !keep {
            continue;
        }

        let Some(caps) = week_re().captures(&combined) else {
            continue;
        };
        let Ok(week) = caps[1].parse::<u32>() else {
            continue;
        };

        let Ok(full_url) = base.join(href.trim()) else {
            continue;
        };
        let full_url = full_url.to_string();

        if full_url.to_lowercase().contains(".pdf") {
            if !links.pdfs.iter().any(|(_, u)| u == &full_url) {
                links.pdfs.push((week, full_url));
            }
        } else if !links.pages.iter().any(|(_, u)| u == &full_url) {
            links.pages.push((week, full_url));
        }
    }

    // Newest week first
    links.pages.sort_by(|a, b| b.0.cmp(&a.0));
    links.pdfs.sort_by(|a, b| b.0.cmp(&a.0));

    links
}

/// First PDF link on a page that matches the audience.
fn first_pdf_link(body: &str, base: &Url, audience: Audience) -> Option<String> {
    let doc = Html::parse_document(body);
    let link_sel = Selector::parse("a[href]").unwrap();

    for el in doc.select(&link_sel) {
        let href = el.value().attr("href")?.trim();
        if !href.to_lowercase().contains(".pdf") {
            continue;
        }

        let combined = href.to_lowercase();
        let link_is_instructor = is_instructor_link(&combined);
        let keep = match audience {
            Audience::Instructors => link_is_instructor,
            Audience::Students => !link_is_instructor,
        };
        if !keep {
            continue;
        }

        if let Ok(full) = base.join(href) {
            return Some(full.to_string());
        }
    }

    None
}

/// Extract a schedule PDF page by page; each page is one group's timetable.
fn parse_schedule_pdf(bytes: &[u8]) -> AppResult<Vec<SchedulePage>> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| AppError::Extraction(format!("Failed to parse PDF: {}", e)))?;

    let mut pages = Vec::new();

    for (&page_no, _) in doc.get_pages().iter() {
        let raw = doc.extract_text(&[page_no]).unwrap_or_default();
        let body = clean_pdf_text(&raw);

        let group = group_re()
            .find(&body)
            .map(|m| m.as_str().to_string());

        let body = if body.len() < MIN_PAGE_TEXT {
            "[page sans texte extractible]".to_string()
        } else {
            body
        };

        pages.push(SchedulePage {
            page_no,
            group,
            body,
        });
    }

    if pages.is_empty() {
        return Err(AppError::Extraction("PDF has no pages".to_string()));
    }

    Ok(pages)
}

/// Strip control characters and collapse whitespace while keeping line
/// structure.
fn clean_pdf_text(text: &str) -> String {
    let without_controls: String = text
        .chars()
        .filter(|c| !c.is_control() || *c == '\n')
        .collect();

    let lines: Vec<String> = without_controls
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();

    let mut cleaned = String::new();
    let mut last_was_empty = false;
    for line in lines {
        if line.is_empty() {
            if last_was_empty {
                continue;
            }
            last_was_empty = true;
        } else {
            last_was_empty = false;
        }
        cleaned.push_str(&line);
        cleaned.push('\n');
    }

    cleaned.trim().to_string()
}

/// Extract the full text of a PDF document (used for uploaded documents).
pub fn pdf_text_from_bytes(bytes: &[u8]) -> AppResult<String> {
    let pages = parse_schedule_pdf(bytes)?;
    let text = pages
        .into_iter()
        .map(|page| format!("[Page {}]\n{}", page.page_no, page.body))
        .collect::<Vec<_>>()
        .join("\n\n");

    if text.trim().is_empty() {
        return Err(AppError::Extraction(
            "No text content extracted from PDF".to_string(),
        ));
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX_PAGE: &str = r#"
        <html><body>
        <a href="/edt/semaine-14/">Semaine 14</a>
        <a href="/edt/semaine-13/">Semaine 13</a>
        <a href="/files/emploi-semaine-14.pdf">PDF semaine 14</a>
        <a href="/files/emploi-prof-semaine-14.pdf">PDF enseignants semaine 14</a>
        <a href="/edt/enseignants-semaine-14/">Semaine 14 enseignants</a>
        <a href="/actualites/">Actualités</a>
        </body></html>
    "#;

    #[test]
    fn test_week_regex_variants() {
        for text in ["semaine 14", "semaine-14", "Semaine14", "week 14"] {
            let lowered = text.to_lowercase();
            let caps = week_re().captures(&lowered).unwrap();
            assert_eq!(&caps[1], "14");
        }
        assert!(week_re().captures("emploi du temps").is_none());
    }

    #[test]
    fn test_scan_student_links_skips_instructor_pages() {
        let base = Url::parse("https://enigplus.test/edt/").unwrap();
        let links = scan_week_links(INDEX_PAGE, &base, Audience::Students);

        assert_eq!(links.pages.len(), 2);
        // Newest first
        assert_eq!(links.pages[0].0, 14);
        assert_eq!(links.pages[1].0, 13);
        assert!(links.pages.iter().all(|(_, u)| !u.contains("enseignants")));

        assert_eq!(links.pdfs.len(), 1);
        assert!(!links.pdfs[0].1.contains("prof"));
    }

    #[test]
    fn test_scan_instructor_links() {
        let base = Url::parse("https://enigplus.test/edt/").unwrap();
        let links = scan_week_links(INDEX_PAGE, &base, Audience::Instructors);

        assert_eq!(links.pages.len(), 1);
        assert!(links.pages[0].1.contains("enseignants"));
        assert_eq!(links.pdfs.len(), 1);
        assert!(links.pdfs[0].1.contains("prof"));
    }

    #[test]
    fn test_group_tag_detection() {
        assert_eq!(group_re().find("Emploi du temps GCR2A").unwrap().as_str(), "GCR2A");
        assert_eq!(group_re().find("Groupe GCR1").unwrap().as_str(), "GCR1");
        assert!(group_re().find("Groupe MECA1").is_none());
    }

    #[test]
    fn test_clean_pdf_text() {
        let raw = "Lundi   08:15  \u{0007} Math\n\n\n\nMardi  09:00   Physique";
        let cleaned = clean_pdf_text(raw);

        assert!(cleaned.contains("Lundi 08:15 Math"));
        assert!(cleaned.contains("Mardi 09:00 Physique"));
        assert!(!cleaned.contains('\u{0007}'));
        assert!(!cleaned.contains("\n\n\n"));
    }

    #[test]
    fn test_first_pdf_link_respects_audience() {
        let page = r#"
            <html><body>
            <a href="/files/emploi-prof-s14.pdf">Version enseignants</a>
            <a href="/files/emploi-s14.pdf">Version étudiants</a>
            </body></html>
        "#;
        let base = Url::parse("https://enigplus.test/edt/semaine-14/").unwrap();

        let student = first_pdf_link(page, &base, Audience::Students).unwrap();
        assert!(student.ends_with("/files/emploi-s14.pdf"));

        let instructor = first_pdf_link(page, &base, Audience::Instructors).unwrap();
        assert!(instructor.ends_with("/files/emploi-prof-s14.pdf"));
    }

    #[test]
    fn test_is_pdf_magic() {
        assert!(is_pdf(b"%PDF-1.7 ..."));
        assert!(!is_pdf(b"<html></html>"));
    }
}
