//! Bounded, keyword-guided web page extraction.
//!
//! Strategy:
//! 1. Fetch the requested page and extract its main text.
//! 2. If that text already matches the keywords well, return it (early
//!    exit — no traversal).
//! 3. Otherwise score the page's same-domain links by keyword relevance
//!    and visit the best candidates up to a fixed fan-out limit, keeping
//!    the best-scoring page. Depth is 1; this is targeted extraction,
//!    not crawling.
//!
//! PDF links discovered on any visited page are collected and attached
//! to the result.

use crate::types::Extraction;
use campusbot_core::{AppError, AppResult};
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// User-Agent string for extraction requests.
const USER_AGENT: &str = concat!("CampusBot/", env!("CARGO_PKG_VERSION"));

/// Root-page score at which internal-page traversal is skipped.
const EARLY_EXIT_SCORE: u32 = 60;

/// Internal-page score at which traversal stops immediately.
const GOOD_MATCH_SCORE: u32 = 70;

/// Maximum internal pages visited per extraction.
const MAX_FANOUT: usize = 5;

/// Returned text is truncated past this length.
const MAX_TEXT_LEN: usize = 8000;

/// Pause before the single retry of a failed fetch.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// URL fragments that never lead to useful content.
const EXCLUDED_URL_PARTS: &[&str] = &[
    "login", "connexion", "contact", "privacy", "cookie", "mentions", "wp-admin", "wp-login",
];

/// Generic keywords that make a link worth a bonus.
const IMPORTANT_LINK_WORDS: &[&str] = &[
    "programme", "stage", "internship", "procedure", "inscription", "formation", "etudiant",
    "emploi", "horaire",
];

/// Contract for web evidence gathering, implemented by [`WebExtractor`]
/// and by stand-ins in dispatcher tests.
#[async_trait::async_trait]
pub trait WebSource: Send + Sync {
    /// Extract the text most relevant to `keywords` starting from `url`.
    /// With empty keywords, the root page text is returned as-is.
    async fn extract(&self, url: &str, keywords: &str) -> AppResult<Extraction>;
}

/// HTTP-backed extractor.
pub struct WebExtractor {
    client: reqwest::Client,
}

struct ParsedPage {
    text: String,
    scored_links: Vec<(String, u32)>,
    pdf_links: Vec<String>,
}

impl WebExtractor {
    pub fn new() -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| AppError::Extraction(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Fetch a page body, retrying once after a short backoff.
    async fn fetch(&self, url: &str) -> AppResult<String> {
        match self.try_fetch(url).await {
            Ok(body) => Ok(body),
            Err(first) => {
                tracing::warn!("Fetch failed for {}, retrying: {}", url, first);
                tokio::time::sleep(RETRY_BACKOFF).await;
                self.try_fetch(url).await
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> AppResult<String> {
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

        response
            .text()
            .await
            .map_err(|e| AppError::Extraction(format!("Failed to read body of {}: {}", url, e)))
    }
}

#[async_trait::async_trait]
impl WebSource for WebExtractor {
    async fn extract(&self, url: &str, keywords: &str) -> AppResult<Extraction> {
        let base = Url::parse(url)
            .map_err(|e| AppError::Extraction(format!("Invalid URL {}: {}", url, e)))?;

        let body = self.fetch(url).await?;
        let root = parse_page(&body, &base, keywords);

        let root_score = match_score(&root.text, keywords);
        tracing::debug!("Root page {} scored {}", url, root_score);

        let mut pdf_links = root.pdf_links.clone();

        if keywords.trim().is_empty() || root_score >= EARLY_EXIT_SCORE {
            return Ok(Extraction {
                text: truncate_text(&root.text),
                source_url: url.to_string(),
                score: root_score,
                pdf_links,
            });
        }

        // Fan out to the best-scoring internal links
        let mut best_text = root.text;
        let mut best_url = url.to_string();
        let mut best_score = root_score;
        let mut visited: HashSet<String> = HashSet::from([url.to_string()]);

        for (link, title_score) in root.scored_links.into_iter().take(MAX_FANOUT) {
            if !visited.insert(link.clone()) {
                continue;
            }

            let sub_body = match self.fetch(&link).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!("Skipping internal page {}: {}", link, e);
                    continue;
                }
            };

            let sub_base = match Url::parse(&link) {
                Ok(parsed) => parsed,
                Err(_) => continue,
            };

            let sub = parse_page(&sub_body, &sub_base, keywords);
            for pdf in sub.pdf_links {
                if !pdf_links.contains(&pdf) {
                    pdf_links.push(pdf);
                }
            }

            let content_score = match_score(&sub.text, keywords);
            let total = (title_score + content_score) / 2;
            tracing::debug!("Internal page {} scored {} (title {})", link, total, title_score);

            if total > best_score {
                best_score = total;
                best_text = sub.text;
                best_url = link;
            }

            if best_score >= GOOD_MATCH_SCORE {
                break;
            }
        }

        Ok(Extraction {
            text: truncate_text(&best_text),
            source_url: best_url,
            score: best_score,
            pdf_links,
        })
    }
}

/// Parse a page into main text, keyword-scored internal links and PDF links.
fn parse_page(body: &str, base: &Url, keywords: &str) -> ParsedPage {
    let doc = Html::parse_document(body);

    ParsedPage {
        text: page_text(&doc),
        scored_links: scored_internal_links(&doc, base, keywords),
        pdf_links: pdf_links(&doc, base),
    }
}

/// Extract readable text from a page, preferring the main content area.
fn page_text(doc: &Html) -> String {
    let container_sel =
        Selector::parse("main, article, div.content, div.entry-content, div.main").unwrap();
    let element_sel = Selector::parse("h1, h2, h3, h4, p, li, td").unwrap();

    let mut parts: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    let mut collect = |root: scraper::ElementRef| {
        for el in root.select(&element_sel) {
            let text = el
                .text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");

            if text.len() > 3 && seen.insert(text.clone()) {
                parts.push(text);
            }
        }
    };

    if let Some(container) = doc.select(&container_sel).next() {
        collect(container);
    } else if let Some(body) = doc.select(&Selector::parse("body").unwrap()).next() {
        collect(body);
    }

    parts.join("\n\n")
}

/// Lexical match score of content against a keyword query, 0–100.
///
/// Per-keyword occurrence points (capped), plus a bonus proportional to
/// the fraction of keywords matched, plus a small bonus for rich content.
pub(crate) fn match_score(content: &str, query: &str) -> u32 {
    if content.is_empty() {
        return 0;
    }
    if query.trim().is_empty() {
        return if content.len() > 200 { 20 } else { 0 };
    }

    let content_lower = content.to_lowercase();
    let words: Vec<String> = query
        .split_whitespace()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| w.len() > 2)
        .collect();

    if words.is_empty() {
        return if content.len() > 200 { 20 } else { 0 };
    }

    let mut score = 0u32;
    let mut matched = 0usize;

    for word in &words {
        let count = content_lower.matches(word.as_str()).count() as u32;
        if count > 0 {
            matched += 1;
            score += (count * 8).min(25);
        }
    }

    score += ((matched as f32 / words.len() as f32) * 30.0) as u32;

    if content.len() >= 500 {
        score += 10;
    } else if content.len() >= 200 {
        score += 5;
    }

    score.min(100)
}

/// Same-domain links scored by keyword relevance of anchor text and URL
/// path, best first. Navigation/login/legal pages are excluded.
fn scored_internal_links(doc: &Html, base: &Url, keywords: &str) -> Vec<(String, u32)> {
    let link_sel = Selector::parse("a[href]").unwrap();
    let query_words: Vec<String> = keywords
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() > 2)
        .collect();

    let base_domain = base.domain().unwrap_or_default().to_string();
    let mut seen: HashSet<String> = HashSet::new();
    let mut scored: Vec<(String, u32)> = Vec::new();

    for el in doc.select(&link_sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.starts_with('#') || href.starts_with("mailto:") || href.starts_with("javascript:")
        {
            continue;
        }

        let Ok(mut full_url) = base.join(href) else {
            continue;
        };
        full_url.set_fragment(None);
        full_url.set_query(None);

        if full_url.domain().unwrap_or_default() != base_domain {
            continue;
        }

        let clean = full_url.to_string();
        if clean == base.as_str() || !seen.insert(clean.clone()) {
            continue;
        }

        let url_lower = clean.to_lowercase();
        if EXCLUDED_URL_PARTS.iter().any(|part| url_lower.contains(part)) {
            continue;
        }
        if url_lower.ends_with(".pdf") {
            continue;
        }

        let anchor = el
            .text()
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_lowercase();
        let url_path = url_lower.rsplit('/').find(|s| !s.is_empty()).unwrap_or("");
        let combined = format!("{} {}", anchor, url_path);

        let mut score = 0u32;
        for word in &query_words {
            if combined.contains(word.as_str()) {
                score += 30;
            }
            if url_path.contains(word.as_str()) {
                score += 20;
            }
        }

        for word in IMPORTANT_LINK_WORDS {
            if combined.contains(word) {
                score += 10;
            }
        }

        if score > 0 {
            scored.push((clean, score));
        }
    }

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    scored
}

/// Absolute URLs of PDF links on the page.
fn pdf_links(doc: &Html, base: &Url) -> Vec<String> {
    let sel = Selector::parse("a[href], embed[src], iframe[src], object[data]").unwrap();
    let mut links: Vec<String> = Vec::new();

    for el in doc.select(&sel) {
        let href = el
            .value()
            .attr("href")
            .or_else(|| el.value().attr("src"))
            .or_else(|| el.value().attr("data"));

        let Some(href) = href else { continue };
        if !href.to_lowercase().contains(".pdf") {
            continue;
        }

        if let Ok(full) = base.join(href.trim()) {
            let url = full.to_string();
            if !links.contains(&url) {
                links.push(url);
            }
        }
    }

    links
}

fn truncate_text(text: &str) -> String {
    if text.len() <= MAX_TEXT_LEN {
        return text.to_string();
    }
    let mut end = MAX_TEXT_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n\n[... contenu tronqué]", &text[..end])
}
