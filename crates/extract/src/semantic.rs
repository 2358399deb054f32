//! Deterministic excerpt selection over long text.
//!
//! Splits text into paragraph-bounded chunks, scores each chunk by
//! rarity-weighted token overlap with the query, and returns the top-K
//! chunks in their original order of appearance so the result still reads
//! as prose. Identical `(text, query)` inputs always produce identical
//! selection and ordering.

use unicode_segmentation::UnicodeSegmentation;

/// Window size in characters for text without paragraph breaks.
const TARGET_CHUNK_CHARS: usize = 500;

/// Paragraphs shorter than this are merged with the following one.
const MIN_CHUNK_CHARS: usize = 80;

/// Window overlap used when the text has no paragraph breaks.
const WINDOW_OVERLAP: usize = TARGET_CHUNK_CHARS / 4;

/// A selected excerpt with its position in the chunk sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Excerpt {
    /// Index of the chunk in the original text
    pub position: usize,

    pub text: String,

    /// Rarity-weighted overlap score in [0, 1]
    pub score: f32,
}

/// Select the `top_k` chunks of `text` most relevant to `query`.
pub fn semantic_search(text: &str, query: &str, top_k: usize) -> Vec<Excerpt> {
    let chunks = chunk_paragraphs(text);
    if chunks.is_empty() || top_k == 0 {
        return Vec::new();
    }

    let query_tokens = word_tokens(query);
    if query_tokens.is_empty() {
        return Vec::new();
    }

    let chunk_tokens: Vec<Vec<String>> = chunks.iter().map(|c| word_tokens(c)).collect();

    // Inverse chunk frequency: rare query terms weigh more
    let n = chunks.len() as f32;
    let weights: Vec<f32> = query_tokens
        .iter()
        .map(|token| {
            let df = chunk_tokens
                .iter()
                .filter(|tokens| tokens.iter().any(|t| t == token))
                .count() as f32;
            1.0 + (n / (1.0 + df)).ln()
        })
        .collect();
    let total_weight: f32 = weights.iter().sum();

    let mut scored: Vec<Excerpt> = chunks
        .iter()
        .enumerate()
        .map(|(position, chunk)| {
            let tokens = &chunk_tokens[position];
            let matched_weight: f32 = query_tokens
                .iter()
                .zip(weights.iter())
                .filter(|(token, _)| tokens.iter().any(|t| t == *token))
                .map(|(_, weight)| *weight)
                .sum();

            Excerpt {
                position,
                text: chunk.clone(),
                score: if total_weight > 0.0 {
                    matched_weight / total_weight
                } else {
                    0.0
                },
            }
        })
        .filter(|excerpt| excerpt.score > 0.0)
        .collect();

    // Rank by score, position breaking ties, then restore document order
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.position.cmp(&b.position))
    });
    scored.truncate(top_k);
    scored.sort_by_key(|excerpt| excerpt.position);

    scored
}

/// Split into paragraph-bounded chunks, merging undersized paragraphs with
/// the following one. Falls back to fixed overlapping windows for text
/// without blank lines.
fn chunk_paragraphs(text: &str) -> Vec<String> {
    let paragraphs: Vec<&str> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    if paragraphs.is_empty() {
        return Vec::new();
    }

    if paragraphs.len() == 1 && paragraphs[0].len() > TARGET_CHUNK_CHARS * 2 {
        return window_chunks(paragraphs[0]);
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for paragraph in paragraphs {
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);

        if current.len() >= MIN_CHUNK_CHARS {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Fixed-size overlapping windows, cut on char boundaries.
fn window_chunks(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + TARGET_CHUNK_CHARS).min(text.len());
        while end < text.len() && !text.is_char_boundary(end) {
            end += 1;
        }

        chunks.push(text[start..end].to_string());

        if end == text.len() {
            break;
        }

        let mut next = end - WINDOW_OVERLAP.min(end);
        while next > 0 && !text.is_char_boundary(next) {
            next -= 1;
        }
        // Always move forward
        start = next.max(start + 1);
        while start < text.len() && !text.is_char_boundary(start) {
            start += 1;
        }
    }

    chunks
}

fn word_tokens(text: &str) -> Vec<String> {
    text.unicode_words()
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() > 2)
        .collect()
}
