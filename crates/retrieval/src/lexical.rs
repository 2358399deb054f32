//! Lexical scoring primitives.
//!
//! Shared by the in-memory retrieval client and the document store. The
//! vectors are not semantic embeddings — they are deterministic,
//! content-dependent hashes of word and trigram frequencies, good enough
//! to rank text by lexical similarity without a model service.

use std::collections::{HashMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

/// Dimensionality of the lexical vectors.
pub const EMBEDDING_DIM: usize = 128;

/// High-frequency words carrying no ranking signal (French + English).
const STOP_WORDS: &[&str] = &[
    "les", "des", "une", "est", "sont", "pour", "que", "qui", "dans", "sur", "avec", "pas",
    "aux", "ces", "son", "ses", "par", "the", "and", "are", "was", "were", "for", "with",
    "that", "this", "from", "what", "which", "have", "has",
];

/// Lowercased word tokens, stop words and short tokens removed.
pub fn tokens(text: &str) -> Vec<String> {
    text.unicode_words()
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() > 2 && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Unique token set for overlap scoring.
pub fn token_set(text: &str) -> HashSet<String> {
    tokens(text).into_iter().collect()
}

/// Fraction of `query` tokens present in `text`, in [0, 1].
pub fn overlap_ratio(query: &HashSet<String>, text: &HashSet<String>) -> f32 {
    if query.is_empty() {
        return 0.0;
    }
    let matched = query.intersection(text).count();
    matched as f32 / query.len() as f32
}

/// Deterministic lexical vector for a piece of text.
///
/// Each word contributes its frequency to a hashed dimension, and each
/// character trigram contributes a sqrt-scaled share, so near-duplicate
/// texts land close together. Normalized to a unit vector.
pub fn lexical_embedding(text: &str) -> Vec<f32> {
    let mut embedding = vec![0.0f32; EMBEDDING_DIM];

    let mut word_freq: HashMap<String, u32> = HashMap::new();
    for word in tokens(text) {
        *word_freq.entry(word).or_insert(0) += 1;
    }

    for (word, freq) in &word_freq {
        let chars: Vec<char> = word.chars().collect();
        for i in 0..chars.len().saturating_sub(2) {
            let trigram = format!("{}{}{}", chars[i], chars[i + 1], chars[i + 2]);
            let trigram_hash = trigram
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(37).wrapping_add(b as u64));
            let dim = (trigram_hash as usize) % EMBEDDING_DIM;
            embedding[dim] += (*freq as f32).sqrt();
        }

        let word_hash = word
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let dim = (word_hash as usize) % EMBEDDING_DIM;
        embedding[dim] += *freq as f32;
    }

    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut embedding {
            *value /= norm;
        }
    }

    embedding
}

/// Cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
