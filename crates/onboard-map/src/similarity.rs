//! Similarity primitives.
//!
//! Every function here is pure, deterministic and total: empty or unknown
//! input yields 0.0, never a panic. Scores are always within `0.0..=1.0`.

use std::collections::BTreeMap;

use rapidfuzz::distance::indel;

use crate::patterns::ValuePattern;
use crate::utils::{compact_name, fold_whitespace, keywords};

/// 1.0 when both names are equal after case folding and whitespace removal.
pub fn exact_score(a: &str, b: &str) -> f64 {
    let a = fold_whitespace(a);
    let b = fold_whitespace(b);
    if !a.is_empty() && a == b { 1.0 } else { 0.0 }
}

/// LCS-based (Indel) similarity ratio over trimmed, lowercased names.
///
/// Case is folded before comparing, so `DOB` and `dob` score 1.0. Separators
/// are kept: `Patient_ID` against `PatientID` scores below 1.0.
pub fn fuzzy_score(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    unit(indel::normalized_similarity(a.chars(), b.chars()))
}

/// Fraction of field keyword tokens found inside the compacted candidate name.
pub fn lexical_score(field_tokens: &[String], candidate: &str) -> f64 {
    if field_tokens.is_empty() {
        return 0.0;
    }
    let haystack = compact_name(candidate);
    if haystack.is_empty() {
        return 0.0;
    }
    let hits = field_tokens
        .iter()
        .filter(|token| haystack.contains(token.as_str()))
        .count();
    hits as f64 / field_tokens.len() as f64
}

/// TF-IDF cosine similarity between two free texts.
pub fn semantic_score(text_a: &str, text_b: &str) -> f64 {
    let documents = [keywords(text_a), keywords(text_b)];
    TfIdfIndex::build(&documents).map_or(0.0, |index| index.cosine(0, 1))
}

/// Fraction of sampled values matching the shape implied by the field name.
pub fn pattern_score(field_name: &str, samples: &[String]) -> f64 {
    ValuePattern::from_field_name(field_name).map_or(0.0, |pattern| pattern.match_ratio(samples))
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Turns token documents into comparable vectors.
///
/// The semantic matcher only depends on this capability, so a different
/// backend (embeddings, say) can be swapped in at construction time.
pub trait TextVectorizer: Send + Sync {
    /// Similarity of `query` against each of `documents`, in document order.
    fn similarities(&self, query: &[String], documents: &[Vec<String>]) -> Vec<f64>;
}

/// Bag-of-words TF-IDF vectorizer with cosine similarity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TfIdfVectorizer;

impl TextVectorizer for TfIdfVectorizer {
    fn similarities(&self, query: &[String], documents: &[Vec<String>]) -> Vec<f64> {
        let mut corpus = Vec::with_capacity(documents.len() + 1);
        corpus.push(query.to_vec());
        corpus.extend(documents.iter().cloned());
        let Some(index) = TfIdfIndex::build(&corpus) else {
            return vec![0.0; documents.len()];
        };
        (1..corpus.len()).map(|doc| index.cosine(0, doc)).collect()
    }
}

/// L2-normalized TF-IDF vectors for a small corpus.
///
/// IDF is smoothed: `ln((1 + n) / (1 + df)) + 1`. Ordered maps keep the
/// floating-point summation order stable between runs.
#[derive(Debug, Clone)]
pub struct TfIdfIndex {
    vectors: Vec<BTreeMap<String, f64>>,
}

impl TfIdfIndex {
    /// Build the index; `None` when the corpus has no vocabulary at all.
    pub fn build(documents: &[Vec<String>]) -> Option<Self> {
        let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
        for document in documents {
            let mut seen: Vec<&str> = Vec::new();
            for term in document {
                if !seen.contains(&term.as_str()) {
                    seen.push(term.as_str());
                    *document_frequency.entry(term.as_str()).or_insert(0) += 1;
                }
            }
        }
        if document_frequency.is_empty() {
            return None;
        }

        let n = documents.len() as f64;
        let vectors = documents
            .iter()
            .map(|document| {
                let mut counts: BTreeMap<String, f64> = BTreeMap::new();
                for term in document {
                    *counts.entry(term.clone()).or_insert(0.0) += 1.0;
                }
                for (term, weight) in &mut counts {
                    let df = document_frequency.get(term.as_str()).copied().unwrap_or(0) as f64;
                    *weight *= ((1.0 + n) / (1.0 + df)).ln() + 1.0;
                }
                let norm = counts.values().map(|w| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for weight in counts.values_mut() {
                        *weight /= norm;
                    }
                }
                counts
            })
            .collect();
        Some(Self { vectors })
    }

    /// Cosine similarity between two documents of the corpus.
    pub fn cosine(&self, a: usize, b: usize) -> f64 {
        let (Some(left), Some(right)) = (self.vectors.get(a), self.vectors.get(b)) else {
            return 0.0;
        };
        let (small, large) = if left.len() <= right.len() {
            (left, right)
        } else {
            (right, left)
        };
        let dot: f64 = small
            .iter()
            .filter_map(|(term, weight)| large.get(term).map(|other| weight * other))
            .sum();
        unit(dot)
    }
}
