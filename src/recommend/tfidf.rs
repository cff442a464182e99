//! TF-IDF vectorization of book descriptions.
//!
//! Tokens are lowercase runs of at least two word characters. Stop words are
//! removed first, then unigrams and bigrams are counted per document.
//!
//! Weighting:
//!   tfidf(t, d) = count(t, d) * (ln((1 + n) / (1 + df(t))) + 1)
//!
//! Each row is L2-normalized. The vocabulary is kept in a `BTreeMap` so the
//! resulting matrix never depends on hash iteration order.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;

use super::stopwords::is_stop_word;

/// Runs of two or more Unicode word characters
static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?u)\b\w\w+\b").expect("Failed to compile token regex"));

/// Sparse TF-IDF matrix: one row per document, one column per vocabulary term.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    /// Column terms, sorted lexicographically
    vocabulary: Vec<String>,
    /// (column, weight) pairs per row, sorted by column
    rows: Vec<Vec<(usize, f32)>>,
}

impl FeatureMatrix {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Non-zero entries of a row.
    pub fn row(&self, idx: usize) -> &[(usize, f32)] {
        &self.rows[idx]
    }

    /// Weight of `term` in row `idx`, 0.0 when absent.
    pub fn weight(&self, idx: usize, term: &str) -> f32 {
        let Ok(col) = self.vocabulary.binary_search_by(|t| t.as_str().cmp(term)) else {
            return 0.0;
        };

        self.rows[idx]
            .binary_search_by_key(&col, |(c, _)| *c)
            .map(|pos| self.rows[idx][pos].1)
            .unwrap_or(0.0)
    }
}

/// Builds a [`FeatureMatrix`] from a corpus.
///
/// A vectorizer holds no fitted state: the vocabulary only lives inside the
/// matrix it produces.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    max_features: usize,
}

impl TfidfVectorizer {
    pub fn new(max_features: usize) -> Self {
        Self { max_features }
    }

    /// Fit the vocabulary on `documents` and weight every document.
    ///
    /// Returns `None` for an empty corpus.
    pub fn fit_transform<S: AsRef<str>>(&self, documents: &[S]) -> Option<FeatureMatrix> {
        if documents.is_empty() {
            return None;
        }

        let counts: Vec<BTreeMap<String, usize>> =
            documents.iter().map(|doc| count_terms(doc.as_ref())).collect();

        let mut corpus_counts: BTreeMap<&str, usize> = BTreeMap::new();
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for doc in &counts {
            for (term, count) in doc {
                *corpus_counts.entry(term.as_str()).or_default() += count;
                *doc_freq.entry(term.as_str()).or_default() += 1;
            }
        }

        let vocabulary = limit_vocabulary(&corpus_counts, self.max_features);
        let columns: HashMap<&str, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(col, term)| (*term, col))
            .collect();

        let n_docs = counts.len() as f32;
        let idf: Vec<f32> = vocabulary
            .iter()
            .map(|term| {
                let df = doc_freq.get(term).copied().unwrap_or(0) as f32;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        let rows = counts
            .iter()
            .map(|doc| {
                let mut row: Vec<(usize, f32)> = doc
                    .iter()
                    .filter_map(|(term, &count)| {
                        columns
                            .get(term.as_str())
                            .map(|&col| (col, count as f32 * idf[col]))
                    })
                    .collect();
                row.sort_unstable_by_key(|(col, _)| *col);
                l2_normalize(&mut row);
                row
            })
            .collect();

        Some(FeatureMatrix {
            vocabulary: vocabulary.into_iter().map(str::to_string).collect(),
            rows,
        })
    }
}

/// Lowercase tokens with stop words removed.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|token| !is_stop_word(token))
        .map(str::to_string)
        .collect()
}

/// Unigram and bigram counts of one document.
fn count_terms(text: &str) -> BTreeMap<String, usize> {
    let tokens = tokenize(text);
    let mut counts = BTreeMap::new();

    for token in &tokens {
        *counts.entry(token.clone()).or_default() += 1;
    }
    for pair in tokens.windows(2) {
        *counts.entry(format!("{} {}", pair[0], pair[1])).or_default() += 1;
    }

    counts
}

/// Keep the `max_features` most frequent terms (ties by term), sorted by term.
fn limit_vocabulary<'a>(corpus_counts: &BTreeMap<&'a str, usize>, max_features: usize) -> Vec<&'a str> {
    let mut terms: Vec<&str> = corpus_counts.keys().copied().collect();
    if terms.len() <= max_features {
        return terms;
    }

    terms.sort_by(|a, b| corpus_counts[b].cmp(&corpus_counts[a]).then_with(|| a.cmp(b)));
    terms.truncate(max_features);
    terms.sort_unstable();
    terms
}

fn l2_normalize(row: &mut [(usize, f32)]) {
    let norm = row.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
    if norm < f32::EPSILON {
        return;
    }
    for (_, w) in row.iter_mut() {
        *w /= norm;
    }
}
