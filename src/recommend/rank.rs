//! Ranking and deduplication of scored candidates.
//!
//! For every favorite (in order) the candidates are stable-sorted by score,
//! the top `num_recommendations` are taken, and only then the threshold is
//! applied. The first favorite that selects a candidate claims its score;
//! later favorites never overwrite it. The claimed entries are finally
//! stable-sorted by score and truncated.

use std::cmp::Ordering;
use std::collections::HashSet;

use super::{BookLike, RecommendOptions, SimilarityMatrix};

/// A candidate claimed by one of the favorites.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation<'a> {
    pub id: u64,
    pub title: &'a str,
    pub score: f32,
}

/// Produce recommended titles.
///
/// Rows `[0, n_favorites)` of `similarities` are favorites, the remaining rows
/// map one-to-one onto `candidates`.
pub fn rank<C: BookLike>(
    similarities: &SimilarityMatrix,
    n_favorites: usize,
    candidates: &[&C],
    favorite_ids: &HashSet<u64>,
    opts: &RecommendOptions,
) -> Vec<String> {
    let claimed = claim_candidates(similarities, n_favorites, candidates, favorite_ids, opts);
    finalize(claimed, opts.num_recommendations)
}

/// Per-favorite selection with first-claim deduplication, in discovery order.
pub fn claim_candidates<'a, C: BookLike>(
    similarities: &SimilarityMatrix,
    n_favorites: usize,
    candidates: &[&'a C],
    favorite_ids: &HashSet<u64>,
    opts: &RecommendOptions,
) -> Vec<Recommendation<'a>> {
    let mut seen = HashSet::new();
    let mut claimed = vec![];

    for favorite in 0..n_favorites {
        let scores = &similarities.row(favorite)[n_favorites..];

        for (idx, score) in top_candidates(scores, opts.num_recommendations) {
            if score <= opts.similarity_threshold {
                continue;
            }

            let book = candidates[idx];
            if favorite_ids.contains(&book.id()) || !seen.insert(book.id()) {
                continue;
            }

            claimed.push(Recommendation {
                id: book.id(),
                title: book.title(),
                score,
            });
        }
    }

    claimed
}

/// Indices of the `limit` best scores, ties kept in index order.
fn top_candidates(scores: &[f32], limit: usize) -> Vec<(usize, f32)> {
    let mut indexed: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    indexed.truncate(limit);
    indexed
}

/// Sort by score descending (stable), truncate and drop empty titles.
///
/// Only a title of zero length counts as empty, whitespace is a title.
fn finalize(mut claimed: Vec<Recommendation<'_>>, limit: usize) -> Vec<String> {
    claimed.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    claimed.truncate(limit);

    claimed
        .into_iter()
        .filter(|rec| !rec.title.is_empty())
        .map(|rec| rec.title.to_string())
        .collect()
}
