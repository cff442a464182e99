//! Content-based book recommendations.
//!
//! Scores the books of a catalog against a user's favorites using TF-IDF
//! similarity over their descriptions.
//!
//! # Pipeline
//!
//! - `pool`: catalog minus favorites (by id)
//! - `tfidf`: descriptions -> weighted unigram/bigram feature matrix
//! - `similarity`: pairwise cosine similarity over matrix rows
//! - `rank`: per-favorite top-N, threshold, first-claim dedup, final ordering
//!
//! Everything is built fresh per call. Nothing is cached across requests
//! because the vocabulary depends on which favorites are being scored.

mod options;
pub mod pool;
pub mod rank;
pub mod similarity;
mod stopwords;
pub mod tfidf;

use std::collections::HashSet;

pub use options::{RecommendError, RecommendOptions, RecommendOverrides};
pub use similarity::SimilarityMatrix;
pub use tfidf::{FeatureMatrix, TfidfVectorizer};

/// Default number of titles returned.
pub const DEFAULT_NUM_RECOMMENDATIONS: usize = 5;

/// Default vocabulary cap for the vectorizer.
pub const DEFAULT_MAX_FEATURES: usize = 5000;

/// Default minimum similarity (exclusive) a candidate needs to be recommended.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.1;

/// Anything that can be recommended: an id, a title and an optional description.
pub trait BookLike {
    fn id(&self) -> u64;
    fn title(&self) -> &str;
    fn description(&self) -> Option<&str>;
}

impl<T: BookLike + ?Sized> BookLike for &T {
    fn id(&self) -> u64 {
        (**self).id()
    }

    fn title(&self) -> &str {
        (**self).title()
    }

    fn description(&self) -> Option<&str> {
        (**self).description()
    }
}

/// Description usable for vectorization, `None` when empty or blank.
fn usable_description<B: BookLike + ?Sized>(book: &B) -> Option<&str> {
    book.description().filter(|d| !d.trim().is_empty())
}

/// Recommend catalog titles similar to the given favorites.
///
/// Returns an empty list (not an error) when there are no favorites, nothing
/// left in the catalog once favorites are excluded, or no descriptions on
/// either side. Options are validated before anything else runs.
pub fn recommend<F, C>(
    favorites: &[F],
    catalog: &[C],
    opts: &RecommendOptions,
) -> Result<Vec<String>, RecommendError>
where
    F: BookLike,
    C: BookLike,
{
    opts.validate()?;

    if favorites.is_empty() || opts.num_recommendations == 0 {
        return Ok(vec![]);
    }

    let favorite_ids: HashSet<u64> = favorites.iter().map(|book| book.id()).collect();

    let pool = pool::build_pool(&favorite_ids, catalog);
    if pool.is_empty() {
        log::debug!("no candidates left after excluding {} favorites", favorite_ids.len());
        return Ok(vec![]);
    }

    let favorite_docs: Vec<&str> = favorites.iter().filter_map(usable_description).collect();
    let candidates: Vec<&C> = pool
        .into_iter()
        .filter(|book| usable_description(*book).is_some())
        .collect();

    if favorite_docs.is_empty() || candidates.is_empty() {
        log::debug!("no descriptions to process");
        return Ok(vec![]);
    }

    let corpus: Vec<&str> = favorite_docs
        .iter()
        .copied()
        .chain(candidates.iter().filter_map(|book| usable_description(*book)))
        .collect();

    let Some(matrix) = TfidfVectorizer::new(opts.max_features).fit_transform(&corpus) else {
        return Ok(vec![]);
    };

    log::debug!(
        "vectorized {} favorites and {} candidates into {} features",
        favorite_docs.len(),
        candidates.len(),
        matrix.n_features()
    );

    let similarities = SimilarityMatrix::cosine(&matrix);

    Ok(rank::rank(
        &similarities,
        favorite_docs.len(),
        &candidates,
        &favorite_ids,
        opts,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doc {
        id: u64,
        title: &'static str,
        description: Option<&'static str>,
    }

    impl BookLike for Doc {
        fn id(&self) -> u64 {
            self.id
        }

        fn title(&self) -> &str {
            self.title
        }

        fn description(&self) -> Option<&str> {
            self.description
        }
    }

    fn doc(id: u64, title: &'static str, description: &'static str) -> Doc {
        Doc {
            id,
            title,
            description: Some(description),
        }
    }

    #[test]
    fn test_usable_description_rejects_blank() {
        assert!(usable_description(&doc(1, "a", "   ")).is_none());
        assert!(usable_description(&Doc {
            id: 1,
            title: "a",
            description: None
        })
        .is_none());
        assert_eq!(usable_description(&doc(1, "a", "robots")), Some("robots"));
    }

    #[test]
    fn test_recommend_validates_before_early_exit() {
        let favorites: Vec<Doc> = vec![];
        let catalog: Vec<Doc> = vec![];
        let opts = RecommendOptions {
            max_features: 0,
            ..Default::default()
        };

        let result = recommend(&favorites, &catalog, &opts);
        assert!(matches!(result, Err(RecommendError::InvalidOption { .. })));
    }

    #[test]
    fn test_recommend_blank_favorite_descriptions() {
        let favorites = vec![doc(1, "Blank", "  ")];
        let catalog = vec![doc(2, "Robots", "robots in space")];

        let titles = recommend(&favorites, &catalog, &RecommendOptions::default()).unwrap();
        assert!(titles.is_empty());
    }

    #[test]
    fn test_recommend_through_references() {
        let favorites = vec![doc(1, "Fav", "space robots")];
        let catalog = vec![doc(2, "Match", "space robots again")];
        let catalog_refs: Vec<&Doc> = catalog.iter().collect();

        let titles = recommend(&favorites, &catalog_refs, &RecommendOptions::default()).unwrap();
        assert_eq!(titles, vec!["Match"]);
    }
}
