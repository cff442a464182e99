//! Candidate pool: the catalog minus the user's favorites.

use std::collections::HashSet;

use super::BookLike;

/// Books from `catalog` whose id is not a favorite, in catalog order.
pub fn build_pool<'a, C: BookLike>(favorite_ids: &HashSet<u64>, catalog: &'a [C]) -> Vec<&'a C> {
    catalog
        .iter()
        .filter(|book| !favorite_ids.contains(&book.id()))
        .collect()
}
