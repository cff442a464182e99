//! Pairwise cosine similarity over feature matrix rows.

use super::tfidf::FeatureMatrix;

/// Square, symmetric matrix of cosine similarities (0.0 to 1.0).
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    size: usize,
    values: Vec<f32>,
}

impl SimilarityMatrix {
    /// Compare every row of `matrix` with every other row.
    ///
    /// Rows with zero norm score 0.0 against everything, themselves included.
    pub fn cosine(matrix: &FeatureMatrix) -> Self {
        let size = matrix.n_rows();
        let norms: Vec<f32> = (0..size).map(|idx| l2_norm(matrix.row(idx))).collect();

        let mut values = vec![0.0; size * size];
        for i in 0..size {
            for j in i..size {
                let score = cosine_similarity(matrix.row(i), matrix.row(j), norms[i], norms[j]);
                values[i * size + j] = score;
                values[j * size + i] = score;
            }
        }

        Self { size, values }
    }

    /// Build from row-major values, for ranking tests.
    #[cfg(test)]
    pub(super) fn from_values(size: usize, values: Vec<f32>) -> Self {
        assert_eq!(values.len(), size * size);
        Self { size, values }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.values[i * self.size + j]
    }

    /// Similarities of row `i` against every row.
    pub fn row(&self, i: usize) -> &[f32] {
        &self.values[i * self.size..(i + 1) * self.size]
    }
}

fn l2_norm(row: &[(usize, f32)]) -> f32 {
    row.iter().map(|(_, w)| w * w).sum::<f32>().sqrt()
}

/// Dot product of two column-sorted sparse rows.
fn sparse_dot(a: &[(usize, f32)], b: &[(usize, f32)]) -> f32 {
    let (mut i, mut j) = (0, 0);
    let mut dot = 0.0;

    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dot += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }

    dot
}

fn cosine_similarity(a: &[(usize, f32)], b: &[(usize, f32)], norm_a: f32, norm_b: f32) -> f32 {
    if norm_a < f32::EPSILON || norm_b < f32::EPSILON {
        return 0.0;
    }

    (sparse_dot(a, b) / (norm_a * norm_b)).clamp(0.0, 1.0)
}
