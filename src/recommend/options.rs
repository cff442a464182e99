use serde::{Deserialize, Serialize};

use super::{DEFAULT_MAX_FEATURES, DEFAULT_NUM_RECOMMENDATIONS, DEFAULT_SIMILARITY_THRESHOLD};

/// Errors raised before the pipeline runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecommendError {
    #[error("invalid {field}: {message}")]
    InvalidOption {
        field: &'static str,
        message: String,
    },
}

impl RecommendError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            field,
            message: message.into(),
        }
    }
}

/// Tuning for a single recommendation call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendOptions {
    /// Maximum number of titles returned
    #[serde(default = "default_num_recommendations")]
    pub num_recommendations: usize,

    /// Vocabulary cap for the TF-IDF vectorizer
    #[serde(default = "default_max_features")]
    pub max_features: usize,

    /// Candidates must score strictly above this [0.0, 1.0]
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            num_recommendations: DEFAULT_NUM_RECOMMENDATIONS,
            max_features: DEFAULT_MAX_FEATURES,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

fn default_num_recommendations() -> usize {
    DEFAULT_NUM_RECOMMENDATIONS
}

fn default_max_features() -> usize {
    DEFAULT_MAX_FEATURES
}

fn default_similarity_threshold() -> f32 {
    DEFAULT_SIMILARITY_THRESHOLD
}

impl RecommendOptions {
    pub fn validate(&self) -> Result<(), RecommendError> {
        if self.max_features == 0 {
            return Err(RecommendError::invalid(
                "max_features",
                "must be greater than 0",
            ));
        }

        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(RecommendError::invalid(
                "similarity_threshold",
                format!("must be between 0.0 and 1.0, got {}", self.similarity_threshold),
            ));
        }

        Ok(())
    }

    /// Apply per-request overrides on top of these options and validate the result.
    pub fn with_overrides(&self, overrides: &RecommendOverrides) -> Result<Self, RecommendError> {
        let mut opts = self.clone();

        if let Some(num) = overrides.num_recommendations {
            opts.num_recommendations = usize::try_from(num).map_err(|_| {
                RecommendError::invalid(
                    "num_recommendations",
                    format!("must not be negative, got {num}"),
                )
            })?;
        }

        if let Some(max_features) = overrides.max_features {
            opts.max_features = usize::try_from(max_features).map_err(|_| {
                RecommendError::invalid(
                    "max_features",
                    format!("must be greater than 0, got {max_features}"),
                )
            })?;
        }

        if let Some(threshold) = overrides.similarity_threshold {
            opts.similarity_threshold = threshold;
        }

        opts.validate()?;

        Ok(opts)
    }
}

/// Optional per-request values, signed so that negative input can be rejected
/// instead of failing deserialization.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_recommendations: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_features: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f32>,
}
