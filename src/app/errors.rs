use crate::recommend::RecommendError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("book not found")]
    NotFound,

    #[error("book with this isbn already exists at id {0}")]
    AlreadyExists(u64),

    #[error("{0}")]
    Recommend(#[from] RecommendError),

    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),

    #[error("csv error: {0:?}")]
    Csv(#[from] csv::Error),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}
