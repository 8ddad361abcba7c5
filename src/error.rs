//! Segmentation error types.

use linfa_clustering::KMeansError;
use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SegmentError {
    /// Required column missing, ambiguous column names, or duplicate ids.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Non-finite value produced while standardizing or measuring distances.
    #[error("Numeric error: {0}")]
    Numeric(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Clustering error: {0}")]
    Clustering(#[from] KMeansError),

    #[error("Table error: {0}")]
    Polars(#[from] PolarsError),
}

impl SegmentError {
    pub fn is_schema(&self) -> bool {
        matches!(self, SegmentError::Schema(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, SegmentError::Numeric(_))
    }
}
