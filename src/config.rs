//! Segmentation parameters

use crate::error::SegmentError;

/// Number of named value segments
pub const MAX_SEGMENTS: usize = 4;

/// Parameters for clustering-based segmentation
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    /// Upper bound on clusters; the run uses `min(max_clusters, customers)`
    pub max_clusters: usize,
    /// Seed for centroid initialization
    pub seed: u64,
    /// Maximum Lloyd iterations
    pub max_iterations: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            max_clusters: MAX_SEGMENTS,
            seed: 42,
            max_iterations: 300,
        }
    }
}

impl ClusterConfig {
    pub fn with_max_clusters(mut self, max_clusters: usize) -> Self {
        self.max_clusters = max_clusters;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        if !(1..=MAX_SEGMENTS).contains(&self.max_clusters) {
            return Err(SegmentError::InvalidConfig(format!(
                "max clusters must be between 1 and {}, got {}",
                MAX_SEGMENTS, self.max_clusters
            )));
        }
        if self.max_iterations == 0 {
            return Err(SegmentError::InvalidConfig(
                "max iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters for quantile-based segmentation
#[derive(Debug, Clone, PartialEq)]
pub struct QuantileConfig {
    pub max_buckets: usize,
}

impl Default for QuantileConfig {
    fn default() -> Self {
        Self {
            max_buckets: MAX_SEGMENTS,
        }
    }
}

impl QuantileConfig {
    pub fn with_max_buckets(mut self, max_buckets: usize) -> Self {
        self.max_buckets = max_buckets;
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        if !(1..=MAX_SEGMENTS).contains(&self.max_buckets) {
            return Err(SegmentError::InvalidConfig(format!(
                "max buckets must be between 1 and {}, got {}",
                MAX_SEGMENTS, self.max_buckets
            )));
        }
        Ok(())
    }
}
