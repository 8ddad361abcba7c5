//! Segment labels, the `Segmenter` capability and the clustering strategy

use std::fmt;

use ndarray::Array2;
use tracing::info;

use crate::config::ClusterConfig;
use crate::data::CustomerRecord;
use crate::error::SegmentError;
use crate::features::{prepare_features, StandardScaler};
use crate::model::{fit_kmeans, KMeansModel};

/// Named value segment, in ascending order of value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    LowValue,
    MediumValue,
    HighValue,
    Vip,
}

impl Segment {
    pub const ASCENDING: [Segment; 4] = [
        Segment::LowValue,
        Segment::MediumValue,
        Segment::HighValue,
        Segment::Vip,
    ];

    /// Label for an ascending ordinal position
    pub fn from_rank(rank: usize) -> Option<Self> {
        Self::ASCENDING.get(rank).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::LowValue => "Low Value",
            Segment::MediumValue => "Medium Value",
            Segment::HighValue => "High Value",
            Segment::Vip => "VIP",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Segment assigned to one customer
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentAssignment {
    pub customer_id: String,
    pub segment: Segment,
    /// Centrality in `(0, 1]`
    pub segment_score: f64,
    pub cluster_id: usize,
}

impl SegmentAssignment {
    pub fn new(customer_id: impl Into<String>, segment: Segment, segment_score: f64, cluster_id: usize) -> Self {
        Self {
            customer_id: customer_id.into(),
            segment,
            segment_score,
            cluster_id,
        }
    }
}

/// A segmentation strategy.
///
/// Implementations return exactly one assignment per customer, in input
/// order, and an empty vector for empty input.
pub trait Segmenter: Send + Sync {
    fn segment(&self, customers: &[CustomerRecord]) -> crate::Result<Vec<SegmentAssignment>>;

    /// Stable name for logging
    fn name(&self) -> &str;
}

pub(crate) fn label_for(rank: usize) -> crate::Result<Segment> {
    Segment::from_rank(rank).ok_or_else(|| {
        SegmentError::InvalidConfig(format!("no segment label for position {}", rank))
    })
}

/// `1 / (1 + distance)`
fn centrality_score(distance: f64) -> crate::Result<f64> {
    if !distance.is_finite() || distance < 0.0 {
        return Err(SegmentError::Numeric(format!(
            "distance to centroid is {}",
            distance
        )));
    }
    Ok(1.0 / (1.0 + distance))
}

/// K-Means segmentation on standardized orders and spend
#[derive(Debug, Clone, Default)]
pub struct ClusterSegmenter {
    config: ClusterConfig,
}

impl ClusterSegmenter {
    pub fn new(config: ClusterConfig) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Fit the clustering and keep everything needed to classify new customers.
    ///
    /// Returns `None` for empty input.
    pub fn fit(&self, customers: &[CustomerRecord]) -> crate::Result<Option<FittedSegmentation>> {
        if customers.is_empty() {
            return Ok(None);
        }

        let prepared = prepare_features(customers)?;
        let k = self.config.max_clusters.min(customers.len());
        let model = fit_kmeans(
            &prepared.features,
            k,
            self.config.seed,
            self.config.max_iterations,
        )?
        .rank_by_value();

        let assignments = customers
            .iter()
            .zip(prepared.features.outer_iter())
            .zip(model.labels.iter())
            .map(|((customer, point), &cluster)| -> crate::Result<SegmentAssignment> {
                let score = centrality_score(model.distance_to_centroid(point, cluster))?;
                Ok(SegmentAssignment::new(
                    customer.customer_id.clone(),
                    label_for(cluster)?,
                    score,
                    cluster,
                ))
            })
            .collect::<crate::Result<Vec<_>>>()?;

        info!(
            customers = customers.len(),
            k,
            clusters = model.n_clusters,
            iterations = model.n_iterations,
            inertia = model.inertia,
            "clustering segmentation complete"
        );

        Ok(Some(FittedSegmentation {
            scaler: prepared.scaler,
            features: prepared.features,
            model,
            assignments,
        }))
    }
}

impl Segmenter for ClusterSegmenter {
    fn segment(&self, customers: &[CustomerRecord]) -> crate::Result<Vec<SegmentAssignment>> {
        Ok(self
            .fit(customers)?
            .map(|fitted| fitted.assignments)
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "kmeans"
    }
}

/// Result of one clustering run: scaler, ranked model and assignments
#[derive(Debug, Clone)]
pub struct FittedSegmentation {
    pub scaler: StandardScaler,
    /// Standardized training features, one row per customer
    pub features: Array2<f64>,
    /// Model whose cluster ids are already ranked by value
    pub model: KMeansModel,
    pub assignments: Vec<SegmentAssignment>,
}

impl FittedSegmentation {
    /// Assign a customer that was not part of the fit
    pub fn classify(&self, customer: &CustomerRecord) -> crate::Result<SegmentAssignment> {
        let point = self
            .scaler
            .transform_row(&[customer.orders_or_zero(), customer.spend_or_zero()])?;
        let cluster = self.model.predict(point.view());
        let score = centrality_score(self.model.distance_to_centroid(point.view(), cluster))?;

        Ok(SegmentAssignment::new(
            customer.customer_id.clone(),
            label_for(cluster)?,
            score,
            cluster,
        ))
    }

    /// Number of customers per segment, in ascending segment order
    pub fn segment_sizes(&self) -> Vec<(Segment, usize)> {
        self.model
            .cluster_sizes()
            .into_iter()
            .enumerate()
            .filter_map(|(cluster, size)| Segment::from_rank(cluster).map(|s| (s, size)))
            .collect()
    }
}
