//! Seeded K-Means clustering of standardized feature vectors using linfa

use std::cmp::Ordering;

use linfa::prelude::*;
use linfa_clustering::{KMeans, KMeansError, KMeansInit};
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2, ArrayView1, Axis, Ix1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};

use crate::error::SegmentError;

/// Fitted K-Means model
#[derive(Debug, Clone)]
pub struct KMeansModel {
    /// Number of clusters
    pub n_clusters: usize,
    /// Cluster assignment for every training row
    pub labels: Array1<usize>,
    /// Cluster centroids in standardized space, one row per cluster
    pub centroids: Array2<f64>,
    /// Within-cluster sum of squares
    pub inertia: f64,
    /// Lloyd iterations actually run
    pub n_iterations: usize,
    /// Whether assignments stopped changing before the iteration cap
    pub converged: bool,
}

impl KMeansModel {
    /// Index of the centroid nearest to `point`; ties go to the lowest index
    pub fn predict(&self, point: ArrayView1<f64>) -> usize {
        nearest_centroid(point, &self.centroids).0
    }

    /// Euclidean distance from `point` to the centroid of `cluster`
    pub fn distance_to_centroid(&self, point: ArrayView1<f64>, cluster: usize) -> f64 {
        euclidean_distance(point, self.centroids.row(cluster))
    }

    /// Number of training rows per cluster
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for &label in self.labels.iter() {
            if label < self.n_clusters {
                sizes[label] += 1;
            }
        }
        sizes
    }

    /// Centroid "value" used for ranking: sum of the standardized coordinates
    pub fn centroid_value(&self, cluster: usize) -> f64 {
        self.centroids.row(cluster).sum()
    }

    /// Renumber clusters by ascending centroid value.
    ///
    /// Empty clusters are dropped, so after ranking every cluster id in
    /// `0..n_clusters` has at least one member. Ties keep the original order.
    pub fn rank_by_value(self) -> Self {
        let sizes = self.cluster_sizes();
        let mut order: Vec<usize> = (0..self.n_clusters).filter(|&c| sizes[c] > 0).collect();
        order.sort_by(|&a, &b| {
            self.centroid_value(a)
                .total_cmp(&self.centroid_value(b))
                .then(a.cmp(&b))
        });

        let mut remap = vec![usize::MAX; self.n_clusters];
        for (rank, &cluster) in order.iter().enumerate() {
            remap[cluster] = rank;
        }

        if order.len() < self.n_clusters {
            debug!(
                dropped = self.n_clusters - order.len(),
                "dropping empty clusters before ranking"
            );
        }

        Self {
            n_clusters: order.len(),
            labels: self.labels.mapv(|label| remap[label]),
            centroids: self.centroids.select(Axis(0), &order),
            ..self
        }
    }

    /// Mean silhouette coefficient over the first `sample_size` rows
    pub fn compute_silhouette_sample(&self, features: &Array2<f64>, sample_size: usize) -> f64 {
        let n_samples = features.nrows().min(sample_size).min(self.labels.len());
        if n_samples < 2 || self.n_clusters < 2 {
            return 0.0;
        }

        let total: f64 = (0..n_samples)
            .map(|i| {
                let own = self.labels[i];
                let mut sums = vec![0.0; self.n_clusters];
                let mut counts = vec![0usize; self.n_clusters];

                for j in (0..n_samples).filter(|&j| j != i) {
                    let label = self.labels[j];
                    sums[label] += euclidean_distance(features.row(i), features.row(j));
                    counts[label] += 1;
                }

                let a = if counts[own] == 0 {
                    0.0
                } else {
                    sums[own] / counts[own] as f64
                };
                let b = (0..self.n_clusters)
                    .filter(|&c| c != own && counts[c] > 0)
                    .map(|c| sums[c] / counts[c] as f64)
                    .fold(f64::INFINITY, f64::min);

                if b.is_infinite() || a.max(b) == 0.0 {
                    0.0
                } else {
                    (b - a) / a.max(b)
                }
            })
            .sum();

        total / n_samples as f64
    }
}

/// Fit K-Means on standardized features
///
/// # Arguments
/// * `features` - Standardized features, one row per customer
/// * `n_clusters` - Number of clusters, between 1 and the number of rows
/// * `seed` - Seed for the k-means++ initializer
/// * `max_iters` - Maximum number of Lloyd iterations
///
/// # Returns
/// * Fitted `KMeansModel` with raw (unranked) cluster indices
pub fn fit_kmeans(
    features: &Array2<f64>,
    n_clusters: usize,
    seed: u64,
    max_iters: usize,
) -> crate::Result<KMeansModel> {
    let n_samples = features.nrows();
    if n_clusters == 0 || n_clusters > n_samples {
        return Err(SegmentError::InvalidConfig(format!(
            "number of clusters ({}) must be between 1 and the number of rows ({})",
            n_clusters, n_samples
        )));
    }
    if max_iters == 0 {
        return Err(SegmentError::InvalidConfig(
            "max iterations must be at least 1".to_string(),
        ));
    }

    // Dummy targets for unsupervised learning
    let dataset = Dataset::new(features.clone(), Array1::<usize>::zeros(n_samples));

    // One linfa fit per Lloyd step: k-means++ for the first, then restart
    // from the previous centroids so assignment changes can be observed.
    let mut model = lloyd_step(&dataset, n_clusters, seed, KMeansInit::KMeansPlusPlus)?;
    let mut labels: Array1<usize> = model.predict(&dataset);
    let mut n_iterations = 1;
    let mut converged = false;

    while n_iterations < max_iters {
        let init = KMeansInit::Precomputed(model.centroids().clone());
        model = lloyd_step(&dataset, n_clusters, seed, init)?;
        n_iterations += 1;

        let next: Array1<usize> = model.predict(&dataset);
        let changed = next.iter().zip(labels.iter()).filter(|(a, b)| a != b).count();
        labels = next;

        debug!(iteration = n_iterations, changed, "k-means iteration");
        if changed == 0 {
            converged = true;
            break;
        }
    }

    if !converged {
        warn!(max_iters, "k-means stopped at the iteration cap");
    }

    let centroids = member_means(features, &labels, model.centroids());
    let inertia = compute_inertia(features, &labels, &centroids);
    if !inertia.is_finite() {
        return Err(SegmentError::Numeric(format!(
            "within-cluster sum of squares is {}",
            inertia
        )));
    }

    Ok(KMeansModel {
        n_clusters,
        labels,
        centroids,
        inertia,
        n_iterations,
        converged,
    })
}

/// Run a single assignment/update pass with linfa's K-Means
fn lloyd_step(
    dataset: &Dataset<f64, usize, Ix1>,
    n_clusters: usize,
    seed: u64,
    init: KMeansInit<f64>,
) -> crate::Result<KMeans<f64, L2Dist>> {
    let model: Result<KMeans<f64, L2Dist>, KMeansError> =
        KMeans::params_with(n_clusters, StdRng::seed_from_u64(seed), L2Dist)
            .n_runs(1)
            .max_n_iterations(1)
            .init_method(init)
            .fit(dataset);
    Ok(model?)
}

/// Centroid of each cluster as the mean of its members.
///
/// Empty clusters keep the centroid they were fitted with.
fn member_means(features: &Array2<f64>, labels: &Array1<usize>, fitted: &Array2<f64>) -> Array2<f64> {
    let mut sums = Array2::<f64>::zeros(fitted.raw_dim());
    let mut counts = vec![0usize; fitted.nrows()];

    for (point, &label) in features.outer_iter().zip(labels.iter()) {
        let mut row = sums.row_mut(label);
        row += &point;
        counts[label] += 1;
    }

    let mut centroids = fitted.clone();
    for (c, &count) in counts.iter().enumerate() {
        if count > 0 {
            let mean = &sums.row(c) / count as f64;
            centroids.row_mut(c).assign(&mean);
        }
    }
    centroids
}

fn nearest_centroid(point: ArrayView1<f64>, centroids: &Array2<f64>) -> (usize, f64) {
    centroids
        .outer_iter()
        .map(|c| squared_distance(point, c))
        .enumerate()
        .fold((0, f64::INFINITY), |best, (idx, d)| {
            match d.partial_cmp(&best.1) {
                Some(Ordering::Less) => (idx, d),
                _ => best,
            }
        })
}

fn compute_inertia(features: &Array2<f64>, labels: &Array1<usize>, centroids: &Array2<f64>) -> f64 {
    features
        .outer_iter()
        .zip(labels.iter())
        .map(|(p, &label)| squared_distance(p, centroids.row(label)))
        .sum()
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Euclidean distance between two points
pub fn euclidean_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    squared_distance(a, b).sqrt()
}
