//! Command-line interface definitions and argument parsing

use clap::{Parser, ValueEnum};

use crate::config::{ClusterConfig, QuantileConfig};
use crate::error::SegmentError;

/// Segmentation strategy selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Seeded K-Means on standardized orders and spend
    Cluster,
    /// Equal-count spend buckets
    Quantile,
}

/// Customer value segmentation from lifetime orders and spend
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file (customer_id, count_lifetime_orders, lifetime_spend)
    #[arg(short, long, default_value = "customers.csv")]
    pub input: String,

    /// Segmentation strategy
    #[arg(short, long, value_enum, default_value_t = Strategy::Cluster)]
    pub strategy: Strategy,

    /// Maximum number of segments (1-4)
    #[arg(short = 'k', long, default_value = "4")]
    pub clusters: usize,

    /// Seed for K-Means initialization
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Maximum iterations for K-Means algorithm
    #[arg(long, default_value = "300")]
    pub max_iters: usize,

    /// Classify one new customer against the clustering: "orders,spend"
    /// (cluster strategy only). Example: --predict "12,850.0"
    #[arg(short, long)]
    pub predict: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn cluster_config(&self) -> ClusterConfig {
        ClusterConfig::default()
            .with_max_clusters(self.clusters)
            .with_seed(self.seed)
            .with_max_iterations(self.max_iters)
    }

    pub fn quantile_config(&self) -> QuantileConfig {
        QuantileConfig::default().with_max_buckets(self.clusters)
    }

    /// Reject argument combinations that cannot run
    pub fn validate(&self) -> crate::Result<()> {
        if self.predict.is_some() && self.strategy != Strategy::Cluster {
            return Err(SegmentError::InvalidConfig(
                "--predict classifies against the clustering and requires --strategy cluster"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Parse the predict string, expected format "orders,spend"
    pub fn parse_predict_values(&self) -> crate::Result<Option<(i64, f64)>> {
        let Some(ref predict_str) = self.predict else {
            return Ok(None);
        };

        let parts: Vec<&str> = predict_str.split(',').collect();
        if parts.len() != 2 {
            return Err(SegmentError::InvalidConfig(
                "predict values must be in format 'orders,spend'".to_string(),
            ));
        }

        let orders: i64 = parts[0].trim().parse().map_err(|_| {
            SegmentError::InvalidConfig(format!("invalid order count: {}", parts[0]))
        })?;
        let spend: f64 = parts[1]
            .trim()
            .parse()
            .map_err(|_| SegmentError::InvalidConfig(format!("invalid spend: {}", parts[1])))?;

        Ok(Some((orders, spend)))
    }
}
