//! ValueForge: customer value segmentation from lifetime orders and spend
//!
//! Customers are assigned to `Low Value`, `Medium Value`, `High Value` or
//! `VIP` either by seeded K-Means over standardized features or by spend
//! quantiles. Both strategies implement [`Segmenter`].

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod quantile;
pub mod segment;

// Re-export public items for easier access
pub use cli::{Args, Strategy};
pub use config::{ClusterConfig, QuantileConfig};
pub use data::{assignments_to_frame, load_customers_csv, CustomerRecord, CustomerTable};
pub use error::SegmentError;
pub use model::{fit_kmeans, KMeansModel};
pub use pipeline::{segment_frame, segment_table};
pub use quantile::QuantileSegmenter;
pub use segment::{ClusterSegmenter, FittedSegmentation, Segment, SegmentAssignment, Segmenter};

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, SegmentError>;
