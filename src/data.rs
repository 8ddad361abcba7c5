//! Customer table loading and output table assembly using Polars

use std::collections::HashSet;
use std::path::Path;

use polars::prelude::*;
use tracing::{debug, info};

use crate::error::SegmentError;
use crate::segment::SegmentAssignment;

pub const CUSTOMER_ID: &str = "customer_id";
pub const LIFETIME_ORDERS: &str = "count_lifetime_orders";
pub const LIFETIME_SPEND: &str = "lifetime_spend";

/// Output columns, in the order downstream consumers read them.
pub const OUTPUT_COLUMNS: [&str; 4] = ["customer_id", "segment", "segment_score", "cluster_id"];

/// One row of the upstream customer aggregate table
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRecord {
    pub customer_id: String,
    /// Lifetime order count; `None` when the upstream value is null
    pub count_lifetime_orders: Option<i64>,
    /// Lifetime spend; `None` when the upstream value is null
    pub lifetime_spend: Option<f64>,
}

impl CustomerRecord {
    pub fn new(customer_id: impl Into<String>, orders: Option<i64>, spend: Option<f64>) -> Self {
        Self {
            customer_id: customer_id.into(),
            count_lifetime_orders: orders,
            lifetime_spend: spend,
        }
    }

    /// Order count with nulls treated as zero
    pub fn orders_or_zero(&self) -> f64 {
        self.count_lifetime_orders.unwrap_or(0) as f64
    }

    /// Spend with nulls treated as zero
    pub fn spend_or_zero(&self) -> f64 {
        self.lifetime_spend.unwrap_or(0.0)
    }
}

/// Customer table with column names normalized to lower case
#[derive(Debug, Clone)]
pub struct CustomerTable {
    df: DataFrame,
}

impl CustomerTable {
    /// Wrap an upstream frame, matching required columns case-insensitively.
    ///
    /// Every column is renamed to lower case. Rows are neither filtered nor
    /// reordered.
    pub fn from_frame(mut df: DataFrame) -> crate::Result<Self> {
        let normalized: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_lowercase())
            .collect();

        let mut seen = HashSet::new();
        for name in &normalized {
            if !seen.insert(name.as_str()) {
                return Err(SegmentError::Schema(format!(
                    "column `{}` appears more than once when compared case-insensitively",
                    name
                )));
            }
        }

        for required in [CUSTOMER_ID, LIFETIME_ORDERS, LIFETIME_SPEND] {
            if !seen.contains(required) {
                return Err(SegmentError::Schema(format!(
                    "required column `{}` is missing",
                    required
                )));
            }
        }

        df.set_column_names(&normalized)?;
        debug!(rows = df.height(), columns = df.width(), "customer table normalized");

        Ok(Self { df })
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    /// Materialize the rows as records, preserving row order
    pub fn records(&self) -> crate::Result<Vec<CustomerRecord>> {
        let ids = self.df.column(CUSTOMER_ID)?.cast(&DataType::String)?;
        let orders = self.numeric_column(LIFETIME_ORDERS, &DataType::Int64)?;
        let spend = self.numeric_column(LIFETIME_SPEND, &DataType::Float64)?;

        let mut seen = HashSet::with_capacity(self.df.height());
        let mut records = Vec::with_capacity(self.df.height());

        for ((id, orders), spend) in ids
            .str()?
            .into_iter()
            .zip(orders.i64()?.into_iter())
            .zip(spend.f64()?.into_iter())
        {
            let id = id.ok_or_else(|| {
                SegmentError::Schema(format!("null `{}` at row {}", CUSTOMER_ID, records.len()))
            })?;
            if !seen.insert(id) {
                return Err(SegmentError::Schema(format!(
                    "duplicate `{}` value `{}`",
                    CUSTOMER_ID, id
                )));
            }
            records.push(CustomerRecord::new(id, orders, spend));
        }

        Ok(records)
    }

    /// Cast a numeric column without turning unparseable values into nulls.
    ///
    /// Only values that are already null count as missing.
    fn numeric_column(&self, name: &str, dtype: &DataType) -> crate::Result<Series> {
        self.df
            .column(name)?
            .strict_cast(dtype)
            .map_err(|e| {
                SegmentError::Schema(format!(
                    "column `{}` holds values that are not {}: {}",
                    name, dtype, e
                ))
            })
    }
}

/// Load a headered CSV file into a customer table
///
/// # Arguments
/// * `file_path` - Path to a CSV file exposing the three customer columns
///
/// # Returns
/// * `CustomerTable` with normalized column names
pub fn load_customers_csv(file_path: impl AsRef<Path>) -> crate::Result<CustomerTable> {
    let path = file_path.as_ref();
    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .finish()?
        .collect()?;

    info!(path = %path.display(), rows = df.height(), "loaded customer table");
    CustomerTable::from_frame(df)
}

/// Build the output table from segment assignments.
///
/// The four output columns are always present, even for zero rows.
pub fn assignments_to_frame(assignments: &[SegmentAssignment]) -> crate::Result<DataFrame> {
    let ids: Vec<&str> = assignments.iter().map(|a| a.customer_id.as_str()).collect();
    let segments: Vec<&str> = assignments.iter().map(|a| a.segment.as_str()).collect();
    let scores: Vec<f64> = assignments.iter().map(|a| a.segment_score).collect();
    let clusters: Vec<i64> = assignments.iter().map(|a| a.cluster_id as i64).collect();

    let df = DataFrame::new(vec![
        Series::new(OUTPUT_COLUMNS[0], ids),
        Series::new(OUTPUT_COLUMNS[1], segments),
        Series::new(OUTPUT_COLUMNS[2], scores),
        Series::new(OUTPUT_COLUMNS[3], clusters),
    ])?;

    Ok(df)
}
