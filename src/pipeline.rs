//! Table in, table out: adapter, segmenter and output assembly

use polars::prelude::DataFrame;
use tracing::info;

use crate::data::{assignments_to_frame, CustomerTable};
use crate::segment::Segmenter;

/// Segment every customer of an upstream frame.
///
/// Returns a frame with `customer_id, segment, segment_score, cluster_id`,
/// one row per input row in input order. Empty input gives an empty frame
/// with the same columns.
pub fn segment_frame(df: DataFrame, segmenter: &dyn Segmenter) -> crate::Result<DataFrame> {
    segment_table(&CustomerTable::from_frame(df)?, segmenter)
}

/// Segment an already-normalized customer table
pub fn segment_table(table: &CustomerTable, segmenter: &dyn Segmenter) -> crate::Result<DataFrame> {
    let records = table.records()?;
    let assignments = if records.is_empty() {
        Vec::new()
    } else {
        segmenter.segment(&records)?
    };

    info!(
        strategy = segmenter.name(),
        rows = assignments.len(),
        "segmentation table built"
    );
    assignments_to_frame(&assignments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::OUTPUT_COLUMNS;
    use crate::quantile::QuantileSegmenter;
    use crate::segment::ClusterSegmenter;
    use polars::prelude::*;

    #[test]
    fn test_empty_frame_keeps_output_schema() {
        let df = df!(
            "customer_id" => Vec::<i64>::new(),
            "count_lifetime_orders" => Vec::<i64>::new(),
            "lifetime_spend" => Vec::<f64>::new(),
        )
        .unwrap();

        for segmenter in [
            &ClusterSegmenter::default() as &dyn Segmenter,
            &QuantileSegmenter::default(),
        ] {
            let out = segment_frame(df.clone(), segmenter).unwrap();
            assert_eq!(out.height(), 0);
            assert_eq!(out.get_column_names(), &OUTPUT_COLUMNS);
        }
    }

    #[test]
    fn test_missing_column_surfaces_schema_error() {
        let df = df!("customer_id" => &[1i64], "lifetime_spend" => &[2.0f64]).unwrap();
        let err = segment_frame(df, &ClusterSegmenter::default()).unwrap_err();
        assert!(err.is_schema());
    }

    #[test]
    fn test_uppercase_columns_accepted() {
        let df = df!(
            "CUSTOMER_ID" => &[1i64, 2],
            "Count_Lifetime_Orders" => &[Some(1i64), None],
            "LIFETIME_SPEND" => &[None, Some(7.5f64)],
        )
        .unwrap();

        let out = segment_frame(df, &ClusterSegmenter::default()).unwrap();
        assert_eq!(out.shape(), (2, 4));
    }

    #[test]
    fn test_one_fit_serves_table_and_statistics() {
        let df = df!(
            "customer_id" => &["a", "b", "c", "d", "e", "f"],
            "count_lifetime_orders" => &[1i64, 2, 1, 20, 22, 40],
            "lifetime_spend" => &[10.0f64, 12.0, 9.0, 400.0, 420.0, 2000.0],
        )
        .unwrap();
        let table = CustomerTable::from_frame(df).unwrap();
        let segmenter = ClusterSegmenter::default();

        let fitted = segmenter.fit(&table.records().unwrap()).unwrap().unwrap();
        let from_fit = assignments_to_frame(&fitted.assignments).unwrap();
        assert!(from_fit.equals(&segment_table(&table, &segmenter).unwrap()));

        let clusters = from_fit.column("cluster_id").unwrap().i64().unwrap();
        for (cluster, (_, size)) in fitted.segment_sizes().into_iter().enumerate() {
            let rows = clusters
                .into_iter()
                .filter(|c| *c == Some(cluster as i64))
                .count();
            assert_eq!(rows, size);
        }
        assert_eq!(
            fitted.segment_sizes().iter().map(|(_, n)| n).sum::<usize>(),
            table.height()
        );
    }
}
