//! Rule-based segmentation by spend quantiles

use tracing::info;

use crate::config::QuantileConfig;
use crate::data::CustomerRecord;
use crate::segment::{label_for, SegmentAssignment, Segmenter};

/// Splits customers into equal-count buckets by lifetime spend.
///
/// Customers are ranked by spend, then order count, then input position.
/// The score is the customer's percentile rank, `(rank + 1) / n`.
#[derive(Debug, Clone, Default)]
pub struct QuantileSegmenter {
    config: QuantileConfig,
}

impl QuantileSegmenter {
    pub fn new(config: QuantileConfig) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl Segmenter for QuantileSegmenter {
    fn segment(&self, customers: &[CustomerRecord]) -> crate::Result<Vec<SegmentAssignment>> {
        let n = customers.len();
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            let (x, y) = (&customers[a], &customers[b]);
            x.spend_or_zero()
                .total_cmp(&y.spend_or_zero())
                .then(x.orders_or_zero().total_cmp(&y.orders_or_zero()))
                .then(a.cmp(&b))
        });

        let k = self.config.max_buckets.min(n);
        let mut slots: Vec<Option<SegmentAssignment>> = vec![None; n];
        for (rank, &row) in order.iter().enumerate() {
            let bucket = rank * k / n;
            slots[row] = Some(SegmentAssignment::new(
                customers[row].customer_id.clone(),
                label_for(bucket)?,
                (rank + 1) as f64 / n as f64,
                bucket,
            ));
        }

        info!(customers = n, buckets = k, "quantile segmentation complete");
        Ok(slots.into_iter().flatten().collect())
    }

    fn name(&self) -> &str {
        "quantile"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::Segment;

    fn customers(spend: &[Option<f64>]) -> Vec<CustomerRecord> {
        spend
            .iter()
            .enumerate()
            .map(|(i, &s)| CustomerRecord::new(format!("q{}", i), Some(1), s))
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(QuantileSegmenter::default().segment(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_eight_customers_two_per_bucket() {
        let input = customers(&[
            Some(80.0),
            Some(10.0),
            Some(70.0),
            Some(20.0),
            Some(60.0),
            Some(30.0),
            Some(50.0),
            Some(40.0),
        ]);
        let result = QuantileSegmenter::default().segment(&input).unwrap();

        let ids: Vec<&str> = result.iter().map(|a| a.customer_id.as_str()).collect();
        assert_eq!(ids, vec!["q0", "q1", "q2", "q3", "q4", "q5", "q6", "q7"]);

        let buckets: Vec<usize> = result.iter().map(|a| a.cluster_id).collect();
        assert_eq!(buckets, vec![3, 0, 3, 0, 2, 1, 2, 1]);
        assert_eq!(result[0].segment, Segment::Vip);
        assert_eq!(result[0].segment_score, 1.0);
        assert_eq!(result[1].segment_score, 0.125);
    }

    #[test]
    fn test_missing_spend_ranks_as_zero() {
        let result = QuantileSegmenter::default()
            .segment(&customers(&[Some(5.0), None]))
            .unwrap();
        assert_eq!(result[1].segment, Segment::LowValue);
        assert_eq!(result[0].segment, Segment::MediumValue);
    }

    #[test]
    fn test_single_customer() {
        let result = QuantileSegmenter::default()
            .segment(&customers(&[Some(42.0)]))
            .unwrap();
        assert_eq!(result, vec![SegmentAssignment::new("q0", Segment::LowValue, 1.0, 0)]);
    }

    #[test]
    fn test_labels_monotone_in_spend() {
        let input = customers(&[Some(3.0), Some(1.0), Some(9.0), Some(4.0), Some(1.5)]);
        let result = QuantileSegmenter::default().segment(&input).unwrap();

        let mut pairs: Vec<(f64, Segment)> = input
            .iter()
            .zip(&result)
            .map(|(c, a)| (c.spend_or_zero(), a.segment))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        assert!(pairs.windows(2).all(|w| w[0].1 <= w[1].1));
    }
}
