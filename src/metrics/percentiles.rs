use hdrhistogram::Histogram;
use serde::Serialize;

/// Quantiles reported for node poll latency (µs). All zero until the first
/// poll has been recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatencyQuantiles {
    pub count: u64,
    pub min: u64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub max: u64,
    pub mean: f64,
}

impl From<&Histogram<u64>> for LatencyQuantiles {
    fn from(hist: &Histogram<u64>) -> Self {
        match hist.len() {
            0 => Self::default(),
            count => Self {
                count,
                min: hist.min(),
                p50: hist.value_at_quantile(0.5),
                p90: hist.value_at_quantile(0.9),
                p99: hist.value_at_quantile(0.99),
                max: hist.max(),
                mean: hist.mean(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_histogram_is_all_zero() {
        let hist = Histogram::<u64>::new(3).unwrap();
        assert_eq!(LatencyQuantiles::from(&hist), LatencyQuantiles::default());
    }

    #[test]
    fn quantiles_are_ordered() {
        let mut hist = Histogram::<u64>::new(3).unwrap();
        for us in 1..=1000 {
            hist.record(us).unwrap();
        }
        let q = LatencyQuantiles::from(&hist);
        assert_eq!(q.count, 1000);
        assert_eq!(q.min, 1);
        assert!(q.p50 <= q.p90 && q.p90 <= q.p99 && q.p99 <= q.max);
        assert!((q.p50 as i64 - 500).abs() <= 1);
        assert!((q.mean - 500.5).abs() < 1.0);
    }
}
