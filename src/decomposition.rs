//! Splits the observed raw rank delta into the part explained by filtering
//! alone and the residual left over for reordering.
//!
//! Dropping domains from the top of a list mechanically raises the delta of
//! every survivor, so the naive mean delta mostly measures filtering. The
//! expected delta from filtering is the distance between the average original
//! position of kept domains and the average position they receive simply by
//! being packed into the shorter post list.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::stats::DescriptiveStats;

pub const DEFAULT_BUCKET_WIDTH: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteringEffect {
    /// Pre-ranking positions of domains that survived into the post ranking.
    pub kept_positions: DescriptiveStats,
    /// Pre-ranking positions of domains missing from the post ranking.
    pub dropped_positions: DescriptiveStats,
    pub avg_post_len: f64,
    /// `(avg_post_len + 1) / 2`
    pub mechanical_post_position: f64,
    pub expected_delta: Option<f64>,
    pub observed_mean_delta: Option<f64>,
    pub residual: Option<f64>,
    pub buckets: Vec<PositionBucket>,
}

/// Kept vs dropped counts for one range of pre-ranking positions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionBucket {
    pub start: usize,
    pub end: usize,
    pub kept: usize,
    pub dropped: usize,
    pub keep_rate: f64,
}

/// Corpus-level inputs to the decomposition.
#[derive(Debug, Clone, Copy)]
pub struct FilteringInputs<'a> {
    pub kept_positions: &'a [usize],
    pub dropped_positions: &'a [usize],
    pub raw_deltas: &'a [i64],
    pub total_post: usize,
    pub comparisons: usize,
    pub bucket_width: usize,
}

pub fn decompose(inputs: FilteringInputs<'_>) -> FilteringEffect {
    let kept: DescriptiveStats = inputs.kept_positions.iter().map(|&p| p as f64).collect();
    let dropped: DescriptiveStats = inputs.dropped_positions.iter().map(|&p| p as f64).collect();
    let raw: DescriptiveStats = inputs.raw_deltas.iter().map(|&d| d as f64).collect();

    let avg_post_len = if inputs.comparisons == 0 {
        0.0
    } else {
        inputs.total_post as f64 / inputs.comparisons as f64
    };
    let mechanical_post_position = (avg_post_len + 1.0) / 2.0;

    let expected_delta = (!kept.is_empty() && inputs.comparisons > 0)
        .then(|| kept.mean - mechanical_post_position);
    let observed_mean_delta = (!raw.is_empty()).then_some(raw.mean);
    let residual = observed_mean_delta
        .zip(expected_delta)
        .map(|(observed, expected)| observed - expected);

    FilteringEffect {
        kept_positions: kept,
        dropped_positions: dropped,
        avg_post_len,
        mechanical_post_position,
        expected_delta,
        observed_mean_delta,
        residual,
        buckets: position_buckets(
            inputs.kept_positions,
            inputs.dropped_positions,
            inputs.bucket_width,
        ),
    }
}

/// Groups 1-indexed positions into `[1, w]`, `[w + 1, 2w]`, ... in ascending
/// order. Only buckets that received at least one position are returned.
pub fn position_buckets(kept: &[usize], dropped: &[usize], width: usize) -> Vec<PositionBucket> {
    let width = width.max(1);
    let mut counts: BTreeMap<usize, (usize, usize)> = BTreeMap::new();

    for &p in kept {
        counts.entry(p.saturating_sub(1) / width).or_default().0 += 1;
    }
    for &p in dropped {
        counts.entry(p.saturating_sub(1) / width).or_default().1 += 1;
    }

    counts
        .into_iter()
        .map(|(index, (kept, dropped))| {
            let total = kept + dropped;
            PositionBucket {
                start: index * width + 1,
                end: (index + 1) * width,
                kept,
                dropped,
                keep_rate: if total == 0 {
                    0.0
                } else {
                    kept as f64 / total as f64
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn top_heavy_filtering_explains_positive_delta() {
        // pre = [x, y, a, b], post = [a, b]: a and b each gain two places
        let effect = decompose(FilteringInputs {
            kept_positions: &[3, 4],
            dropped_positions: &[1, 2],
            raw_deltas: &[2, 2],
            total_post: 2,
            comparisons: 1,
            bucket_width: DEFAULT_BUCKET_WIDTH,
        });

        assert!((effect.mechanical_post_position - 1.5).abs() < EPS);
        assert!((effect.expected_delta.unwrap() - 2.0).abs() < EPS);
        assert!((effect.observed_mean_delta.unwrap() - 2.0).abs() < EPS);
        assert!(effect.residual.unwrap().abs() < EPS);
    }

    #[test]
    fn nothing_kept_has_no_expected_delta() {
        let effect = decompose(FilteringInputs {
            kept_positions: &[],
            dropped_positions: &[1, 2, 3],
            raw_deltas: &[],
            total_post: 0,
            comparisons: 1,
            bucket_width: 5,
        });

        assert_eq!(effect.kept_positions, DescriptiveStats::default());
        assert_eq!(effect.expected_delta, None);
        assert_eq!(effect.observed_mean_delta, None);
        assert_eq!(effect.residual, None);
        assert_eq!(effect.dropped_positions.n, 3);
    }

    #[test]
    fn no_comparisons_is_all_empty() {
        let effect = decompose(FilteringInputs {
            kept_positions: &[],
            dropped_positions: &[],
            raw_deltas: &[],
            total_post: 0,
            comparisons: 0,
            bucket_width: 5,
        });
        assert_eq!(effect.avg_post_len, 0.0);
        assert_eq!(effect.expected_delta, None);
        assert!(effect.buckets.is_empty());
    }

    #[test]
    fn buckets_are_numeric_and_rated() {
        let buckets = position_buckets(&[1, 2, 12], &[3, 6, 11, 12], 5);
        let ranges: Vec<(usize, usize)> = buckets.iter().map(|b| (b.start, b.end)).collect();
        assert_eq!(ranges, vec![(1, 5), (6, 10), (11, 15)]);

        assert_eq!((buckets[0].kept, buckets[0].dropped), (2, 1));
        assert!((buckets[0].keep_rate - 2.0 / 3.0).abs() < EPS);
        assert_eq!(buckets[1].keep_rate, 0.0);
        assert!((buckets[2].keep_rate - 1.0 / 3.0).abs() < EPS);
    }
}
