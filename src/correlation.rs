//! Rank correlation between the pre and post orderings of shared domains.
//!
//! Both statistics are computed over the overlap set only, using each shared
//! domain's absolute rank in the pre and post lists as paired observations.

use serde::{Serialize, Serializer};
use std::cmp::Ordering;

use crate::sequence::DomainRanking;

/// A correlation coefficient, or the fact that there was too little data to
/// compute one. Never collapse `NotComputable` into zero when averaging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correlation {
    Computed(f64),
    NotComputable { overlap_n: usize },
}

impl Correlation {
    pub fn value(&self) -> Option<f64> {
        match *self {
            Correlation::Computed(v) => Some(v),
            Correlation::NotComputable { .. } => None,
        }
    }

    pub fn is_computable(&self) -> bool {
        matches!(self, Correlation::Computed(_))
    }
}

impl Serialize for Correlation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

/// Dense 1-indexed ranks: the smallest value gets 1, the largest gets `n`.
///
/// Equal values are ranked by their original order rather than sharing an
/// averaged rank, so Spearman's rho computed from these ranks is an
/// approximation whenever the input has ties. Rank positions within one list
/// are unique, so the overlap inputs used in this crate never tie.
///
/// Degenerate for fewer than two values; callers are expected to special-case
/// that before ranking.
pub fn relative_ranks<T: PartialOrd>(values: &[T]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(Ordering::Equal)
    });

    let mut ranks = vec![0; values.len()];
    for (rank_0, &orig) in order.iter().enumerate() {
        ranks[orig] = rank_0 + 1;
    }
    ranks
}

/// Spearman's rho: `1 - 6 Σd² / (n (n² - 1))` over relative ranks.
pub fn spearman_rho(x: &[usize], y: &[usize]) -> Correlation {
    let n = x.len();
    if n < 2 || n != y.len() {
        return Correlation::NotComputable { overlap_n: n.min(y.len()) };
    }

    let rx = relative_ranks(x);
    let ry = relative_ranks(y);
    let d_sq_sum: f64 = rx
        .iter()
        .zip(&ry)
        .map(|(&a, &b)| (a as f64 - b as f64).powi(2))
        .sum();

    let n = n as f64;
    Correlation::Computed(1.0 - (6.0 * d_sq_sum) / (n * (n * n - 1.0)))
}

/// Kendall's tau over all unordered pairs. Tied pairs count as neither
/// concordant nor discordant.
pub fn kendall_tau(x: &[usize], y: &[usize]) -> Correlation {
    let n = x.len();
    if n < 2 || n != y.len() {
        return Correlation::NotComputable { overlap_n: n.min(y.len()) };
    }

    let mut concordant = 0i64;
    let mut discordant = 0i64;
    for i in 0..n {
        for j in (i + 1)..n {
            let dx = x[i] as i64 - x[j] as i64;
            let dy = y[i] as i64 - y[j] as i64;
            match (dx * dy).cmp(&0) {
                Ordering::Greater => concordant += 1,
                Ordering::Less => discordant += 1,
                Ordering::Equal => {}
            }
        }
    }

    let total_pairs = (n * (n - 1) / 2) as f64;
    Correlation::Computed((concordant - discordant) as f64 / total_pairs)
}

/// Reordering among the domains both rankings share.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReorderMetrics {
    /// Shared domains in post order.
    pub overlap: Vec<String>,
    pub overlap_n: usize,
    pub pre_ranks: Vec<usize>,
    pub post_ranks: Vec<usize>,
    pub spearman_rho: Correlation,
    pub kendall_tau: Correlation,
    /// Relative pre rank minus relative post rank, per shared domain.
    /// Positive means the domain moved up among the shared set. Empty when
    /// fewer than two domains are shared.
    pub relative_deltas: Vec<i64>,
}

pub fn reorder_metrics(pre: &DomainRanking, post: &DomainRanking) -> ReorderMetrics {
    let pre_map = pre.rank_map();

    let mut overlap = Vec::new();
    let mut pre_ranks = Vec::new();
    let mut post_ranks = Vec::new();
    for (i, domain) in post.iter().enumerate() {
        if let Some(&pre_rank) = pre_map.get(domain) {
            overlap.push(domain.to_string());
            pre_ranks.push(pre_rank);
            post_ranks.push(i + 1);
        }
    }

    let overlap_n = overlap.len();
    let relative_deltas = if overlap_n < 2 {
        Vec::new()
    } else {
        relative_ranks(&pre_ranks)
            .into_iter()
            .zip(relative_ranks(&post_ranks))
            .map(|(pre_rel, post_rel)| pre_rel as i64 - post_rel as i64)
            .collect()
    };

    ReorderMetrics {
        spearman_rho: spearman_rho(&pre_ranks, &post_ranks),
        kendall_tau: kendall_tau(&pre_ranks, &post_ranks),
        overlap,
        overlap_n,
        pre_ranks,
        post_ranks,
        relative_deltas,
    }
}
