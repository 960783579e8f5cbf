use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::correlation::{reorder_metrics, ReorderMetrics};
use crate::decomposition::{decompose, FilteringEffect, FilteringInputs, DEFAULT_BUCKET_WIDTH};
use crate::rank_change::{rank_change_vector, Movement, RankChange};
use crate::sequence::DomainRanking;
use crate::stats::DescriptiveStats;

/// Everything computed for one keyword's pre/post pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordAnalysis {
    pub keyword: String,
    pub pre: DomainRanking,
    pub post: DomainRanking,
    pub rank_changes: Vec<RankChange>,
    pub reorder: ReorderMetrics,
    pub promoted: Vec<String>,
    pub demoted: Vec<String>,
    pub dropped: Vec<String>,
    pub added: Vec<String>,
    /// Shared domains whose absolute rank differs between the two lists.
    pub reordered: usize,
    /// Mean raw delta over shared domains; `None` when nothing is shared.
    pub mean_raw_delta: Option<f64>,
    pub kept_positions: Vec<usize>,
    pub dropped_positions: Vec<usize>,
}

impl KeywordAnalysis {
    pub fn new(keyword: impl Into<String>, pre: DomainRanking, post: DomainRanking) -> Self {
        let rank_changes = rank_change_vector(&pre, &post);
        let reorder = reorder_metrics(&pre, &post);

        let mut promoted = Vec::new();
        let mut demoted = Vec::new();
        let mut added = Vec::new();
        for change in &rank_changes {
            match change.movement() {
                Movement::Promoted => promoted.push(change.domain.clone()),
                Movement::Demoted => demoted.push(change.domain.clone()),
                Movement::Added => added.push(change.domain.clone()),
                Movement::Unchanged => {}
            }
        }

        let deltas: Vec<i64> = rank_changes.iter().filter_map(|c| c.rank_delta).collect();
        let mean_raw_delta = (!deltas.is_empty())
            .then(|| deltas.iter().sum::<i64>() as f64 / deltas.len() as f64);

        let post_map = post.rank_map();
        let mut dropped = Vec::new();
        let mut kept_positions = Vec::new();
        let mut dropped_positions = Vec::new();
        for (i, domain) in pre.iter().enumerate() {
            if post_map.contains_key(domain) {
                kept_positions.push(i + 1);
            } else {
                dropped.push(domain.to_string());
                dropped_positions.push(i + 1);
            }
        }

        Self {
            keyword: keyword.into(),
            pre,
            post,
            rank_changes,
            reorder,
            reordered: promoted.len() + demoted.len(),
            mean_raw_delta,
            promoted,
            demoted,
            dropped,
            added,
            kept_positions,
            dropped_positions,
        }
    }

    /// Deltas of domains present in both lists, in post order.
    pub fn raw_deltas(&self) -> impl Iterator<Item = i64> + '_ {
        self.rank_changes.iter().filter_map(|c| c.rank_delta)
    }

    pub fn new_count(&self) -> usize {
        self.rank_changes.iter().filter(|c| c.rank_delta.is_none()).count()
    }
}

/// Per-domain occurrence counts across the corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyCounter {
    counts: HashMap<String, usize>,
}

impl FrequencyCounter {
    pub fn add(&mut self, domain: &str) {
        *self.counts.entry(domain.to_string()).or_insert(0) += 1;
    }

    pub fn merge(&mut self, other: FrequencyCounter) {
        for (domain, count) in other.counts {
            *self.counts.entry(domain).or_insert(0) += count;
        }
    }

    /// The `k` most frequent domains, highest count first, ties by name.
    pub fn top(&self, k: usize) -> Vec<DomainCount> {
        let mut sorted: Vec<(&String, &usize)> = self.counts.iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        sorted
            .into_iter()
            .take(k)
            .map(|(domain, &count)| DomainCount {
                domain: domain.clone(),
                count,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainCount {
    pub domain: String,
    pub count: usize,
}

/// Running totals over keyword analyses.
///
/// `merge` is associative and keeps the left operand's items first, so a
/// parallel `fold` + `reduce` produces the same aggregate as a sequential
/// fold over the same keyword order.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    keywords: Vec<KeywordAnalysis>,
    promoted: FrequencyCounter,
    demoted: FrequencyCounter,
    dropped: FrequencyCounter,
    added: FrequencyCounter,
    total_pre: usize,
    total_post: usize,
    total_overlap: usize,
    total_reordered: usize,
    raw_deltas: Vec<i64>,
    relative_deltas: Vec<i64>,
    keyword_mean_deltas: Vec<f64>,
    spearman: Vec<f64>,
    kendall: Vec<f64>,
    not_computable: usize,
    kept_positions: Vec<usize>,
    dropped_positions: Vec<usize>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, analysis: KeywordAnalysis) -> Self {
        self.add(analysis);
        self
    }

    pub fn add(&mut self, analysis: KeywordAnalysis) {
        analysis.promoted.iter().for_each(|d| self.promoted.add(d));
        analysis.demoted.iter().for_each(|d| self.demoted.add(d));
        analysis.dropped.iter().for_each(|d| self.dropped.add(d));
        analysis.added.iter().for_each(|d| self.added.add(d));

        self.total_pre += analysis.pre.len();
        self.total_post += analysis.post.len();
        self.total_overlap += analysis.reorder.overlap_n;
        self.total_reordered += analysis.reordered;

        self.keyword_mean_deltas.extend(analysis.mean_raw_delta);
        self.raw_deltas.extend(analysis.raw_deltas());
        self.relative_deltas
            .extend_from_slice(&analysis.reorder.relative_deltas);

        match (
            analysis.reorder.spearman_rho.value(),
            analysis.reorder.kendall_tau.value(),
        ) {
            (Some(rho), Some(tau)) => {
                self.spearman.push(rho);
                self.kendall.push(tau);
            }
            _ => self.not_computable += 1,
        }

        self.kept_positions
            .extend_from_slice(&analysis.kept_positions);
        self.dropped_positions
            .extend_from_slice(&analysis.dropped_positions);
        self.keywords.push(analysis);
    }

    pub fn merge(mut self, other: Aggregator) -> Self {
        self.keywords.extend(other.keywords);
        self.promoted.merge(other.promoted);
        self.demoted.merge(other.demoted);
        self.dropped.merge(other.dropped);
        self.added.merge(other.added);
        self.total_pre += other.total_pre;
        self.total_post += other.total_post;
        self.total_overlap += other.total_overlap;
        self.total_reordered += other.total_reordered;
        self.raw_deltas.extend(other.raw_deltas);
        self.relative_deltas.extend(other.relative_deltas);
        self.keyword_mean_deltas.extend(other.keyword_mean_deltas);
        self.spearman.extend(other.spearman);
        self.kendall.extend(other.kendall);
        self.not_computable += other.not_computable;
        self.kept_positions.extend(other.kept_positions);
        self.dropped_positions.extend(other.dropped_positions);
        self
    }

    pub fn finalize(self, options: &ReportOptions) -> AggregateReport {
        let n = self.keywords.len();
        let per_keyword = |total: usize| {
            if n == 0 {
                0.0
            } else {
                total as f64 / n as f64
            }
        };

        let filtering = decompose(FilteringInputs {
            kept_positions: &self.kept_positions,
            dropped_positions: &self.dropped_positions,
            raw_deltas: &self.raw_deltas,
            total_post: self.total_post,
            comparisons: n,
            bucket_width: options.bucket_width,
        });

        let spearman = DescriptiveStats::from_values(&self.spearman);
        let correlation = CorrelationSummary {
            interpretation: (!spearman.is_empty()).then(|| Interpretation::from_mean_rho(spearman.mean)),
            spearman,
            kendall: DescriptiveStats::from_values(&self.kendall),
            computable: self.spearman.len(),
            not_computable: self.not_computable,
        };

        AggregateReport {
            totals: Totals {
                keywords: n,
                total_pre: self.total_pre,
                total_post: self.total_post,
                total_overlap: self.total_overlap,
                total_reordered: self.total_reordered,
                avg_pre: per_keyword(self.total_pre),
                avg_post: per_keyword(self.total_post),
                avg_overlap: per_keyword(self.total_overlap),
                avg_reordered: per_keyword(self.total_reordered),
                overlap_rate: self.total_overlap as f64 / self.total_post.max(1) as f64,
            },
            top_promoted: self.promoted.top(options.top_k),
            top_demoted: self.demoted.top(options.top_k),
            top_dropped: self.dropped.top(options.top_k),
            top_added: self.added.top(options.top_k),
            raw_deltas: DeltaDistribution::from_deltas(&self.raw_deltas),
            keyword_mean_deltas: DescriptiveStats::from_values(&self.keyword_mean_deltas),
            relative_deltas: DeltaDistribution::from_deltas(&self.relative_deltas),
            correlation,
            filtering,
            keywords: self.keywords,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub top_k: usize,
    pub bucket_width: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            bucket_width: DEFAULT_BUCKET_WIDTH,
        }
    }
}

/// Reading of the mean Spearman rho across keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpretation {
    /// Mostly keeps the search engine's relative order; the effect is filtering.
    Preserves,
    /// Partly keeps the order but also reorders meaningfully.
    Partial,
    /// Little relation to the search engine's order.
    Unrelated,
    Inverts,
}

impl Interpretation {
    pub fn from_mean_rho(rho: f64) -> Self {
        if rho > 0.7 {
            Interpretation::Preserves
        } else if rho > 0.3 {
            Interpretation::Partial
        } else if rho > -0.3 {
            Interpretation::Unrelated
        } else {
            Interpretation::Inverts
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    pub keywords: usize,
    pub total_pre: usize,
    pub total_post: usize,
    pub total_overlap: usize,
    pub total_reordered: usize,
    pub avg_pre: f64,
    pub avg_post: f64,
    pub avg_overlap: f64,
    pub avg_reordered: f64,
    /// Overlap as a fraction of all post-ranking domains.
    pub overlap_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaDistribution {
    pub histogram: BTreeMap<i64, usize>,
    pub stats: DescriptiveStats,
    pub abs_stats: DescriptiveStats,
}

impl DeltaDistribution {
    fn from_deltas(deltas: &[i64]) -> Self {
        let mut histogram = BTreeMap::new();
        for &d in deltas {
            *histogram.entry(d).or_insert(0) += 1;
        }
        Self {
            histogram,
            stats: deltas.iter().map(|&d| d as f64).collect(),
            abs_stats: deltas.iter().map(|&d| d.abs() as f64).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationSummary {
    /// Over keywords with at least two shared domains only.
    pub spearman: DescriptiveStats,
    pub kendall: DescriptiveStats,
    pub computable: usize,
    pub not_computable: usize,
    pub interpretation: Option<Interpretation>,
}

/// Final, read-only result of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
    pub totals: Totals,
    pub top_promoted: Vec<DomainCount>,
    pub top_demoted: Vec<DomainCount>,
    pub top_dropped: Vec<DomainCount>,
    pub top_added: Vec<DomainCount>,
    pub raw_deltas: DeltaDistribution,
    /// Distribution of each keyword's mean raw delta.
    pub keyword_mean_deltas: DescriptiveStats,
    pub relative_deltas: DeltaDistribution,
    pub correlation: CorrelationSummary,
    pub filtering: FilteringEffect,
    pub keywords: Vec<KeywordAnalysis>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn analysis(keyword: &str, pre: &[&str], post: &[&str]) -> KeywordAnalysis {
        KeywordAnalysis::new(
            keyword,
            DomainRanking::from_identifiers(pre.iter().copied()),
            DomainRanking::from_identifiers(post.iter().copied()),
        )
    }

    #[test]
    fn classifies_each_domain() {
        let a = analysis("kw", &["a", "b", "c", "e"], &["b", "a", "d", "e"]);
        assert_eq!(a.promoted, vec!["b"]);
        assert_eq!(a.demoted, vec!["a"]);
        assert_eq!(a.added, vec!["d"]);
        assert_eq!(a.dropped, vec!["c"]);
        assert_eq!(a.reordered, 2);
        assert_eq!(a.kept_positions, vec![1, 2, 4]);
        assert_eq!(a.dropped_positions, vec![3]);
        assert_eq!(a.new_count(), 1);
        assert_eq!(a.raw_deltas().collect::<Vec<_>>(), vec![1, -1, 0]);
        assert!((a.mean_raw_delta.unwrap() - 0.0).abs() < EPS);

        let nothing_shared = analysis("kw", &["a"], &["b"]);
        assert_eq!(nothing_shared.mean_raw_delta, None);

        let filtered = analysis("kw", &["x", "y", "a", "b"], &["a", "b"]);
        assert!((filtered.mean_raw_delta.unwrap() - 2.0).abs() < EPS);
    }

    #[test]
    fn filtering_only_counts_dropped() {
        let report = Aggregator::new()
            .push(analysis("kw", &["a", "b", "c", "d"], &["a", "b"]))
            .finalize(&ReportOptions::default());

        let kw = &report.keywords[0];
        assert_eq!(kw.raw_deltas().collect::<Vec<_>>(), vec![0, 0]);
        assert_eq!(kw.reorder.relative_deltas, vec![0, 0]);
        assert_eq!(
            report.top_dropped,
            vec![
                DomainCount { domain: "c".into(), count: 1 },
                DomainCount { domain: "d".into(), count: 1 },
            ]
        );
        assert!(report.top_added.is_empty());
        assert!(report.top_promoted.is_empty());
    }

    #[test]
    fn not_computable_excluded_from_correlation_mean() {
        let computable = analysis("rev", &["a", "b", "c"], &["c", "b", "a"]);
        let expected = computable.reorder.spearman_rho.value().unwrap();

        let report = Aggregator::new()
            .push(analysis("single", &["a", "x"], &["a", "y"]))
            .push(computable)
            .finalize(&ReportOptions::default());

        assert_eq!(report.correlation.computable, 1);
        assert_eq!(report.correlation.not_computable, 1);
        assert!((report.correlation.spearman.mean - expected).abs() < EPS);
        assert!((report.correlation.kendall.mean + 1.0).abs() < EPS);
        assert_eq!(report.correlation.interpretation, Some(Interpretation::Inverts));
    }

    #[test]
    fn merge_matches_sequential_fold() {
        let inputs = vec![
            analysis("k1", &["a", "b", "c"], &["b", "a", "d"]),
            analysis("k2", &["a", "b", "c", "d"], &["a", "b"]),
            analysis("k3", &["x", "y", "a"], &["a", "z"]),
            analysis("k4", &["d", "c", "b", "a"], &["a", "b", "c", "d"]),
        ];
        let options = ReportOptions::default();

        let sequential = inputs
            .iter()
            .cloned()
            .fold(Aggregator::new(), Aggregator::push)
            .finalize(&options);

        let (left, right) = inputs.split_at(2);
        let left = left.iter().cloned().fold(Aggregator::new(), Aggregator::push);
        let right = right.iter().cloned().fold(Aggregator::new(), Aggregator::push);
        let merged = left.merge(right).finalize(&options);

        assert_eq!(sequential, merged);
        assert_eq!(merged.totals.keywords, 4);
        assert_eq!(merged.keywords[2].keyword, "k3");
    }

    #[test]
    fn totals_and_histograms() {
        let report = Aggregator::new()
            .push(analysis("k1", &["a", "b", "c"], &["b", "a", "d"]))
            .push(analysis("k2", &["x", "a"], &["a"]))
            .finalize(&ReportOptions::default());

        let t = &report.totals;
        assert_eq!((t.total_pre, t.total_post, t.total_overlap), (5, 4, 3));
        assert!((t.avg_pre - 2.5).abs() < EPS);
        assert!((t.overlap_rate - 0.75).abs() < EPS);

        let hist: Vec<(i64, usize)> = report.raw_deltas.histogram.into_iter().collect();
        assert_eq!(hist, vec![(-1, 1), (1, 2)]);
        assert!((report.raw_deltas.abs_stats.mean - 1.0).abs() < EPS);
        assert_eq!(report.keyword_mean_deltas.n, 2);

        let rel: Vec<(i64, usize)> = report.relative_deltas.histogram.into_iter().collect();
        assert_eq!(rel, vec![(-1, 1), (1, 1)]);
    }

    #[test]
    fn empty_corpus_produces_zeroed_report() {
        let report = Aggregator::new().finalize(&ReportOptions::default());
        assert_eq!(report.totals.keywords, 0);
        assert_eq!(report.totals.avg_post, 0.0);
        assert_eq!(report.correlation.spearman, DescriptiveStats::default());
        assert_eq!(report.correlation.interpretation, None);
        assert_eq!(report.filtering.expected_delta, None);
    }

    #[test]
    fn top_is_ordered_by_count_then_name() {
        let mut counter = FrequencyCounter::default();
        for d in ["b", "a", "c", "c", "b", "c"] {
            counter.add(d);
        }
        let top = counter.top(2);
        assert_eq!(top[0], DomainCount { domain: "c".into(), count: 3 });
        assert_eq!(top[1], DomainCount { domain: "b".into(), count: 2 });
        assert_eq!(counter.top(10).len(), 3);
        assert_eq!(counter.top(10)[2], DomainCount { domain: "a".into(), count: 1 });
    }
}
