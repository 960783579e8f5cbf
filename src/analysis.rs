use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::time::Instant;
use tracing::info;

use crate::aggregate::{AggregateReport, Aggregator, KeywordAnalysis, ReportOptions};
use crate::input::{self, Comparison, ExperimentInfo, LoadOptions};
use crate::{patterns, Args};

/// Upstream details about one keyword that the statistics do not use but the
/// report shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordProvenance {
    pub search_timestamp: Option<DateTime<Utc>>,
    pub llm_timestamp: Option<DateTime<Utc>>,
    pub llm_error: Option<String>,
    /// `(post rank, url)` for every post domain that has a URL, in rank order.
    pub urls: Vec<(usize, String)>,
}

impl KeywordProvenance {
    pub fn from_comparison(comparison: &Comparison) -> Self {
        let urls = comparison
            .post
            .iter()
            .enumerate()
            .filter_map(|(i, domain)| Some((i + 1, comparison.url_for(domain)?.to_string())))
            .collect();

        Self {
            search_timestamp: comparison.search_timestamp,
            llm_timestamp: comparison.llm_timestamp,
            llm_error: comparison.llm_error.clone(),
            urls,
        }
    }
}

#[derive(Debug)]
pub struct AnalysisResult {
    pub info: ExperimentInfo,
    pub report: AggregateReport,
    /// Parallel to `report.keywords`.
    pub provenance: Vec<KeywordProvenance>,
}

/// Analyzes every comparison and folds the results into one report.
///
/// Keywords are processed on a dedicated pool; the reduction keeps input
/// order, so the report does not depend on the worker count.
pub fn analyze_comparisons(
    comparisons: Vec<Comparison>,
    options: &ReportOptions,
    max_workers: Option<usize>,
) -> Result<AggregateReport> {
    let start_time = Instant::now();
    info!(
        action = "start",
        component = "keyword_analysis",
        keyword_count = comparisons.len(),
        "Starting keyword analysis"
    );

    let max_workers = max_workers.unwrap_or_else(|| {
        let cpu_count = num_cpus::get();
        std::cmp::min(cpu_count, 8)
    });
    info!(action = "configure", component = "keyword_analysis", worker_count = max_workers, "Using workers for processing");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_workers)
        .build()
        .context("Failed to build worker pool")?;

    let aggregator = pool.install(|| {
        comparisons
            .into_par_iter()
            .map(|c| KeywordAnalysis::new(c.keyword, c.pre, c.post))
            .fold(Aggregator::new, Aggregator::push)
            .reduce(Aggregator::new, Aggregator::merge)
    });

    let report = aggregator.finalize(options);
    info!(
        action = "complete",
        component = "keyword_analysis",
        keyword_count = report.totals.keywords,
        computable = report.correlation.computable,
        not_computable = report.correlation.not_computable,
        duration_ms = start_time.elapsed().as_millis(),
        "Keyword analysis completed"
    );

    Ok(report)
}

pub fn run_analysis(args: &Args) -> Result<AnalysisResult> {
    let total_start_time = Instant::now();
    info!(action = "start", component = "analysis", "Starting ranking analysis");

    let input_path = args
        .input
        .as_deref()
        .context("No results file given")?;

    let patterns = if args.no_patterns {
        Vec::new()
    } else {
        patterns::load_domain_patterns(args.patterns.as_deref())?
    };

    let experiment = input::load_experiment(
        input_path,
        LoadOptions {
            patterns: &patterns,
            max_domains: args.max_domains,
        },
    )?;

    let provenance = experiment
        .comparisons
        .iter()
        .map(KeywordProvenance::from_comparison)
        .collect();

    let options = ReportOptions {
        top_k: args.top,
        bucket_width: args.bucket_width,
    };
    let report = analyze_comparisons(experiment.comparisons, &options, args.workers)?;

    info!(
        action = "complete",
        component = "analysis",
        duration_ms = total_start_time.elapsed().as_millis(),
        "Analysis completed successfully"
    );

    Ok(AnalysisResult {
        info: experiment.info,
        report,
        provenance,
    })
}
