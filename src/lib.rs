pub mod aggregate;
pub mod analysis;
pub mod args;
pub mod correlation;
pub mod decomposition;
pub mod domain;
pub mod input;
pub mod patterns;
pub mod rank_change;
pub mod report;
pub mod sequence;
pub mod stats;
pub mod utils;

pub use aggregate::{AggregateReport, Aggregator, KeywordAnalysis, ReportOptions};
pub use analysis::{analyze_comparisons, run_analysis, AnalysisResult};
pub use args::Args;
pub use correlation::{kendall_tau, relative_ranks, reorder_metrics, spearman_rho, Correlation};
pub use patterns::init_default_patterns;
pub use rank_change::{rank_change_vector, RankChange};
pub use sequence::{build_sequence, DomainRanking};
pub use stats::DescriptiveStats;
