use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rankshift",
    about = "Compare raw search rankings against re-ranked results and separate filtering from reordering",
    version,
    long_about = None
)]
pub struct Args {
    /// Results JSON file to analyze
    #[arg(required_unless_present = "init")]
    pub input: Option<PathBuf>,

    /// Number of entries in the most dropped / added lists
    #[arg(short, long, default_value_t = 10)]
    pub top: usize,

    /// Width of the SERP position buckets
    #[arg(long, default_value_t = 5)]
    pub bucket_width: usize,

    /// Keep at most this many domains of each raw search ranking
    #[arg(short, long)]
    pub max_domains: Option<usize>,

    /// Path to custom domain pattern file
    #[arg(short, long)]
    pub patterns: Option<PathBuf>,

    /// Disable pattern-based domain normalization
    #[arg(long)]
    pub no_patterns: bool,

    /// Write the aggregate report as JSON to this path
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Skip the per-keyword tables
    #[arg(short, long)]
    pub summary_only: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Number of worker threads
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Redact domain names for privacy
    #[arg(long)]
    pub redact: bool,

    /// Initialize domain_patterns.txt with default patterns
    #[arg(long)]
    pub init: bool,
}
