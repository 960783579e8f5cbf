use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::error;

use rankshift::patterns::DEFAULT_PATTERNS_FILE;
use rankshift::report::{print_analysis_results, write_json_summary};
use rankshift::utils::{setup_logging, validate_args};
use rankshift::{init_default_patterns, run_analysis, Args};

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    if args.init {
        return init_default_patterns(Path::new(DEFAULT_PATTERNS_FILE));
    }

    validate_args(&args)?;

    match run_analysis(&args) {
        Ok(result) => {
            print_analysis_results(&result, args.summary_only, args.redact);
            if let Some(path) = &args.json {
                write_json_summary(&result, path)?;
                println!("  Full report saved to: {}", path.display());
            }
            Ok(())
        }
        Err(e) => {
            error!(action = "fail", component = "main", error = ?e, "Analysis failed");
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
