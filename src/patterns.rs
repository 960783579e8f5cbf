use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

// Include default patterns at compile time
const DEFAULT_PATTERNS_BYTES: &[u8] = include_bytes!("../default_domain_patterns.txt");

pub const DEFAULT_PATTERNS_FILE: &str = "domain_patterns.txt";

/// Parses one pattern per line, skipping blanks and `#` comments. With
/// `strict` an invalid regex is an error; otherwise it is logged and skipped.
fn parse_patterns(content: &str, source: &str, strict: bool) -> Result<Vec<Regex>> {
    let mut patterns = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match Regex::new(line) {
            Ok(regex) => patterns.push(regex),
            Err(e) if strict => {
                anyhow::bail!("Invalid regex pattern at line {}: {}", line_num + 1, e)
            }
            Err(e) => {
                warn!(action = "parse", component = source, line_number = line_num + 1, error = %e, "Invalid regex pattern")
            }
        }
    }

    Ok(patterns)
}

fn embedded_defaults() -> Result<&'static str> {
    std::str::from_utf8(DEFAULT_PATTERNS_BYTES).context("Failed to decode embedded default patterns")
}

/// Loads suffix patterns from `pattern_file_path`, falling back to
/// `domain_patterns.txt` in the working directory and then to the embedded
/// defaults.
pub fn load_domain_patterns(pattern_file_path: Option<&Path>) -> Result<Vec<Regex>> {
    let start_time = Instant::now();
    info!(
        action = "start",
        component = "pattern_loading",
        "Starting domain pattern loading"
    );

    let patterns = if let Some(path) = pattern_file_path {
        info!(action = "load", component = "pattern_file", file_path = ?path, "Loading patterns from specified file");
        if !path.exists() {
            anyhow::bail!("Pattern file not found: {:?}", path);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read pattern file {:?}", path))?;
        let patterns = parse_patterns(&content, "pattern_file", true)?;
        info!(action = "loaded", component = "pattern_file", pattern_count = patterns.len(), file_path = ?path, "Loaded patterns from file");
        patterns
    } else {
        let mut patterns = Vec::new();

        let default_file = Path::new(DEFAULT_PATTERNS_FILE);
        if default_file.exists() {
            info!(action = "load", component = "default_pattern_file", file_path = ?default_file, "Loading patterns from default file");
            let content = fs::read_to_string(default_file)?;
            patterns = parse_patterns(&content, "default_pattern_file", false)?;
            info!(action = "loaded", component = "default_pattern_file", pattern_count = patterns.len(), file_path = ?default_file, "Loaded patterns from default file");
        }

        // If no patterns loaded, use embedded defaults
        if patterns.is_empty() {
            info!(
                action = "load",
                component = "embedded_patterns",
                "Using embedded default patterns"
            );
            patterns = parse_patterns(embedded_defaults()?, "embedded_patterns", false)?;
            info!(
                action = "loaded",
                component = "embedded_patterns",
                pattern_count = patterns.len(),
                "Loaded patterns from embedded defaults"
            );
        }
        patterns
    };

    let pattern_time = start_time.elapsed();
    info!(
        action = "complete",
        component = "pattern_loading",
        pattern_count = patterns.len(),
        duration_ms = pattern_time.as_millis(),
        "Successfully compiled patterns"
    );
    Ok(patterns)
}

/// Writes the embedded defaults to `path`, refusing to overwrite.
pub fn init_default_patterns(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first if you want to reinitialize.",
            path.display()
        );
    }

    fs::write(path, embedded_defaults()?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Created {} with default patterns", path.display());

    Ok(())
}
