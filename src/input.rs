//! Loading of result files written by the collection scripts.
//!
//! Two shapes are understood: the ranking comparison format (`results[]`
//! carrying `pre_llm_domains` / `post_llm_domains`) and the AI search format
//! (`per_keyword_results[]` carrying raw search results and the re-ranked
//! domains). Both become an [`ExperimentSet`].

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::info;

use crate::domain::extract_domain;
use crate::sequence::{build_sequence, DomainRanking};

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions<'a> {
    pub patterns: &'a [Regex],
    /// Cap on the length of each pre ranking.
    pub max_domains: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExperimentInfo {
    pub search_backend: String,
    pub llm_model: String,
    pub location: Option<String>,
    /// Public IP the collection run went out from.
    pub ip: Option<String>,
    pub started: Option<DateTime<Utc>>,
    pub finished: Option<DateTime<Utc>>,
}

impl ExperimentInfo {
    pub fn duration(&self) -> Option<Duration> {
        Some(self.finished? - self.started?)
    }
}

/// One keyword's pre and post rankings.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub keyword: String,
    pub pre: DomainRanking,
    pub post: DomainRanking,
    /// First URL seen for each kept pre domain.
    pub pre_urls: HashMap<String, String>,
    /// URL the re-ranker attached to each post domain. Blank URLs are left out.
    pub post_urls: HashMap<String, String>,
    pub search_timestamp: Option<DateTime<Utc>>,
    pub llm_timestamp: Option<DateTime<Utc>>,
    pub llm_error: Option<String>,
}

impl Comparison {
    /// Comparison with no URLs, timestamps or error attached.
    pub fn new(keyword: impl Into<String>, pre: DomainRanking, post: DomainRanking) -> Self {
        Self {
            keyword: keyword.into(),
            pre,
            post,
            pre_urls: HashMap::new(),
            post_urls: HashMap::new(),
            search_timestamp: None,
            llm_timestamp: None,
            llm_error: None,
        }
    }

    /// URL to show for a post domain: the re-ranker's, else the search result's.
    pub fn url_for(&self, domain: &str) -> Option<&str> {
        self.post_urls
            .get(domain)
            .or_else(|| self.pre_urls.get(domain))
            .map(String::as_str)
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperimentSet {
    pub info: ExperimentInfo,
    pub comparisons: Vec<Comparison>,
}

#[derive(Debug, Deserialize)]
struct ComparisonFile {
    experiment_start: Option<String>,
    experiment_end: Option<String>,
    search_backend: Option<String>,
    llm_model: Option<String>,
    results: Vec<ComparisonEntry>,
}

#[derive(Debug, Deserialize)]
struct ComparisonEntry {
    keyword: String,
    pre_llm_domains: Vec<String>,
    post_llm_domains: Vec<String>,
    search_timestamp: Option<String>,
    llm_timestamp: Option<String>,
    llm_error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AiSearchFile {
    #[serde(default)]
    experiment_context: ExperimentContext,
    experiment_start: Option<String>,
    experiment_end_utc: Option<String>,
    experiment_end: Option<String>,
    serp_engine: Option<String>,
    mode: Option<String>,
    chat_model: Option<String>,
    method: Option<String>,
    per_keyword_results: Vec<AiKeywordResult>,
}

#[derive(Debug, Default, Deserialize)]
struct ExperimentContext {
    experiment_start_utc: Option<String>,
    network: Option<Network>,
}

#[derive(Debug, Deserialize)]
struct Network {
    public_ip: Option<String>,
    geolocation: Option<Geolocation>,
}

#[derive(Debug, Deserialize)]
struct Geolocation {
    city: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AiKeywordResult {
    query: Option<String>,
    keyword: Option<String>,
    #[serde(default)]
    raw_results: Vec<RawResult>,
    serp: Option<SearchSection>,
    searxng: Option<SearchSection>,
    #[serde(default)]
    sources: Vec<RawResult>,
    #[serde(default)]
    ranked_domains: Vec<String>,
    #[serde(default)]
    ranked_results: Vec<RankedResult>,
    llm: Option<LlmSection>,
    query_timestamp_utc: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchSection {
    #[serde(default)]
    raw_results: Vec<RawResult>,
    query_timestamp_utc: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LlmSection {
    #[serde(default)]
    ranked_domains: Vec<String>,
    #[serde(default)]
    ranked_results: Vec<RankedResult>,
    llm_query_timestamp_utc: Option<String>,
    error: Option<String>,
}

/// A single search result as stored upstream.
#[derive(Debug, Deserialize)]
struct RawResult {
    #[serde(default)]
    url: String,
    domain: Option<String>,
}

/// A re-ranked domain together with the URL the re-ranker picked for it.
#[derive(Debug, Deserialize)]
struct RankedResult {
    domain: String,
    #[serde(default)]
    url: Option<String>,
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value?.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn from_comparison_format(file: ComparisonFile, options: LoadOptions<'_>) -> ExperimentSet {
    let comparisons = file
        .results
        .into_iter()
        .map(|entry| Comparison {
            search_timestamp: parse_timestamp(entry.search_timestamp.as_deref()),
            llm_timestamp: parse_timestamp(entry.llm_timestamp.as_deref()),
            llm_error: non_empty(entry.llm_error),
            ..Comparison::new(
                entry.keyword,
                build_sequence(entry.pre_llm_domains, Some, options.max_domains),
                DomainRanking::from_identifiers(entry.post_llm_domains),
            )
        })
        .collect();

    ExperimentSet {
        info: ExperimentInfo {
            search_backend: file.search_backend.unwrap_or_else(|| "unknown".to_string()),
            llm_model: file.llm_model.unwrap_or_else(|| "unknown".to_string()),
            location: None,
            ip: None,
            started: parse_timestamp(file.experiment_start.as_deref()),
            finished: parse_timestamp(file.experiment_end.as_deref()),
        },
        comparisons,
    }
}

fn from_ai_search_format(file: AiSearchFile, options: LoadOptions<'_>) -> ExperimentSet {
    let comparisons = file
        .per_keyword_results
        .into_iter()
        .map(|r| {
            let mut raw = r.raw_results;
            let mut search_ts = r.query_timestamp_utc;
            for section in [r.serp, r.searxng].into_iter().flatten() {
                if raw.is_empty() {
                    raw = section.raw_results;
                }
                if search_ts.is_none() {
                    search_ts = section.query_timestamp_utc;
                }
            }
            if raw.is_empty() {
                raw = r.sources;
            }

            let mut pre_urls = HashMap::new();
            let pre = build_sequence(
                raw,
                |record| {
                    let domain = non_empty(record.domain)
                        .or_else(|| extract_domain(&record.url, options.patterns))?;
                    if !domain.is_empty() && !record.url.is_empty() {
                        pre_urls.entry(domain.clone()).or_insert(record.url);
                    }
                    Some(domain)
                },
                options.max_domains,
            );

            let (mut post_domains, mut ranked_results, llm_ts, llm_error) = match r.llm {
                Some(llm) => (
                    llm.ranked_domains,
                    llm.ranked_results,
                    llm.llm_query_timestamp_utc,
                    llm.error,
                ),
                None => (Vec::new(), Vec::new(), None, None),
            };
            if !r.ranked_domains.is_empty() {
                post_domains = r.ranked_domains;
            }
            if !r.ranked_results.is_empty() {
                ranked_results = r.ranked_results;
            }
            let post_urls = ranked_results
                .into_iter()
                .filter_map(|entry| Some((entry.domain, non_empty(entry.url)?)))
                .collect();

            Comparison {
                keyword: r.query.or(r.keyword).unwrap_or_default(),
                pre,
                post: DomainRanking::from_identifiers(post_domains),
                pre_urls,
                post_urls,
                search_timestamp: parse_timestamp(search_ts.as_deref()),
                llm_timestamp: parse_timestamp(llm_ts.as_deref()),
                llm_error: non_empty(llm_error),
            }
        })
        .collect();

    let (ip, geolocation) = match file.experiment_context.network {
        Some(network) => (non_empty(network.public_ip), network.geolocation),
        None => (None, None),
    };
    let location = geolocation.map(|geo| {
            format!(
                "{}, {}",
                geo.city.as_deref().unwrap_or("?"),
                geo.country.as_deref().unwrap_or("?")
            )
        });

    let started = file
        .experiment_context
        .experiment_start_utc
        .or(file.experiment_start);
    let finished = file.experiment_end_utc.or(file.experiment_end);

    ExperimentSet {
        info: ExperimentInfo {
            search_backend: file
                .serp_engine
                .or(file.mode)
                .unwrap_or_else(|| "unknown".to_string()),
            llm_model: file
                .chat_model
                .or(file.method)
                .unwrap_or_else(|| "unknown".to_string()),
            location,
            ip,
            started: parse_timestamp(started.as_deref()),
            finished: parse_timestamp(finished.as_deref()),
        },
        comparisons,
    }
}

/// Detects the shape of `json` and converts it.
pub fn parse_experiment(json: &str, options: LoadOptions<'_>) -> Result<ExperimentSet> {
    let value: Value = serde_json::from_str(json).context("Failed to parse results JSON")?;

    let is_comparison = value
        .get("results")
        .and_then(|r| r.get(0))
        .is_some_and(|first| first.get("pre_llm_domains").is_some());

    if value.get("per_keyword_results").is_some() {
        let file: AiSearchFile =
            serde_json::from_value(value).context("Malformed AI search results")?;
        Ok(from_ai_search_format(file, options))
    } else if is_comparison {
        let file: ComparisonFile =
            serde_json::from_value(value).context("Malformed ranking comparison results")?;
        Ok(from_comparison_format(file, options))
    } else {
        let keys: Vec<&str> = value
            .as_object()
            .map(|o| o.keys().map(String::as_str).collect())
            .unwrap_or_default();
        anyhow::bail!("Unrecognized results format (top-level keys: {:?})", keys)
    }
}

pub fn load_experiment(path: &Path, options: LoadOptions<'_>) -> Result<ExperimentSet> {
    let start_time = Instant::now();
    info!(action = "start", component = "input_loading", file_path = ?path, "Loading results file");

    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let set = parse_experiment(&content, options)
        .with_context(|| format!("Failed to load results from {:?}", path))?;

    info!(
        action = "complete",
        component = "input_loading",
        keyword_count = set.comparisons.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Loaded results file"
    );
    Ok(set)
}
