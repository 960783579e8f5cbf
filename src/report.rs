//! Human-readable and JSON output. Everything printed here comes from the
//! finished [`AggregateReport`]; nothing is recomputed.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::aggregate::{AggregateReport, DomainCount, Interpretation, KeywordAnalysis};
use crate::analysis::{AnalysisResult, KeywordProvenance};
use crate::correlation::Correlation;
use crate::input::ExperimentInfo;
use crate::rank_change::Movement;
use crate::stats::DescriptiveStats;
use crate::utils::{format_number, redact_domain};

const WIDTH: usize = 80;

struct Printer {
    redact: bool,
}

impl Printer {
    fn domain(&self, domain: &str) -> String {
        if self.redact {
            redact_domain(domain)
        } else {
            domain.to_string()
        }
    }

    /// Redacted output hides the URL path along with the domain.
    fn url(&self, domain: &str, url: &str) -> String {
        if self.redact {
            format!("{}/...", redact_domain(domain))
        } else {
            url.to_string()
        }
    }

    fn domain_list(&self, domains: &[String]) -> String {
        domains
            .iter()
            .map(|d| self.domain(d))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn rule(c: char) -> String {
    c.to_string().repeat(WIDTH)
}

fn section(title: &str) {
    println!("\n{}", rule('='));
    println!("  {}", title);
    println!("{}", rule('='));
}

fn correlation_cell(c: &Correlation) -> String {
    match c.value() {
        Some(v) => format!("{:+.3}", v),
        None => "n/a".to_string(),
    }
}

fn histogram(counts: &BTreeMap<i64, usize>) {
    for (delta, count) in counts {
        println!("    {:+3}: {:>3}  {}", delta, count, "#".repeat(*count));
    }
}

fn stats_block(label: &str, s: &DescriptiveStats) {
    println!("\n  {}:", label);
    println!("    Mean:    {:+.3}", s.mean);
    println!("    Median:  {:+.3}", s.median);
    println!("    Std:     {:.3}", s.std);
    println!("    Range:   [{:+.3}, {:+.3}]", s.min, s.max);
}

fn print_header(info: &ExperimentInfo, keywords: usize) {
    section("RANKING COMPARISON: Raw Search Engine vs LLM Re-ranking");
    println!("  Search engine:    {}", info.search_backend);
    println!("  LLM re-ranker:    {}", info.llm_model);
    if let Some(location) = &info.location {
        println!("  Location:         {}", location);
    }
    if let Some(ip) = &info.ip {
        println!("  IP:               {}", ip);
    }
    if let Some(started) = info.started {
        println!("  Experiment start: {}", started.to_rfc3339());
    }
    if let Some(finished) = info.finished {
        println!("  Experiment end:   {}", finished.to_rfc3339());
    }
    if let Some(duration) = info.duration() {
        println!("  Duration:         {}s", format_number(duration.num_seconds().max(0) as usize));
    }
    println!("  Keywords:         {}", format_number(keywords));
    println!("{}", rule('='));
}

fn print_keyword(p: &Printer, kw: &KeywordAnalysis, provenance: Option<&KeywordProvenance>) {
    println!("\n  Keyword: {}", kw.keyword);
    if let Some(prov) = provenance {
        if let Some(ts) = prov.search_timestamp {
            println!("  Search: {}", ts.to_rfc3339());
        }
        if let Some(ts) = prov.llm_timestamp {
            println!("  LLM:    {}", ts.to_rfc3339());
        }
        if let Some(err) = &prov.llm_error {
            println!("  LLM error: {}", err.chars().take(80).collect::<String>());
        }
    }
    println!("  {}", "─".repeat(WIDTH - 4));
    println!("  {:<4} {:<32} {:<32} Delta", "#", "Raw Search", "LLM Re-ranked");
    println!("  {} {} {} {}", "─".repeat(4), "─".repeat(32), "─".repeat(32), "─".repeat(8));

    let rows = kw.pre.len().max(kw.post.len());
    for i in 0..rows {
        let pre_d = kw.pre.get(i).map(|d| p.domain(d)).unwrap_or_default();
        let post_d = kw.post.get(i).map(|d| p.domain(d)).unwrap_or_default();
        let change = match kw.rank_changes.get(i) {
            Some(c) => match (c.movement(), c.rank_delta) {
                (Movement::Added, _) => " NEW".to_string(),
                (Movement::Unchanged, _) => "  =".to_string(),
                (_, Some(d)) => format!(" {:+}", d),
                (_, None) => String::new(),
            },
            None => String::new(),
        };
        println!("  {:<4} {:<32} {:<32} {}", i + 1, pre_d, post_d, change);
    }

    println!("  {}", "─".repeat(WIDTH - 4));
    let deltas: Vec<i64> = kw.raw_deltas().collect();
    let new_count = kw.new_count();
    if !deltas.is_empty() || new_count > 0 {
        let suffix = if new_count > 0 {
            format!("  (+{} new)", new_count)
        } else {
            String::new()
        };
        println!("  Raw delta vector: {:?}{}", deltas, suffix);
    }
    if !kw.reorder.relative_deltas.is_empty() {
        println!(
            "  Relative reorder: {:?}  (among {} shared domains)",
            kw.reorder.relative_deltas, kw.reorder.overlap_n
        );
    }
    if kw.reorder.spearman_rho.is_computable() {
        println!(
            "  Spearman rho={}   Kendall tau={}",
            correlation_cell(&kw.reorder.spearman_rho),
            correlation_cell(&kw.reorder.kendall_tau)
        );
    }

    if let Some(prov) = provenance.filter(|prov| !prov.urls.is_empty()) {
        println!("  {}", "─".repeat(WIDTH - 4));
        println!("  URLs (LLM re-ranked):");
        for (rank, url) in &prov.urls {
            let domain = kw.post.get(rank - 1).unwrap_or_default();
            println!("    {}. {}", rank, p.url(domain, url));
        }
    }

    for (label, list) in [
        ("Promoted", &kw.promoted),
        ("Demoted ", &kw.demoted),
        ("Dropped ", &kw.dropped),
        ("Added   ", &kw.added),
    ] {
        if !list.is_empty() {
            println!("  {}: {}", label, p.domain_list(list));
        }
    }
}

fn print_top(p: &Printer, title: &str, verb: &str, entries: &[DomainCount]) {
    if entries.is_empty() {
        return;
    }
    println!("\n  {}:", title);
    for entry in entries {
        println!("    {:<35} {} {}x", p.domain(&entry.domain), verb, entry.count);
    }
}

fn print_filtering(report: &AggregateReport) {
    section("EFFECT 1: FILTERING (which SERP domains the LLM drops vs keeps)");

    let f = &report.filtering;
    if f.kept_positions.is_empty() || f.dropped_positions.is_empty() {
        println!("\n  Not enough kept and dropped domains to compare positions.");
        return;
    }

    let t = &report.totals;
    println!(
        "\n  The LLM selects {} domains from {} raw SERP results.",
        format_number(t.total_post),
        format_number(t.total_pre)
    );
    for (label, s) in [("KEPT", &f.kept_positions), ("DROPPED", &f.dropped_positions)] {
        println!(
            "  SERP position of {:<8} domains: mean={:.1}  median={:.1}  range=[{:.0}, {:.0}]",
            label, s.mean, s.median, s.min, s.max
        );
    }

    println!("\n  Avg SERP position of kept domains:   {:.1}", f.kept_positions.mean);
    println!("  Avg post-LLM position (mechanical): {:.1}", f.mechanical_post_position);
    if let Some(expected) = f.expected_delta {
        println!("  => Expected raw delta from filtering alone: {:+.1}", expected);
    }
    if let Some(observed) = f.observed_mean_delta {
        println!("  => Observed mean raw delta:                {:+.1}", observed);
    }
    if let Some(residual) = f.residual {
        println!("  => Residual (attributable to reordering):  {:+.1}", residual);
    }

    println!("\n  Kept domains by SERP position bucket:");
    println!("    {:<10} {:>6} {:>8} {:>8}", "Bucket", "Kept", "Dropped", "Keep %");
    for b in &f.buckets {
        println!(
            "    {:<10} {:>6} {:>8} {:>7.0}%",
            format!("{}-{}", b.start, b.end),
            b.kept,
            b.dropped,
            b.keep_rate * 100.0
        );
    }
}

fn print_reordering(report: &AggregateReport) {
    section("EFFECT 2: REORDERING (among shared domains, does the LLM change order?)");

    let c = &report.correlation;
    let Some(interpretation) = c.interpretation else {
        println!("\n  Not enough overlapping domains to compute rank correlations.");
        return;
    };

    stats_block("Spearman rho (1.0 = SERP order preserved, -1.0 = reversed)", &c.spearman);
    stats_block("Kendall tau (1.0 = all pairs concordant, -1.0 = all discordant)", &c.kendall);
    println!(
        "\n  Computed for {} keywords; {} had fewer than 2 shared domains and are excluded.",
        c.computable, c.not_computable
    );

    println!("\n  Interpretation:");
    let text = match interpretation {
        Interpretation::Preserves => {
            "The LLM mostly PRESERVES the search engine's relative ordering.\n    \
             Its main effect is filtering, not reordering the domains it keeps."
        }
        Interpretation::Partial => {
            "The LLM PARTIALLY preserves the search engine's ordering\n    \
             but also does meaningful reordering of the kept domains."
        }
        Interpretation::Unrelated => {
            "The LLM shows LITTLE correlation with the SERP ordering.\n    \
             It effectively ranks from scratch rather than re-ranking."
        }
        Interpretation::Inverts => "The LLM INVERTS the search engine's ordering.",
    };
    println!("    {}", text);

    println!("\n  Per-keyword Spearman / Kendall:");
    for kw in &report.keywords {
        if kw.reorder.spearman_rho.is_computable() {
            println!(
                "    {:<40} rho={}  tau={}  (n={})",
                kw.keyword,
                correlation_cell(&kw.reorder.spearman_rho),
                correlation_cell(&kw.reorder.kendall_tau),
                kw.reorder.overlap_n
            );
        } else {
            println!("    {:<40} (< 2 shared domains)", kw.keyword);
        }
    }
    println!("  {}", "─".repeat(WIDTH - 4));
    println!(
        "  Mean Spearman: {:+.3}   Mean Kendall: {:+.3}",
        c.spearman.mean, c.kendall.mean
    );

    let rel = &report.relative_deltas;
    if !rel.histogram.is_empty() {
        println!("\n  Relative reorder delta histogram (within overlap set only):");
        println!("  (positive = domain moved up relative to other kept domains)");
        histogram(&rel.histogram);
        println!("\n  Relative delta stats:");
        println!("    Mean:   {:+.2}  (~0 by construction)", rel.stats.mean);
        println!("    Std:    {:.2}  (reorder intensity)", rel.stats.std);
        println!("    Mean |delta|: {:.2}  (avg positions moved among kept)", rel.abs_stats.mean);
    }
}

fn print_raw_deltas(report: &AggregateReport) {
    section("RAW DELTA ANALYSIS (filtering + reordering conflated)");

    let raw = &report.raw_deltas;
    if raw.stats.is_empty() {
        println!("\n  No shared domains, no raw deltas.");
        return;
    }

    println!("\n  These numbers are dominated by the filtering effect.");
    println!("\n  Total observations: {}", format_number(raw.stats.n));
    println!("  Mean delta:     {:+.2}", raw.stats.mean);
    println!("  Median delta:   {:+.1}", raw.stats.median);
    println!("  Std:            {:.2}", raw.stats.std);
    println!("  Mean |delta|:   {:.2}", raw.abs_stats.mean);

    println!("\n  Raw delta histogram:");
    histogram(&raw.histogram);

    println!("\n  Per-keyword mean raw delta:");
    for kw in &report.keywords {
        match kw.mean_raw_delta {
            Some(mean) => println!("    {:<40} mean={:+.1}  n={}", kw.keyword, mean, kw.reorder.overlap_n),
            None => println!("    {:<40} (no overlap)", kw.keyword),
        }
    }
    let km = &report.keyword_mean_deltas;
    if !km.is_empty() {
        println!("  {}", "─".repeat(WIDTH - 4));
        println!("  Mean of per-keyword means: {:+.2}  std={:.2}", km.mean, km.std);
    }
}

pub fn print_analysis_results(result: &AnalysisResult, summary_only: bool, redact: bool) {
    let p = Printer { redact };
    let report = &result.report;
    let t = &report.totals;

    print_header(&result.info, t.keywords);

    if !summary_only {
        for (i, kw) in report.keywords.iter().enumerate() {
            print_keyword(&p, kw, result.provenance.get(i));
        }
    }

    if t.keywords == 0 {
        println!("\n  No results to summarize.");
        return;
    }

    section("GLOBAL SUMMARY");
    println!("  Keywords processed:         {}", format_number(t.keywords));
    println!("  Avg domains/keyword (raw):  {:.1}", t.avg_pre);
    println!("  Avg domains/keyword (LLM):  {:.1}", t.avg_post);
    println!("  Avg overlap:                {:.1}", t.avg_overlap);
    println!("  Avg reordered:              {:.1}", t.avg_reordered);
    println!("  Overlap rate:               {:.0}%", t.overlap_rate * 100.0);

    print_top(&p, "Most dropped by LLM", "dropped", &report.top_dropped);
    print_top(&p, "Most added by LLM", "added", &report.top_added);

    print_filtering(report);
    print_reordering(report);
    print_raw_deltas(report);

    println!("\n{}\n", rule('='));
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    experiment: &'a ExperimentInfo,
    report: &'a AggregateReport,
}

pub fn write_json_summary(result: &AnalysisResult, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(
        &mut writer,
        &JsonSummary {
            experiment: &result.info,
            report: &result.report,
        },
    )
    .context("Failed to serialize report")?;
    writer.flush()?;

    info!(action = "write", component = "json_summary", file_path = ?path, "Wrote JSON summary");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Aggregator, ReportOptions};
    use crate::sequence::DomainRanking;
    use serde_json::Value;

    fn result() -> AnalysisResult {
        let report = Aggregator::new()
            .push(KeywordAnalysis::new(
                "kw",
                DomainRanking::from_identifiers(["a.com", "b.com", "c.com"]),
                DomainRanking::from_identifiers(["b.com", "a.com", "d.com"]),
            ))
            .push(KeywordAnalysis::new(
                "single",
                DomainRanking::from_identifiers(["a.com", "x.com"]),
                DomainRanking::from_identifiers(["a.com", "y.com"]),
            ))
            .finalize(&ReportOptions::default());
        let provenance = vec![
            KeywordProvenance {
                urls: vec![(1, "https://b.com/page".to_string()), (3, "https://d.com/".to_string())],
                ..KeywordProvenance::default()
            },
            KeywordProvenance::default(),
        ];
        AnalysisResult {
            info: ExperimentInfo {
                ip: Some("203.0.113.7".to_string()),
                ..ExperimentInfo::default()
            },
            report,
            provenance,
        }
    }

    #[test]
    fn redacted_urls_hide_the_path() {
        let plain = Printer { redact: false };
        let redacted = Printer { redact: true };
        assert_eq!(plain.url("b.com", "https://b.com/page"), "https://b.com/page");
        assert_eq!(redacted.url("b.com", "https://b.com/page"), format!("{}/...", redact_domain("b.com")));
    }

    #[test]
    fn json_summary_flags_not_computable_as_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_json_summary(&result(), &path).unwrap();

        let json: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let keywords = &json["report"]["keywords"];
        assert_eq!(keywords[0]["reorder"]["spearman_rho"], Value::from(-1.0));
        assert!(keywords[1]["reorder"]["spearman_rho"].is_null());
        assert_eq!(keywords[0]["rank_changes"][2]["rank_delta"], Value::Null);
        assert_eq!(json["report"]["correlation"]["not_computable"], Value::from(1));
        assert_eq!(json["experiment"]["ip"], "203.0.113.7");
    }

    #[test]
    fn printing_does_not_panic() {
        let r = result();
        print_analysis_results(&r, false, true);
        print_analysis_results(&r, true, false);

        let empty = AnalysisResult {
            info: ExperimentInfo::default(),
            report: Aggregator::new().finalize(&ReportOptions::default()),
            provenance: Vec::new(),
        };
        print_analysis_results(&empty, false, false);
    }
}
