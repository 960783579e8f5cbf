use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

const RESULTS: &str = r#"{
    "experiment_start": "2026-02-11T10:00:00+00:00",
    "experiment_end": "2026-02-11T10:10:00+00:00",
    "search_backend": "searxng",
    "llm_model": "test-model",
    "results": [
        {
            "keyword": "trail running shoes",
            "pre_llm_domains": ["reddit.com", "wikipedia.org", "brooks.com", "hoka.com", "salomon.com"],
            "post_llm_domains": ["hoka.com", "brooks.com", "salomon.com", "altra.com"]
        },
        {
            "keyword": "ergonomic chair",
            "pre_llm_domains": ["steelcase.com", "youtube.com"],
            "post_llm_domains": ["steelcase.com", "hermanmiller.com"]
        }
    ]
}"#;

const AI_SEARCH: &str = r#"{
    "experiment_context": {
        "experiment_start_utc": "2026-02-11T10:00:00Z",
        "network": {"public_ip": "198.51.100.23", "geolocation": {"city": "Lyon", "country": "FR"}}
    },
    "serp_engine": "duckduckgo",
    "chat_model": "test-model",
    "per_keyword_results": [
        {
            "query": "espresso grinder",
            "serp": {"raw_results": [
                {"url": "https://baratza.com/grinders"},
                {"url": "https://www.reddit.com/r/espresso"}
            ]},
            "llm": {
                "ranked_domains": ["baratza.com", "niche.co.uk"],
                "ranked_results": [{"domain": "niche.co.uk", "url": "https://niche.co.uk/zero"}]
            }
        }
    ]
}"#;

fn rankshift() -> Command {
    Command::new(env!("CARGO_BIN_EXE_rankshift"))
}

#[test]
fn help_mentions_input() {
    let output = rankshift().arg("--help").assert().success().get_output().stdout.clone();
    let text = String::from_utf8_lossy(&output);
    assert!(text.contains("--bucket-width"));
    assert!(text.contains("--json"));
}

#[test]
fn analyzes_file_and_writes_json() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("results.json");
    let summary = dir.path().join("summary.json");
    fs::write(&input, RESULTS).unwrap();

    let output = rankshift()
        .arg(&input)
        .arg("--json")
        .arg(&summary)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&output);
    assert!(text.contains("GLOBAL SUMMARY"));
    assert!(text.contains("trail running shoes"));
    assert!(text.contains("(< 2 shared domains)"));

    let json: Value = serde_json::from_str(&fs::read_to_string(&summary).unwrap()).unwrap();
    assert_eq!(json["experiment"]["search_backend"], "searxng");
    assert_eq!(json["report"]["totals"]["keywords"], 2);
    assert_eq!(json["report"]["correlation"]["computable"], 1);
    assert_eq!(json["report"]["correlation"]["not_computable"], 1);
}

#[test]
fn unknown_format_fails() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("weird.json");
    fs::write(&input, r#"{"something": []}"#).unwrap();

    rankshift().arg(&input).assert().failure();
}

#[test]
fn zero_top_is_rejected() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("results.json");
    fs::write(&input, RESULTS).unwrap();

    rankshift().arg(&input).args(["--top", "0"]).assert().failure();
}

#[test]
fn report_lists_reranked_urls_and_ip() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("ai_search.json");
    fs::write(&input, AI_SEARCH).unwrap();

    let output = rankshift().arg(&input).assert().success().get_output().stdout.clone();
    let text = String::from_utf8_lossy(&output);
    assert!(text.contains("198.51.100.23"));
    assert!(text.contains("URLs (LLM re-ranked):"));
    assert!(text.contains("1. https://baratza.com/grinders"));
    assert!(text.contains("2. https://niche.co.uk/zero"));
}
