//! Review tool tests over temporary taxonomy and record files

use clap::Parser;
use navicue_core::CatalogConfig;
use navicue_review::{load_records, log_level, run, Catalog, Cli, Command};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    taxonomy: PathBuf,
    records: PathBuf,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let taxonomy = dir.path().join("taxonomy.json");
    let records = dir.path().join("records.json");

    fs::write(
        &taxonomy,
        json!({
            "schemas": [{"schema_key": "abandonment", "title": "Abandonment"}],
            "families": [{"family_key": "fam.left_behind", "schema_key": "abandonment", "title": "Left Behind"}],
            "mindblocks": [{
                "mindblock_key": "mb.1", "family_key": "fam.left_behind",
                "limiting_prediction": "They will leave", "truth": "Some stay",
                "heat": "GREEN", "kbe_stage": "Embodying"
            }]
        })
        .to_string(),
    )
    .unwrap();

    fs::write(
        &records,
        json!({"items": [
            {
                "id": "v-1", "code": "NC-V1", "status": "draft", "tier": "hot",
                "tags": ["batch_2"],
                "primary_targets": [{"scope_type": "schema", "schema_id": "abandonment"}],
                "variant_summary": [{"copy": {"prompt": "Notice the pull"}}]
            },
            {"id": "l-1", "text_line": "Legacy line", "status": "published", "heat_level": "low"},
            {"id": "v-2", "tier": "tepid", "primary_targets": [], "variant_summary": []}
        ]})
        .to_string(),
    )
    .unwrap();

    Fixture {
        _dir: dir,
        taxonomy,
        records,
    }
}

fn open(fixture: &Fixture) -> Catalog {
    Catalog::open(&fixture.taxonomy, &fixture.records, &CatalogConfig::default()).unwrap()
}

#[test]
fn test_catalog_collects_errors() {
    let f = fixture();
    let catalog = open(&f);
    assert_eq!(catalog.normalized.items.len(), 2);

    let errors = run(&Command::Errors, &catalog).unwrap();
    assert_eq!(errors[0]["index"], 2);
    assert_eq!(errors[0]["record_id"], "v-2");
    assert_eq!(errors[0]["kind"]["kind"], "unknown_tier");
}

#[test]
fn test_query_command_from_cli_args() {
    let f = fixture();
    let cli = Cli::try_parse_from([
        "navicue-review",
        "--taxonomy",
        f.taxonomy.to_str().unwrap(),
        "--records",
        f.records.to_str().unwrap(),
        "query",
        "--filter",
        "status=draft",
        "--search",
        "pull",
    ])
    .unwrap();

    let output = run(&cli.command, &open(&f)).unwrap();
    assert_eq!(output["page"]["matched"], 1);
    assert_eq!(output["page"]["total"], 2);
    assert_eq!(output["page"]["page"], 1);
    assert_eq!(output["page"]["items"][0]["id"], "v-1");
    assert_eq!(output["page"]["items"][0]["batch"], 2);
    assert_eq!(output["facet_counts"]["heat"][1]["value"], "high");
}

#[test]
fn test_facets_and_stats_commands() {
    let f = fixture();
    let catalog = open(&f);

    let facets = run(&Command::Facets, &catalog).unwrap();
    assert_eq!(facets["status"][0], json!({"value": "all", "count": 2}));

    let stats = run(
        &Command::Stats {
            selection: Default::default(),
        },
        &catalog,
    )
    .unwrap();
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["by_status"]["published"], 1);

    let mindblocks = run(&Command::Mindblocks, &catalog).unwrap();
    assert_eq!(mindblocks["by_heat"]["GREEN"], 1);
}

#[test]
fn test_invalid_filter_is_reported() {
    let f = fixture();
    let cli = Cli::try_parse_from([
        "navicue-review",
        "--taxonomy",
        "t.json",
        "--records",
        "r.json",
        "stats",
        "--filter",
        "mood=calm",
    ])
    .unwrap();
    assert!(run(&cli.command, &open(&f)).is_err());
}

#[test]
fn test_missing_and_malformed_inputs() {
    let f = fixture();
    let missing = f.taxonomy.with_file_name("absent.json");
    assert!(Catalog::open(&missing, &f.records, &CatalogConfig::default()).is_err());

    fs::write(&f.records, "{\"data\": []}").unwrap();
    assert!(load_records(&f.records).is_err());

    fs::write(&f.records, "[]").unwrap();
    assert!(load_records(&f.records).unwrap().is_empty());
}

#[test]
fn test_log_level_prefers_command_line() {
    let mut config = CatalogConfig::default();
    config.logging.level = "warn".to_string();

    assert_eq!(log_level(None, &config).unwrap(), tracing::Level::WARN);
    assert_eq!(log_level(Some("debug"), &config).unwrap(), tracing::Level::DEBUG);
    assert!(log_level(Some("chatty"), &config).is_err());
}

#[test]
fn test_unresolved_targets_reachable_through_mapping_filter() {
    let f = fixture();
    fs::write(
        &f.records,
        json!([
            {
                "id": "v-1", "tier": "hot",
                "primary_targets": [{"scope_type": "mindblock", "mindblock_id": "mb.404"}],
                "variant_summary": []
            },
            {
                "id": "v-2", "tier": "hot",
                "primary_targets": [{"scope_type": "mindblock", "mindblock_id": "mb.1"}],
                "variant_summary": [null]
            }
        ])
        .to_string(),
    )
    .unwrap();

    let cli = Cli::try_parse_from([
        "navicue-review",
        "--taxonomy",
        "t.json",
        "--records",
        "r.json",
        "query",
        "--filter",
        "mapping=unmapped",
    ])
    .unwrap();
    let output = run(&cli.command, &open(&f)).unwrap();
    assert_eq!(output["page"]["matched"], 1);
    assert_eq!(output["page"]["total"], 2);
    assert_eq!(output["page"]["items"][0]["id"], "v-1");
}
