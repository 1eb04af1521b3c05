//! Integration tests for the CLI commands, run against files in a temp dir.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use clap::Parser;
use phreak::AppError;
use phreak::cli::{Cli, Commands, cmd_check, cmd_paths, cmd_run, cmd_segments, dispatch};
use phreak::config::{Config, MAX_CONFIG_FILE_SIZE, Settings};
use phreak_core::{LinkEvent, NodeId, PhreakError, RuleName, SegmentId};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// otn(1) -> lia(2) -> { join(3) -> not(4) -> r1, exists(6) -> r2 }
const NETWORK: &str = r#"
derive_associations = true

[[nodes]]
id = 1
kind = "object_type_source"

[[nodes]]
id = 2
kind = "left_input_adapter"
parent = 1

[[nodes]]
id = 3
kind = "join"
parent = 2
right = 1

[[nodes]]
id = 4
kind = "not"
parent = 3
right = 1

[[nodes]]
id = 5
kind = "terminal"
parent = 4
rule = "r1"

[[nodes]]
id = 6
kind = "exists"
parent = 2
right = 1

[[nodes]]
id = 7
kind = "terminal"
parent = 6
rule = "r2"
"#;

const SCRIPT: &str = r#"
[[steps]]
op = "assert_object"
node = 2
fact = 1

[[steps]]
op = "assert_object"
node = 3
fact = 10
"#;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn settings(network: &Path, script: Option<&Path>) -> Settings {
    Settings {
        network: network.to_path_buf(),
        script: script.map(Path::to_path_buf),
        json: false,
    }
}

// =============================================================================
// COMMAND TESTS
// =============================================================================

#[test]
fn test_check_counts_segments() {
    let dir = TempDir::new().unwrap();
    let network = write(&dir, "network.toml", NETWORK);

    let report = cmd_check(&settings(&network, None)).unwrap();
    assert_eq!(report.network.nodes, 7);
    assert_eq!(report.network.rules, 2);
    assert_eq!(report.network.segments, 3);
    assert!(report.segments.is_empty());
}

#[test]
fn test_segments_after_script() {
    let dir = TempDir::new().unwrap();
    let network = write(&dir, "network.toml", NETWORK);
    let script = write(&dir, "facts.toml", SCRIPT);

    let report = cmd_segments(&settings(&network, Some(&script))).unwrap();
    assert_eq!(report.steps_applied, 2);
    assert_eq!(report.segments.len(), 3);

    let chain = report
        .segments
        .iter()
        .find(|s| s.nodes == vec![NodeId(3), NodeId(4)])
        .unwrap();
    assert_eq!(chain.all_linked_mask, 0b11);
    assert!(chain.linked);

    let exists = report
        .segments
        .iter()
        .find(|s| s.nodes == vec![NodeId(6)])
        .unwrap();
    assert!(!exists.linked);
}

#[test]
fn test_run_reports_events_and_paths() {
    let dir = TempDir::new().unwrap();
    let network = write(&dir, "network.toml", NETWORK);
    let script = write(&dir, "facts.toml", SCRIPT);

    let report = cmd_run(&settings(&network, Some(&script))).unwrap();
    assert_eq!(
        report.link_events,
        vec![
            LinkEvent {
                segment: SegmentId(0),
                linked: true
            },
            LinkEvent {
                segment: SegmentId(1),
                linked: true
            },
        ]
    );

    let r1 = report
        .paths
        .iter()
        .find(|p| p.rule == RuleName::new("r1"))
        .unwrap();
    assert!(r1.is_rule_linked());
    let r2 = report
        .paths
        .iter()
        .find(|p| p.rule == RuleName::new("r2"))
        .unwrap();
    assert!(!r2.is_rule_linked());
}

#[test]
fn test_run_requires_script() {
    let dir = TempDir::new().unwrap();
    let network = write(&dir, "network.toml", NETWORK);

    let result = cmd_run(&settings(&network, None));
    assert!(matches!(result, Err(AppError::MissingScript)));
}

#[test]
fn test_paths_for_single_rule() {
    let dir = TempDir::new().unwrap();
    let network = write(&dir, "network.toml", NETWORK);

    let report = cmd_paths(&settings(&network, None), Some("r2")).unwrap();
    assert_eq!(report.paths.len(), 1);
    assert_eq!(report.paths[0].terminal, NodeId(7));
    assert_eq!(report.paths[0].segments.len(), 2);
}

#[test]
fn test_paths_unknown_rule() {
    let dir = TempDir::new().unwrap();
    let network = write(&dir, "network.toml", NETWORK);

    let result = cmd_paths(&settings(&network, None), Some("missing"));
    match result {
        Err(AppError::Core(PhreakError::RuleNotFound(rule))) => {
            assert_eq!(rule.as_str(), "missing");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_json_network_file() {
    let dir = TempDir::new().unwrap();
    let network = write(
        &dir,
        "network.json",
        r#"{"derive_associations":true,"nodes":[
            {"id":1,"kind":"object_type_source"},
            {"id":2,"kind":"left_input_adapter","parent":1},
            {"id":3,"kind":"terminal","parent":2,"rule":"only"}
        ]}"#,
    );

    let report = cmd_check(&settings(&network, None)).unwrap();
    assert_eq!(report.network.segments, 1);
}

#[test]
fn test_invalid_toml_is_reported() {
    let dir = TempDir::new().unwrap();
    let network = write(&dir, "network.toml", "[[nodes]]\nid = \"one\"\n");

    let result = cmd_check(&settings(&network, None));
    assert!(matches!(result, Err(AppError::Toml { .. })));
}

#[test]
fn test_missing_network_file() {
    let dir = TempDir::new().unwrap();
    let result = cmd_check(&settings(&dir.path().join("absent.toml"), None));
    assert!(matches!(result, Err(AppError::Io { .. })));
}

#[test]
fn test_failing_script_step() {
    let dir = TempDir::new().unwrap();
    let network = write(&dir, "network.toml", NETWORK);
    let script = write(
        &dir,
        "facts.toml",
        "[[steps]]\nop = \"retract_right\"\nnode = 3\nfact = 99\n",
    );

    let result = cmd_segments(&settings(&network, Some(&script)));
    assert!(matches!(
        result,
        Err(AppError::Core(PhreakError::FactNotFound { .. }))
    ));
}

// =============================================================================
// CONFIG AND ARGUMENT TESTS
// =============================================================================

#[test]
fn test_config_paths_are_relative_to_config_file() {
    let dir = TempDir::new().unwrap();
    write(&dir, "network.toml", NETWORK);
    write(
        &dir,
        "phreak.toml",
        "[network]\npath = \"network.toml\"\n\n[output]\njson = true\n",
    );

    let config = Config::discover(None, dir.path()).unwrap();
    assert_eq!(config.network.path, Some(dir.path().join("network.toml")));

    let settings = Settings::resolve(None, None, false, config).unwrap();
    assert!(settings.json);
    let report = dispatch(None, &settings).unwrap();
    assert_eq!(report.network.segments, 3);
}

#[test]
fn test_no_config_file_is_empty_config() {
    let dir = TempDir::new().unwrap();
    assert_eq!(Config::discover(None, dir.path()).unwrap(), Config::default());
}

#[test]
fn test_unknown_config_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "phreak.toml", "[network]\nfile = \"x.toml\"\n");
    assert!(matches!(
        Config::discover(Some(&path), dir.path()),
        Err(AppError::Toml { .. })
    ));
}

#[test]
fn test_oversized_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut content = String::from("[network]\npath = \"network.toml\"\n");
    content.push_str(&"#".repeat(MAX_CONFIG_FILE_SIZE as usize));
    write(&dir, "phreak.toml", &content);

    let result = Config::discover(None, dir.path());
    match result {
        Err(AppError::FileTooLarge { max, .. }) => assert_eq!(max, MAX_CONFIG_FILE_SIZE),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_misspelled_node_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    let misspelled = NETWORK.replacen("right = 1", "rigth = 1", 1);
    let network = write(&dir, "network.toml", &misspelled);

    let result = cmd_check(&settings(&network, None));
    assert!(matches!(result, Err(AppError::Toml { .. })));
}

#[test]
fn test_misspelled_script_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    let network = write(&dir, "network.toml", NETWORK);
    let script = write(
        &dir,
        "facts.json",
        r#"{"step":[{"op":"assert_object","node":2,"fact":1}]}"#,
    );

    let result = cmd_segments(&settings(&network, Some(&script)));
    assert!(matches!(result, Err(AppError::Json { .. })));
}

#[test]
fn test_cli_parses_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "phreak",
        "paths",
        "--rule",
        "r1",
        "--network",
        "n.toml",
        "--json-mode",
    ])
    .unwrap();
    assert_eq!(
        cli.command,
        Some(Commands::Paths {
            rule: Some("r1".to_string())
        })
    );
    assert_eq!(cli.network, Some(PathBuf::from("n.toml")));
    assert!(cli.json_mode);
}
