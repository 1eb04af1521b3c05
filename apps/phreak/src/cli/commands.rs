//! # CLI Command Implementations
//!
//! Every command loads the network into a fresh session, optionally replays
//! a script, and returns a [`Report`]. Printing is separate so commands can
//! be tested without capturing stdout.

use crate::config::Settings;
use crate::error::AppError;
use crate::files::read_limited;
use crate::report::{NetworkSummary, Report};
use phreak_core::{Network, NetworkDef, RuleName, Script, Session};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// FILE LOADING
// =============================================================================

/// Maximum size of a definition or script file (64 MB).
const MAX_DEFINITION_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Read a definition file; `.json` files are JSON, anything else TOML.
pub fn read_definition<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let (validated, content) = read_limited(path, MAX_DEFINITION_FILE_SIZE)?;

    let is_json = validated
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&content).map_err(|source| AppError::Json {
            path: path.to_path_buf(),
            source,
        })
    } else {
        toml::from_str(&content).map_err(|source| AppError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Load and build a network definition.
pub fn load_network(path: &Path) -> Result<Arc<Network>, AppError> {
    let def: NetworkDef = read_definition(path)?;
    let network = def.build()?;
    tracing::info!(
        path = %path.display(),
        nodes = network.len(),
        rules = network.rules().count(),
        "network loaded"
    );
    Ok(Arc::new(network))
}

/// Load an operation script.
pub fn load_script(path: &Path) -> Result<Script, AppError> {
    let script: Script = read_definition(path)?;
    tracing::info!(path = %path.display(), steps = script.steps.len(), "script loaded");
    Ok(script)
}

// =============================================================================
// SESSION SETUP
// =============================================================================

/// A session over the configured network, with the script already applied.
struct Prepared {
    session: Session,
    steps_applied: usize,
}

fn prepare(settings: &Settings, require_script: bool) -> Result<Prepared, AppError> {
    let network = load_network(&settings.network)?;
    let mut session = Session::new(network);

    let steps_applied = match &settings.script {
        Some(path) => load_script(path)?.run(&mut session)?,
        None if require_script => return Err(AppError::MissingScript),
        None => 0,
    };
    Ok(Prepared {
        session,
        steps_applied,
    })
}

fn summary(session: &Session) -> NetworkSummary {
    NetworkSummary {
        nodes: session.network().len(),
        rules: session.network().rules().count(),
        segments: session.segment_count(),
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Validate the network by building every segment.
pub fn cmd_check(settings: &Settings) -> Result<Report, AppError> {
    let network = load_network(&settings.network)?;
    let mut session = Session::new(network);
    session.init_all_segments()?;
    Ok(Report::new(summary(&session)))
}

/// Every segment memory, after the optional script.
pub fn cmd_segments(settings: &Settings) -> Result<Report, AppError> {
    let Prepared {
        mut session,
        steps_applied,
    } = prepare(settings, false)?;
    session.init_all_segments()?;

    let mut report = Report::new(summary(&session));
    report.steps_applied = steps_applied;
    report.segments = session.segments().map(|s| s.snapshot()).collect();
    Ok(report)
}

/// Replay the script; report the link events it caused and every rule path.
pub fn cmd_run(settings: &Settings) -> Result<Report, AppError> {
    let Prepared {
        mut session,
        steps_applied,
    } = prepare(settings, true)?;
    let link_events = session.drain_link_events();
    session.init_all_segments()?;
    let paths = all_paths(&mut session)?;

    let mut report = Report::new(summary(&session));
    report.steps_applied = steps_applied;
    report.segments = session.segments().map(|s| s.snapshot()).collect();
    report.link_events = link_events;
    report.paths = paths;
    Ok(report)
}

/// Rule paths for one rule, or for all of them.
pub fn cmd_paths(settings: &Settings, rule: Option<&str>) -> Result<Report, AppError> {
    let Prepared {
        mut session,
        steps_applied,
    } = prepare(settings, false)?;

    let paths = match rule {
        Some(name) => vec![session.rule_path(&RuleName::new(name))?],
        None => all_paths(&mut session)?,
    };

    let mut report = Report::new(summary(&session));
    report.steps_applied = steps_applied;
    report.paths = paths;
    Ok(report)
}

fn all_paths(session: &mut Session) -> Result<Vec<phreak_core::PathMemory>, AppError> {
    let rules: Vec<RuleName> = session
        .network()
        .rules()
        .map(|(rule, _)| rule.clone())
        .collect();
    let mut paths = Vec::with_capacity(rules.len());
    for rule in &rules {
        paths.push(session.rule_path(rule)?);
    }
    Ok(paths)
}

// =============================================================================
// OUTPUT
// =============================================================================

/// Print a report as JSON or text.
pub fn print_report(report: &Report, json: bool) -> Result<(), AppError> {
    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.to_text());
    }
    Ok(())
}
