//! # Report Types
//!
//! What the commands print, either as JSON (`--json-mode`) or as text.

use phreak_core::{LinkEvent, PathMemory, SegmentSnapshot};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Size of the loaded network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSummary {
    pub nodes: usize,
    pub rules: usize,
    pub segments: usize,
}

/// Output of one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub network: NetworkSummary,
    #[serde(default)]
    pub steps_applied: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<SegmentSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link_events: Vec<LinkEvent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<PathMemory>,
}

impl Report {
    pub fn new(network: NetworkSummary) -> Self {
        Self {
            network,
            steps_applied: 0,
            segments: Vec::new(),
            link_events: Vec::new(),
            paths: Vec::new(),
        }
    }

    /// Pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable rendering.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Network: {} nodes, {} rules, {} segments",
            self.network.nodes, self.network.rules, self.network.segments
        );
        if self.steps_applied > 0 {
            let _ = writeln!(out, "Steps applied: {}", self.steps_applied);
        }

        if !self.segments.is_empty() {
            out.push_str("\nSegments\n");
            for segment in &self.segments {
                let nodes: Vec<String> = segment.nodes.iter().map(ToString::to_string).collect();
                let _ = writeln!(
                    out,
                    "  [{}] {:<24} {} / {}  {}",
                    segment.id.0,
                    nodes.join(" "),
                    mask(segment.linked_mask, segment.nodes.len()),
                    mask(segment.all_linked_mask, segment.nodes.len()),
                    linked_label(segment.linked)
                );
            }
        }

        if !self.link_events.is_empty() {
            out.push_str("\nLink events\n");
            for event in &self.link_events {
                let _ = writeln!(out, "  [{}] {}", event.segment.0, linked_label(event.linked));
            }
        }

        if !self.paths.is_empty() {
            out.push_str("\nRule paths\n");
            for path in &self.paths {
                let segments: Vec<String> =
                    path.segments.iter().map(|s| s.0.to_string()).collect();
                let _ = writeln!(
                    out,
                    "  {:<16} terminal {}  segments [{}]  {}",
                    path.rule.as_str(),
                    path.terminal,
                    segments.join(", "),
                    linked_label(path.is_rule_linked())
                );
            }
        }
        out
    }
}

fn mask(value: u64, width: usize) -> String {
    format!("{:0width$b}", value, width = width)
}

fn linked_label(linked: bool) -> &'static str {
    if linked { "linked" } else { "unlinked" }
}
