// Report generation for scenario runs

use crate::model::{Outcome, ScenarioTreeNode};
use crate::path::ScenarioRun;
use crate::tree::TreeRun;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use uuid::Uuid;

const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplorationMode {
    Path,
    Tree,
}

/// Persisted result of one exploration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorationReport<T> {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub mode: ExplorationMode,
    pub seeds: Vec<String>,
    pub max_depth: usize,
    pub scenarios: Vec<T>,
}

impl<T> ExplorationReport<T> {
    pub fn new(mode: ExplorationMode, seeds: Vec<String>, max_depth: usize, scenarios: Vec<T>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            mode,
            seeds,
            max_depth,
            scenarios,
        }
    }
}

impl<T: Serialize> ExplorationReport<T> {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

fn outcome_note(outcome: Outcome) -> String {
    format!("  ({})\n", outcome.as_str())
}

/// Render scenario paths and their candidate logs as text.
pub fn generate_path_report(runs: &[ScenarioRun]) -> String {
    let mut report = String::new();
    report.push_str(DIVIDER);
    report.push_str("\n\n# Scenarios\n");

    if runs.is_empty() {
        report.push_str("\n  No scenarios could be built.\n");
    }

    for (i, run) in runs.iter().enumerate() {
        report.push_str(&format!("\n[Scenario {}]\n", i + 1));
        for step in &run.steps {
            report.push_str(&format!(
                "{}: {}  (score={}, out-degree={})\n",
                step.depth, step.keyword, step.score, step.out_degree
            ));
        }
        report.push_str(&outcome_note(run.outcome));
    }

    report.push('\n');
    report.push_str(DIVIDER);
    report.push_str("\n\n# Candidate score logs\n");

    for (i, run) in runs.iter().enumerate() {
        report.push_str(&format!("\n[Scenario {} candidate log]\n", i + 1));
        for log in &run.logs {
            report.push_str(&format!("{}\n", log));
        }
    }

    report
}

fn push_tree(report: &mut String, node: &ScenarioTreeNode) {
    report.push_str(&format!(
        "{}Depth {}: {} ({:.3})\n",
        "  ".repeat(node.depth),
        node.depth,
        node.keyword,
        node.score
    ));
    for child in &node.children {
        push_tree(report, child);
    }
}

/// Render scenario trees as indented text, followed by their candidate logs.
pub fn generate_tree_report(runs: &[TreeRun]) -> String {
    let mut report = String::new();
    report.push_str(DIVIDER);
    report.push_str("\n\n# Scenarios\n");

    if runs.is_empty() {
        report.push_str("\n  No scenarios could be built.\n");
    }

    for (i, run) in runs.iter().enumerate() {
        report.push_str(&format!("\n--- Scenario {} ---\n", i + 1));
        push_tree(&mut report, &run.tree);
        report.push_str(&outcome_note(run.outcome));
    }

    report.push('\n');
    report.push_str(DIVIDER);
    report.push_str("\n\n# Candidate score logs\n");

    for (i, run) in runs.iter().enumerate() {
        report.push_str(&format!("\n--- Scenario {} candidate log ---\n", i + 1));
        for log in &run.logs {
            report.push_str(&format!("{}\n", log));
        }
    }

    report
}
