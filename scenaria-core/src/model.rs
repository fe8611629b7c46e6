use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A knowledge-graph concept, identified by its resource name.
pub type Node = String;

/// Filtered outbound links of a node.
pub type LinkSet = BTreeSet<Node>;

/// One step of a scenario path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub depth: usize,
    pub keyword: Node,
    pub score: f64,
    pub out_degree: usize,
}

impl PathStep {
    pub fn new(depth: usize, keyword: impl Into<Node>, score: f64, out_degree: usize) -> Self {
        Self {
            depth,
            keyword: keyword.into(),
            score,
            out_degree,
        }
    }
}

/// Linear chain of steps, depth starting at 1.
pub type ScenarioPath = Vec<PathStep>;

/// Node of a scenario tree. The builder attaches at most one child per node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioTreeNode {
    pub keyword: Node,
    pub depth: usize,
    pub score: f64,
    pub children: Vec<ScenarioTreeNode>,
}

impl ScenarioTreeNode {
    pub fn leaf(keyword: impl Into<Node>, depth: usize, score: f64) -> Self {
        Self {
            keyword: keyword.into(),
            depth,
            score: round_score(score),
            children: Vec::new(),
        }
    }

    /// Walk the single-child chain from this node down to its last descendant.
    pub fn chain(&self) -> Vec<&ScenarioTreeNode> {
        let mut out = vec![self];
        let mut current = self;
        while let Some(child) = current.children.first() {
            out.push(child);
            current = child;
        }
        out
    }

    pub fn max_depth(&self) -> usize {
        self.chain().last().map(|n| n.depth).unwrap_or(self.depth)
    }
}

/// Why a path or tree branch stopped growing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The configured maximum depth was reached.
    DepthLimitReached,
    /// No unvisited candidate was left at the last step.
    DeadEnd,
    /// The stop signal fired before the branch finished.
    Cancelled,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::DepthLimitReached => "depth limit reached",
            Outcome::DeadEnd => "dead end",
            Outcome::Cancelled => "cancelled",
        }
    }
}

/// Round a similarity score to 3 decimal places for reporting.
pub fn round_score(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_score() {
        assert_eq!(round_score(0.123456), 0.123);
        assert_eq!(round_score(0.9996), 1.0);
        assert_eq!(round_score(-0.0424), -0.042);
    }

    #[test]
    fn test_chain_follows_single_children() {
        let mut root = ScenarioTreeNode::leaf("A", 0, 1.0);
        let mut b = ScenarioTreeNode::leaf("B", 1, 0.5);
        b.children.push(ScenarioTreeNode::leaf("C", 2, 0.25));
        root.children.push(b);

        let names: Vec<&str> = root.chain().iter().map(|n| n.keyword.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(root.max_depth(), 2);
    }

    #[test]
    fn test_outcome_serializes_snake_case() {
        let json = serde_json::to_string(&Outcome::DepthLimitReached).unwrap();
        assert_eq!(json, "\"depth_limit_reached\"");
    }
}
