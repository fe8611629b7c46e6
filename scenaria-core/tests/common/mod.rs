// Shared in-memory collaborators for exploration tests

#![allow(dead_code)]

use scenaria_core::{LinkProvider, Node, ProviderError, SimilarityOracle, StopSignal};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

/// Link provider backed by a fixed adjacency table.
///
/// Unknown nodes have no links. Nodes in `failing` return a provider error.
#[derive(Default)]
pub struct MemoryProvider {
    links: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    calls: RefCell<Vec<String>>,
    stop_after: Option<(usize, StopSignal)>,
    call_count: Cell<usize>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, node: &str, links: &[&str]) -> Self {
        self.links
            .insert(node.to_string(), links.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn failing(mut self, node: &str) -> Self {
        self.failing.insert(node.to_string());
        self
    }

    /// Fire `stop` once this many calls have been answered.
    pub fn stop_after(mut self, calls: usize, stop: StopSignal) -> Self {
        self.stop_after = Some((calls, stop));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl LinkProvider for MemoryProvider {
    async fn get_links(&self, node: &str) -> Result<Vec<Node>, ProviderError> {
        self.calls.borrow_mut().push(node.to_string());
        let count = self.call_count.get() + 1;
        self.call_count.set(count);
        if let Some((limit, stop)) = &self.stop_after
            && count >= *limit
        {
            stop.stop();
        }

        if self.failing.contains(node) {
            return Err(ProviderError::new(node, "simulated outage"));
        }
        Ok(self.links.get(node).cloned().unwrap_or_default())
    }
}

/// Similarity table over a fixed vocabulary. Pairs are symmetric; known
/// pairs without an entry score 0.0 and a node is fully similar to itself.
#[derive(Default)]
pub struct MemoryOracle {
    vocabulary: HashSet<String>,
    pairs: HashMap<(String, String), f64>,
}

impl MemoryOracle {
    pub fn new(vocabulary: &[&str]) -> Self {
        Self {
            vocabulary: vocabulary.iter().map(|s| s.to_string()).collect(),
            pairs: HashMap::new(),
        }
    }

    pub fn pair(mut self, a: &str, b: &str, score: f64) -> Self {
        self.pairs.insert((a.to_string(), b.to_string()), score);
        self.pairs.insert((b.to_string(), a.to_string()), score);
        self
    }
}

impl SimilarityOracle for MemoryOracle {
    fn contains(&self, node: &str) -> bool {
        self.vocabulary.contains(node)
    }

    fn similarity(&self, a: &str, b: &str) -> Option<f64> {
        if !self.contains(a) || !self.contains(b) {
            return None;
        }
        if a == b {
            return Some(1.0);
        }
        Some(
            self.pairs
                .get(&(a.to_string(), b.to_string()))
                .copied()
                .unwrap_or(0.0),
        )
    }
}

/// Depths along a path or tree chain are 1..=n (paths) or 0..=n (trees).
pub fn assert_contiguous(depths: &[usize], start: usize) {
    for (i, depth) in depths.iter().enumerate() {
        assert_eq!(*depth, start + i, "depths not contiguous: {:?}", depths);
    }
}
