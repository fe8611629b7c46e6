use crate::model::Node;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Shared cancellation flag with an optional deadline.
///
/// Checked before every external call. Clones share the same flag, so a
/// Ctrl-C handler holding one clone stops every builder using another.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, budget: Duration) -> Self {
        self.deadline = Some(Instant::now() + budget);
        self
    }

    pub fn with_deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Marker returned when an operation was abandoned because the stop signal fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stopped;

/// Visited set of one exploration run.
///
/// A node, once visited, is never offered as a candidate again within the
/// same context. Each scenario branch owns its own context.
#[derive(Debug, Clone, Default)]
pub struct TraversalContext {
    visited: BTreeSet<Node>,
}

impl TraversalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Node>,
    {
        Self {
            visited: nodes.into_iter().map(Into::into).collect(),
        }
    }

    /// Mark a node visited. Returns false if it already was.
    pub fn visit(&mut self, node: impl Into<Node>) -> bool {
        self.visited.insert(node.into())
    }

    pub fn is_visited(&self, node: &str) -> bool {
        self.visited.contains(node)
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }

    pub fn visited(&self) -> &BTreeSet<Node> {
        &self.visited
    }
}
