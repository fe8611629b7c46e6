use crate::context::{StopSignal, Stopped};
use crate::error::ProviderError;
use crate::filter::filter_links;
use crate::model::{LinkSet, Node};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Source of outbound links for a knowledge-graph node.
pub trait LinkProvider {
    /// Raw outbound links of `node`, before validity filtering.
    fn get_links(&self, node: &str) -> impl Future<Output = Result<Vec<Node>, ProviderError>>;
}

/// Semantic closeness between two nodes.
pub trait SimilarityOracle {
    /// Whether the oracle knows `node` at all.
    fn contains(&self, node: &str) -> bool;

    /// Similarity of `a` and `b`, or `None` when either is outside the vocabulary.
    fn similarity(&self, a: &str, b: &str) -> Option<f64>;
}

impl<P: LinkProvider> LinkProvider for &P {
    fn get_links(&self, node: &str) -> impl Future<Output = Result<Vec<Node>, ProviderError>> {
        (**self).get_links(node)
    }
}

impl<O: SimilarityOracle> SimilarityOracle for &O {
    fn contains(&self, node: &str) -> bool {
        (**self).contains(node)
    }

    fn similarity(&self, a: &str, b: &str) -> Option<f64> {
        (**self).similarity(a, b)
    }
}

/// Fetches and filters link sets, memoizing them for the duration of a run.
///
/// Provider failures are logged and cached as empty sets so one bad node
/// never aborts an exploration.
pub struct LinkFetcher<'a, P> {
    provider: &'a P,
    stop: StopSignal,
    cache: HashMap<Node, Arc<LinkSet>>,
    fetches: usize,
}

impl<'a, P: LinkProvider> LinkFetcher<'a, P> {
    pub fn new(provider: &'a P, stop: StopSignal) -> Self {
        Self {
            provider,
            stop,
            cache: HashMap::new(),
            fetches: 0,
        }
    }

    /// Filtered links of `node`, fetching them on first use.
    pub async fn links(&mut self, node: &str) -> Result<Arc<LinkSet>, Stopped> {
        if let Some(links) = self.cache.get(node) {
            return Ok(links.clone());
        }
        if self.stop.is_stopped() {
            debug!("Stop signal set, not fetching links for '{}'", node);
            return Err(Stopped);
        }

        self.fetches += 1;
        let links = match self.provider.get_links(node).await {
            Ok(raw) => filter_links(node, raw),
            Err(e) => {
                warn!("{}", e);
                LinkSet::new()
            }
        };

        let links = Arc::new(links);
        self.cache.insert(node.to_string(), links.clone());
        Ok(links)
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Number of provider calls made so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingProvider {
        calls: Cell<usize>,
    }

    impl LinkProvider for CountingProvider {
        async fn get_links(&self, node: &str) -> Result<Vec<Node>, ProviderError> {
            self.calls.set(self.calls.get() + 1);
            match node {
                "broken" => Err(ProviderError::new(node, "connection reset")),
                _ => Ok(vec!["A".to_string(), "1999年".to_string()]),
            }
        }
    }

    #[tokio::test]
    async fn test_links_are_filtered_and_cached() {
        let provider = CountingProvider { calls: Cell::new(0) };
        let mut fetcher = LinkFetcher::new(&provider, StopSignal::new());

        let first = fetcher.links("X").await.unwrap();
        let second = fetcher.links("X").await.unwrap();

        assert_eq!(first.len(), 1);
        assert!(first.contains("A"));
        assert_eq!(first, second);
        assert_eq!(provider.calls.get(), 1);
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_provider_error_becomes_empty_set() {
        let provider = CountingProvider { calls: Cell::new(0) };
        let mut fetcher = LinkFetcher::new(&provider, StopSignal::new());

        let links = fetcher.links("broken").await.unwrap();
        assert!(links.is_empty());
    }

    #[tokio::test]
    async fn test_stopped_fetcher_makes_no_calls() {
        let provider = CountingProvider { calls: Cell::new(0) };
        let stop = StopSignal::new();
        stop.stop();
        let mut fetcher = LinkFetcher::new(&provider, stop);

        assert_eq!(fetcher.links("X").await, Err(Stopped));
        assert_eq!(provider.calls.get(), 0);
    }
}
