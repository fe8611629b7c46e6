use crate::context::{StopSignal, TraversalContext};
use crate::error::{ExploreError, Result};
use crate::links::{LinkFetcher, LinkProvider, SimilarityOracle};
use crate::model::Node;
use crate::path::{ScenarioPathBuilder, ScenarioRun, THIRD_ANCHOR_DEPTH};
use crate::tree::{ScenarioTreeBuilder, TreeRun};
use rand::Rng;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::{info, warn};

/// Default maximum depth of scenario paths.
pub const DEFAULT_PATH_DEPTH: usize = 7;
/// Default maximum depth of scenario trees.
pub const DEFAULT_TREE_DEPTH: usize = 6;
/// Default number of independent scenarios per run.
pub const DEFAULT_FANOUT: usize = 3;
/// Number of first-anchor links offered when choosing the second anchor.
pub const ANCHOR_SAMPLE_SIZE: usize = 20;

/// Callback for reporting exploration progress
pub type ExploreProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Options for configuring an exploration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplorationConfig {
    pub max_depth: usize,
    pub fanout: usize,
}

impl ExplorationConfig {
    pub fn for_paths() -> Self {
        Self {
            max_depth: DEFAULT_PATH_DEPTH,
            fanout: DEFAULT_FANOUT,
        }
    }

    pub fn for_trees() -> Self {
        Self {
            max_depth: DEFAULT_TREE_DEPTH,
            fanout: DEFAULT_FANOUT,
        }
    }

    /// Paths always contain the two anchors and the third anchor.
    pub fn validate_for_paths(&self) -> Result<()> {
        self.validate_fanout()?;
        if self.max_depth < THIRD_ANCHOR_DEPTH {
            return Err(ExploreError::Configuration(format!(
                "max depth for scenario paths must be at least {}, got {}",
                THIRD_ANCHOR_DEPTH, self.max_depth
            )));
        }
        Ok(())
    }

    pub fn validate_for_trees(&self) -> Result<()> {
        self.validate_fanout()?;
        if self.max_depth < 1 {
            return Err(ExploreError::Configuration(
                "max depth for scenario trees must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_fanout(&self) -> Result<()> {
        if self.fanout == 0 {
            return Err(ExploreError::Configuration(
                "fanout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self::for_paths()
    }
}

/// How the second anchor was picked from an [`AnchorSample`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorSelection {
    /// Position in the sampled candidate list
    Index(usize),
    /// Any keyword, used verbatim
    Keyword(String),
}

impl AnchorSelection {
    /// Interpret user input: plain ASCII digits pick from the sample, anything
    /// else (including signed numbers) is a keyword.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if !input.is_empty()
            && input.bytes().all(|b| b.is_ascii_digit())
            && let Ok(index) = input.parse::<usize>()
        {
            return AnchorSelection::Index(index);
        }
        AnchorSelection::Keyword(input.to_string())
    }
}

/// Randomly sampled links of the first anchor, offered as second-anchor choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorSample {
    pub anchor: Node,
    pub candidates: Vec<Node>,
}

impl AnchorSample {
    /// Resolve a selection to a node. An index outside the sample is treated as
    /// a literal keyword.
    pub fn resolve(&self, selection: &AnchorSelection) -> Node {
        match selection {
            AnchorSelection::Index(index) => self
                .candidates
                .get(*index)
                .cloned()
                .unwrap_or_else(|| index.to_string()),
            AnchorSelection::Keyword(keyword) => keyword.clone(),
        }
    }
}

/// Drives the path and tree builders and aggregates their results.
pub struct Orchestrator<P, O = ()> {
    provider: P,
    oracle: O,
    fanout: usize,
    stop: StopSignal,
    progress_callback: Option<ExploreProgressCallback>,
}

impl<P: LinkProvider> Orchestrator<P, ()> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            oracle: (),
            fanout: DEFAULT_FANOUT,
            stop: StopSignal::new(),
            progress_callback: None,
        }
    }
}

impl<P: LinkProvider, O> Orchestrator<P, O> {
    pub fn with_oracle<O2: SimilarityOracle>(self, oracle: O2) -> Orchestrator<P, O2> {
        Orchestrator {
            provider: self.provider,
            oracle,
            fanout: self.fanout,
            stop: self.stop,
            progress_callback: self.progress_callback,
        }
    }

    /// Number of third anchors expanded by [`Orchestrator::build_scenario_paths`].
    ///
    /// Tree runs take their fanout per call in [`Orchestrator::build_scenario_trees`].
    pub fn with_fanout(mut self, fanout: usize) -> Self {
        self.fanout = fanout;
        self
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_progress_callback(mut self, callback: ExploreProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    fn report(&self, message: String) {
        if let Some(ref callback) = self.progress_callback {
            callback(message);
        }
    }

    /// Sample up to `sample_size` links of the first anchor for choosing the second.
    pub async fn sample_second_anchors<R: Rng + ?Sized>(
        &self,
        first: &str,
        sample_size: usize,
        rng: &mut R,
    ) -> Result<AnchorSample> {
        let first = require_seed(first, "first anchor")?;
        let mut fetcher = LinkFetcher::new(&self.provider, self.stop.clone());
        let links = fetcher.links(first).await.map_err(|_| {
            ExploreError::Configuration("exploration stopped before sampling anchors".to_string())
        })?;
        if links.is_empty() {
            return Err(ExploreError::Configuration(format!(
                "no links found for initial keyword '{}'",
                first
            )));
        }

        let all: Vec<Node> = links.iter().cloned().collect();
        let mut candidates: Vec<Node> = all.choose_multiple(rng, sample_size).cloned().collect();
        candidates.shuffle(rng);

        Ok(AnchorSample {
            anchor: first.to_string(),
            candidates,
        })
    }

    /// Build up to `fanout` independent scenario paths from two anchors.
    pub async fn build_scenario_paths(
        &self,
        first: &str,
        second: &str,
        max_depth: usize,
    ) -> Result<Vec<ScenarioRun>> {
        let config = ExplorationConfig {
            max_depth,
            fanout: self.fanout,
        };
        config.validate_for_paths()?;
        let first = require_seed(first, "first anchor")?;
        let second = require_seed(second, "second anchor")?;
        if first == second {
            return Err(ExploreError::Configuration(format!(
                "anchors must differ, both are '{}'",
                first
            )));
        }

        let builder = ScenarioPathBuilder::new(config.max_depth);
        let mut fetcher = LinkFetcher::new(&self.provider, self.stop.clone());

        self.report(format!("Ranking third anchors for {} -> {}", first, second));
        let ranking = match builder.rank_third_anchors(&mut fetcher, first, second).await {
            Ok(ranking) => ranking,
            Err(_) => {
                warn!("Exploration stopped while ranking third anchors");
                return Ok(Vec::new());
            }
        };

        let seeds: Vec<_> = ranking.candidates.iter().take(config.fanout).collect();
        let mut runs = Vec::with_capacity(seeds.len());
        for (i, third) in seeds.iter().enumerate() {
            self.report(format!(
                "Scenario {}/{}: extending from '{}'",
                i + 1,
                seeds.len(),
                third.node
            ));
            let mut ctx = TraversalContext::new();
            let run = builder.explore(&mut fetcher, &ranking, third, &mut ctx).await;
            info!(
                "Scenario {} finished with {} steps ({})",
                i + 1,
                run.steps.len(),
                run.outcome.as_str()
            );
            runs.push(run);
        }

        info!(
            "Built {} scenario paths with {} link fetches",
            runs.len(),
            fetcher.fetch_count()
        );
        Ok(runs)
    }
}

impl<P: LinkProvider, O: SimilarityOracle> Orchestrator<P, O> {
    /// Build up to `fanout` independent similarity-guided trees from `start`.
    pub async fn build_scenario_trees(
        &self,
        start: &str,
        max_depth: usize,
        fanout: usize,
    ) -> Result<Vec<TreeRun>> {
        let config = ExplorationConfig { max_depth, fanout };
        config.validate_for_trees()?;
        let start = require_seed(start, "start node")?;

        let builder = ScenarioTreeBuilder::new(config.max_depth);
        let mut fetcher = LinkFetcher::new(&self.provider, self.stop.clone());

        self.report(format!("Ranking links of '{}'", start));
        let ranking = match builder.rank_seeds(&mut fetcher, &self.oracle, start).await {
            Ok(ranking) => ranking,
            Err(_) => {
                warn!("Exploration stopped while ranking seeds");
                return Ok(Vec::new());
            }
        };

        let seeds: Vec<_> = ranking.candidates.iter().take(config.fanout).collect();
        let mut runs = Vec::with_capacity(seeds.len());
        for (i, seed) in seeds.iter().enumerate() {
            self.report(format!(
                "Scenario {}/{}: following '{}'",
                i + 1,
                seeds.len(),
                seed.node
            ));
            let mut ctx = TraversalContext::seeded([start]);
            let mut run = builder
                .build(&mut fetcher, &self.oracle, start, &seed.node, &mut ctx)
                .await;
            run.logs.insert(0, ranking.log.clone());
            info!(
                "Scenario {} reached depth {} ({})",
                i + 1,
                run.tree.max_depth(),
                run.outcome.as_str()
            );
            runs.push(run);
        }

        Ok(runs)
    }
}

fn require_seed<'a>(node: &'a str, role: &str) -> Result<&'a str> {
    let node = node.trim();
    if node.is_empty() {
        return Err(ExploreError::Configuration(format!("missing {}", role)));
    }
    Ok(node)
}
