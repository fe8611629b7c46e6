// Similarity-guided scenario trees: from each seed, keep following the
// unvisited link closest to the fixed base node

use crate::context::{Stopped, TraversalContext};
use crate::links::{LinkFetcher, LinkProvider, SimilarityOracle};
use crate::model::{Node, Outcome, ScenarioTreeNode};
use crate::rank::{RankingLog, SimilarityCandidate, rank_by_similarity};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Score given to the start node at the root of every tree.
pub const ROOT_SCORE: f64 = 1.0;

/// One finished scenario tree with its decision log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeRun {
    pub tree: ScenarioTreeNode,
    pub logs: Vec<RankingLog>,
    pub outcome: Outcome,
}

/// Ranked links of the start node, each of which can seed one tree.
#[derive(Debug, Clone)]
pub struct SeedRanking {
    pub start: Node,
    pub candidates: Vec<SimilarityCandidate>,
    pub log: RankingLog,
}

pub struct ScenarioTreeBuilder {
    max_depth: usize,
}

impl ScenarioTreeBuilder {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Rank the start node's links by similarity to the start node itself.
    pub async fn rank_seeds<P: LinkProvider, O: SimilarityOracle>(
        &self,
        fetcher: &mut LinkFetcher<'_, P>,
        oracle: &O,
        start: &str,
    ) -> Result<SeedRanking, Stopped> {
        let links = fetcher.links(start).await?;
        let candidates = rank_by_similarity(oracle, start, links.iter());
        info!(
            "Ranked {} of {} links of '{}' by similarity",
            candidates.len(),
            links.len(),
            start
        );
        Ok(SeedRanking {
            start: start.to_string(),
            log: RankingLog::similarity(1, &candidates),
            candidates,
        })
    }

    /// Build one tree rooted at `base` whose single child chain starts at `seed`.
    ///
    /// `ctx` should contain only `base` on entry.
    pub async fn build<P: LinkProvider, O: SimilarityOracle>(
        &self,
        fetcher: &mut LinkFetcher<'_, P>,
        oracle: &O,
        base: &str,
        seed: &str,
        ctx: &mut TraversalContext,
    ) -> TreeRun {
        let (chain, logs, outcome) = self.descend(fetcher, oracle, base, seed, ctx).await;

        let mut child: Option<ScenarioTreeNode> = None;
        for (keyword, depth, score) in chain.into_iter().rev() {
            let mut node = ScenarioTreeNode::leaf(keyword, depth, score);
            node.children.extend(child.take());
            child = Some(node);
        }

        let mut tree = ScenarioTreeNode::leaf(base, 0, ROOT_SCORE);
        tree.children.extend(child);

        TreeRun {
            tree,
            logs,
            outcome,
        }
    }

    /// Follow the best unvisited link until the depth cap, a dead end, or a stop.
    async fn descend<P: LinkProvider, O: SimilarityOracle>(
        &self,
        fetcher: &mut LinkFetcher<'_, P>,
        oracle: &O,
        base: &str,
        seed: &str,
        ctx: &mut TraversalContext,
    ) -> (Vec<(Node, usize, f64)>, Vec<RankingLog>, Outcome) {
        let mut chain = Vec::new();
        let mut logs = Vec::new();
        let mut current = seed.to_string();
        let mut depth = 1;
        ctx.visit(current.clone());

        let outcome = loop {
            let score = oracle.similarity(base, &current).unwrap_or(0.0);
            chain.push((current.clone(), depth, score));

            if depth >= self.max_depth {
                break Outcome::DepthLimitReached;
            }

            let links = match fetcher.links(&current).await {
                Ok(links) => links,
                Err(Stopped) => break Outcome::Cancelled,
            };
            let eligible = links
                .iter()
                .filter(|link| !ctx.is_visited(link) && link.as_str() != base);
            let ranked = rank_by_similarity(oracle, base, eligible);
            logs.push(RankingLog::similarity(depth + 1, &ranked));

            let Some(best) = ranked.into_iter().next() else {
                debug!("No comparable unvisited links after '{}' at depth {}", current, depth);
                break Outcome::DeadEnd;
            };
            debug!(
                "Depth {}: '{}' (similarity {:.3})",
                depth + 1,
                best.node,
                best.similarity
            );
            ctx.visit(best.node.clone());
            current = best.node;
            depth += 1;
        };

        (chain, logs, outcome)
    }
}
