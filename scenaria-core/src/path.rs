// Multi-anchor scenario paths: two fixed anchors, a ranked third anchor, then
// greedy extension by intersection with the whole link history

use crate::context::{Stopped, TraversalContext};
use crate::links::{LinkFetcher, LinkProvider};
use crate::model::{LinkSet, Node, Outcome, PathStep, ScenarioPath};
use crate::rank::{IntersectionCandidate, RankingLog, rank_by_intersection};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Depth of the ranked third anchor.
pub const THIRD_ANCHOR_DEPTH: usize = 3;

/// One finished scenario path with its decision log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRun {
    pub steps: ScenarioPath,
    pub logs: Vec<RankingLog>,
    pub outcome: Outcome,
}

impl ScenarioRun {
    pub fn keywords(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.keyword.as_str()).collect()
    }
}

/// The two fixed anchors and their filtered link sets.
#[derive(Debug, Clone)]
pub struct Anchors {
    pub first: Node,
    pub first_links: Arc<LinkSet>,
    pub second: Node,
    pub second_links: Arc<LinkSet>,
}

/// Ranked third-anchor candidates, each of which can seed one scenario.
#[derive(Debug, Clone)]
pub struct ThirdAnchorRanking {
    pub anchors: Anchors,
    pub candidates: Vec<IntersectionCandidate>,
    pub log: RankingLog,
}

pub struct ScenarioPathBuilder {
    max_depth: usize,
}

impl ScenarioPathBuilder {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Rank the second anchor's links against both anchors' link sets.
    pub async fn rank_third_anchors<P: LinkProvider>(
        &self,
        fetcher: &mut LinkFetcher<'_, P>,
        first: &str,
        second: &str,
    ) -> Result<ThirdAnchorRanking, Stopped> {
        let first_links = fetcher.links(first).await?;
        let second_links = fetcher.links(second).await?;

        let mut pool = Vec::new();
        for link in second_links.iter() {
            if link == first || link == second {
                continue;
            }
            let links = fetcher.links(link).await?;
            pool.push((link.clone(), links));
        }

        let references = vec![first_links.clone(), second_links.clone()];
        let candidates = rank_by_intersection(&references, pool);
        let log = RankingLog::intersection(THIRD_ANCHOR_DEPTH, &candidates);
        info!(
            "Ranked {} third-anchor candidates for '{}' -> '{}'",
            candidates.len(),
            first,
            second
        );

        Ok(ThirdAnchorRanking {
            anchors: Anchors {
                first: first.to_string(),
                first_links,
                second: second.to_string(),
                second_links,
            },
            candidates,
            log,
        })
    }

    /// Grow one scenario from a chosen third anchor.
    ///
    /// `ctx` should be fresh for each scenario; the anchors and the third
    /// anchor are marked visited here. Returns a partial path when the stop
    /// signal fires.
    pub async fn explore<P: LinkProvider>(
        &self,
        fetcher: &mut LinkFetcher<'_, P>,
        ranking: &ThirdAnchorRanking,
        third: &IntersectionCandidate,
        ctx: &mut TraversalContext,
    ) -> ScenarioRun {
        let anchors = &ranking.anchors;
        ctx.visit(anchors.first.clone());
        ctx.visit(anchors.second.clone());
        ctx.visit(third.node.clone());

        let mut steps = vec![
            PathStep::new(1, anchors.first.clone(), 0.0, anchors.first_links.len()),
            PathStep::new(2, anchors.second.clone(), 0.0, anchors.second_links.len()),
            PathStep::new(
                THIRD_ANCHOR_DEPTH,
                third.node.clone(),
                third.total as f64,
                third.out_degree,
            ),
        ];
        let mut logs = vec![ranking.log.clone()];
        let mut history = vec![
            anchors.first_links.clone(),
            anchors.second_links.clone(),
            third.links.clone(),
        ];
        let mut current = third.node.clone();
        let mut outcome = Outcome::DepthLimitReached;

        for depth in (THIRD_ANCHOR_DEPTH + 1)..=self.max_depth {
            let pool = match Self::candidate_pool(fetcher, &current, ctx).await {
                Ok(pool) => pool,
                Err(Stopped) => {
                    outcome = Outcome::Cancelled;
                    break;
                }
            };
            if pool.is_empty() {
                debug!("No unvisited candidates after '{}' at depth {}", current, depth);
                outcome = Outcome::DeadEnd;
                break;
            }

            let ranked = rank_by_intersection(&history, pool);
            logs.push(RankingLog::intersection(depth, &ranked));

            let best = &ranked[0];
            debug!("Depth {}: '{}' (total {})", depth, best.node, best.total);
            steps.push(PathStep::new(
                depth,
                best.node.clone(),
                best.total as f64,
                best.out_degree,
            ));
            ctx.visit(best.node.clone());
            history.push(best.links.clone());
            current = best.node.clone();
        }

        ScenarioRun {
            steps,
            logs,
            outcome,
        }
    }

    /// Unvisited links of `current`, each paired with its own link set.
    async fn candidate_pool<P: LinkProvider>(
        fetcher: &mut LinkFetcher<'_, P>,
        current: &str,
        ctx: &TraversalContext,
    ) -> Result<Vec<(Node, Arc<LinkSet>)>, Stopped> {
        let current_links = fetcher.links(current).await?;
        let mut pool = Vec::new();
        for link in current_links.iter().filter(|link| !ctx.is_visited(link)) {
            let links = fetcher.links(link).await?;
            pool.push((link.clone(), links));
        }
        Ok(pool)
    }
}
