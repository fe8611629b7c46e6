// Candidate ranking: intersection scores against a link history, or
// similarity to a fixed base node

use crate::links::SimilarityOracle;
use crate::model::{LinkSet, Node, round_score};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Number of candidates kept in each ranking log.
pub const LOG_LIMIT: usize = 10;

/// A candidate scored by link-set intersection.
#[derive(Debug, Clone)]
pub struct IntersectionCandidate {
    pub node: Node,
    /// `|r_i ∩ links|` for each reference set, in history order.
    pub scores: Vec<usize>,
    pub total: usize,
    pub out_degree: usize,
    pub links: Arc<LinkSet>,
}

/// A candidate scored by similarity to a base node.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityCandidate {
    pub node: Node,
    pub similarity: f64,
}

/// Score every candidate against every reference set and sort by total,
/// highest first. Equal totals are ordered by node name.
pub fn rank_by_intersection(
    references: &[Arc<LinkSet>],
    candidates: Vec<(Node, Arc<LinkSet>)>,
) -> Vec<IntersectionCandidate> {
    let mut ranked: Vec<IntersectionCandidate> = candidates
        .into_iter()
        .map(|(node, links)| {
            let scores: Vec<usize> = references
                .iter()
                .map(|reference| reference.intersection(&links).count())
                .collect();
            IntersectionCandidate {
                node,
                total: scores.iter().sum(),
                scores,
                out_degree: links.len(),
                links,
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.node.cmp(&b.node)));
    ranked
}

/// Score candidates by similarity to `base`, highest first.
///
/// Candidates the oracle cannot compare (either side outside its vocabulary)
/// are dropped, as is `base` itself. Equal scores are ordered by node name.
pub fn rank_by_similarity<'c, O, I>(oracle: &O, base: &str, candidates: I) -> Vec<SimilarityCandidate>
where
    O: SimilarityOracle,
    I: IntoIterator<Item = &'c Node>,
{
    let mut ranked: Vec<SimilarityCandidate> = candidates
        .into_iter()
        .filter(|node| node.as_str() != base)
        .filter_map(|node| {
            oracle.similarity(base, node).map(|similarity| SimilarityCandidate {
                node: node.clone(),
                similarity,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| a.node.cmp(&b.node))
    });
    ranked
}

/// One line of a ranking log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub keyword: Node,
    pub total: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scores: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_degree: Option<usize>,
}

/// The top of one ranking step, kept for the human-readable decision log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingLog {
    pub depth: usize,
    pub entries: Vec<LogEntry>,
}

impl RankingLog {
    pub fn intersection(depth: usize, ranked: &[IntersectionCandidate]) -> Self {
        let entries = ranked
            .iter()
            .take(LOG_LIMIT)
            .map(|c| LogEntry {
                keyword: c.node.clone(),
                total: c.total as f64,
                scores: c.scores.clone(),
                out_degree: Some(c.out_degree),
            })
            .collect();
        Self { depth, entries }
    }

    pub fn similarity(depth: usize, ranked: &[SimilarityCandidate]) -> Self {
        let entries = ranked
            .iter()
            .take(LOG_LIMIT)
            .map(|c| LogEntry {
                keyword: c.node.clone(),
                total: round_score(c.similarity),
                scores: Vec::new(),
                out_degree: None,
            })
            .collect();
        Self { depth, entries }
    }
}

impl fmt::Display for RankingLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[candidates] depth {}:", self.depth)?;
        if self.entries.is_empty() {
            write!(f, "\n - (none)")?;
        }
        for entry in &self.entries {
            match entry.out_degree {
                Some(out_degree) => {
                    let scores: Vec<String> = entry
                        .scores
                        .iter()
                        .enumerate()
                        .map(|(i, s)| format!("k{}={}", i + 1, s))
                        .collect();
                    write!(
                        f,
                        "\n - {}: Total={}, {}, out-degree={}",
                        entry.keyword,
                        entry.total,
                        scores.join(", "),
                        out_degree
                    )?;
                }
                None => write!(f, "\n - {}: similarity={:.3}", entry.keyword, entry.total)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn set(items: &[&str]) -> Arc<LinkSet> {
        Arc::new(items.iter().map(|s| s.to_string()).collect())
    }

    struct TableOracle {
        vocabulary: Vec<&'static str>,
        pairs: HashMap<(&'static str, &'static str), f64>,
    }

    impl SimilarityOracle for TableOracle {
        fn contains(&self, node: &str) -> bool {
            self.vocabulary.contains(&node)
        }

        fn similarity(&self, a: &str, b: &str) -> Option<f64> {
            if !self.contains(a) || !self.contains(b) {
                return None;
            }
            self.pairs
                .iter()
                .find(|((x, y), _)| (*x == a && *y == b) || (*x == b && *y == a))
                .map(|(_, s)| *s)
                .or(Some(0.0))
        }
    }

    #[test]
    fn test_intersection_scores_per_reference() {
        let references = vec![set(&["a", "b", "c"]), set(&["c", "d"])];
        let ranked = rank_by_intersection(
            &references,
            vec![
                ("X".to_string(), set(&["a", "c", "z"])),
                ("Y".to_string(), set(&["q"])),
            ],
        );

        assert_eq!(ranked[0].node, "X");
        assert_eq!(ranked[0].scores, vec![2, 1]);
        assert_eq!(ranked[0].total, 3);
        assert_eq!(ranked[0].out_degree, 3);
        assert_eq!(ranked[1].node, "Y");
        assert_eq!(ranked[1].total, 0);
    }

    #[test]
    fn test_intersection_ties_break_by_name() {
        let references = vec![set(&["a"])];
        let ranked = rank_by_intersection(
            &references,
            vec![
                ("zeta".to_string(), set(&["a"])),
                ("alpha".to_string(), set(&["a"])),
                ("mid".to_string(), set(&["a"])),
            ],
        );
        let names: Vec<&str> = ranked.iter().map(|c| c.node.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_intersection_ranking_is_idempotent() {
        let references = vec![set(&["a", "b"]), set(&["b", "c"])];
        let pool = vec![
            ("P".to_string(), set(&["b"])),
            ("Q".to_string(), set(&["a", "b", "c"])),
            ("R".to_string(), set(&["c"])),
        ];

        let first = rank_by_intersection(&references, pool.clone());
        let second = rank_by_intersection(&references, pool);

        let summary = |r: &[IntersectionCandidate]| -> Vec<(String, usize)> {
            r.iter().map(|c| (c.node.clone(), c.total)).collect()
        };
        assert_eq!(summary(&first), summary(&second));
    }

    #[test]
    fn test_similarity_excludes_out_of_vocabulary() {
        let oracle = TableOracle {
            vocabulary: vec!["A", "B"],
            pairs: HashMap::from([(("A", "B"), 0.5)]),
        };
        let candidates: Vec<Node> = vec!["A".into(), "B".into(), "C".into()];
        let ranked = rank_by_similarity(&oracle, "A", &candidates);

        assert_eq!(
            ranked,
            vec![SimilarityCandidate {
                node: "B".to_string(),
                similarity: 0.5
            }]
        );
    }

    #[test]
    fn test_similarity_with_unknown_base_is_empty() {
        let oracle = TableOracle {
            vocabulary: vec!["B", "C"],
            pairs: HashMap::new(),
        };
        let candidates: Vec<Node> = vec!["B".into(), "C".into()];
        assert!(rank_by_similarity(&oracle, "A", &candidates).is_empty());
    }

    #[test]
    fn test_similarity_sorted_descending() {
        let oracle = TableOracle {
            vocabulary: vec!["A", "B", "C", "D"],
            pairs: HashMap::from([(("A", "B"), 0.2), (("A", "C"), 0.9), (("A", "D"), 0.5)]),
        };
        let candidates: Vec<Node> = vec!["B".into(), "C".into(), "D".into()];
        let ranked = rank_by_similarity(&oracle, "A", &candidates);
        let names: Vec<&str> = ranked.iter().map(|c| c.node.as_str()).collect();
        assert_eq!(names, vec!["C", "D", "B"]);
    }

    #[test]
    fn test_similarity_ties_break_by_name() {
        let oracle = TableOracle {
            vocabulary: vec!["A", "B", "C", "D", "E"],
            pairs: HashMap::from([
                (("A", "E"), 0.7),
                (("A", "C"), 0.7),
                (("A", "D"), 0.9),
                (("A", "B"), 0.7),
            ]),
        };
        let candidates: Vec<Node> = vec!["E".into(), "C".into(), "D".into(), "B".into()];
        let ranked = rank_by_similarity(&oracle, "A", &candidates);
        let names: Vec<&str> = ranked.iter().map(|c| c.node.as_str()).collect();
        assert_eq!(names, vec!["D", "B", "C", "E"]);
    }

    #[test]
    fn test_log_is_truncated_to_limit() {
        let references = vec![set(&["a"])];
        let pool: Vec<(Node, Arc<LinkSet>)> = (0..25)
            .map(|i| (format!("n{:02}", i), set(&["a"])))
            .collect();
        let ranked = rank_by_intersection(&references, pool);
        let log = RankingLog::intersection(4, &ranked);

        assert_eq!(ranked.len(), 25);
        assert_eq!(log.entries.len(), LOG_LIMIT);
        assert_eq!(log.entries[0].keyword, "n00");
    }

    #[test]
    fn test_log_display() {
        let references = vec![set(&["a", "b"]), set(&["b"])];
        let ranked = rank_by_intersection(&references, vec![("X".to_string(), set(&["b"]))]);
        let text = RankingLog::intersection(4, &ranked).to_string();
        assert_eq!(text, "[candidates] depth 4:\n - X: Total=2, k1=1, k2=1, out-degree=1");
    }
}
