pub mod context;
pub mod error;
pub mod explore;
pub mod filter;
pub mod links;
pub mod model;
pub mod path;
pub mod rank;
pub mod report;
pub mod tree;

pub use context::{StopSignal, TraversalContext};
pub use error::{ExploreError, ProviderError};
pub use explore::{AnchorSample, AnchorSelection, ExplorationConfig, Orchestrator};
pub use links::{LinkProvider, SimilarityOracle};
pub use model::{LinkSet, Node, Outcome, PathStep, ScenarioPath, ScenarioTreeNode};
pub use path::ScenarioRun;
pub use tree::TreeRun;
