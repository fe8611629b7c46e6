use thiserror::Error;

/// Errors that stop an exploration before it starts.
#[derive(Error, Debug)]
pub enum ExploreError {
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// A link provider failed to answer for a node.
///
/// Never fatal: the engine logs it and treats the node as having no links.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Link provider failed for '{node}': {message}")]
pub struct ProviderError {
    pub node: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExploreError>;
