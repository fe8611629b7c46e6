use scenaria_core::ProviderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Model format error: {0}")]
    ModelFormat(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SourceError {
    pub fn into_provider_error(self, node: &str) -> ProviderError {
        ProviderError::new(node, self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SourceError>;
