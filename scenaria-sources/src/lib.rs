pub mod error;
pub mod sparql;
pub mod vectors;

pub use error::SourceError;
pub use sparql::SparqlLinkProvider;
pub use vectors::{VectorFormat, WordVectors};
