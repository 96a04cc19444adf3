//! Block-cached, lazily fetched access to large tabular datasets

pub mod cache;
pub mod config;
pub mod engine;
pub mod projection;
pub mod sources;

use thiserror::Error;

// Re-exports
pub use cache::{Block, BlockIndex, BlockStatus, CacheState};
pub use config::{PartitionedConfig, SourceConfig};
pub use engine::SourceModel;
pub use projection::ColumnProjection;
pub use sources::{
    BlockProvider, BlockRequest, DirFetcher, HttpFetcher, LatencyProvider, MemoryProvider,
    PartFetcher, PartitionHeader, PartitionedProvider,
};

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Coordinate out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid usage: {0}")]
    Usage(String),

    #[error("No async runtime available to run the fetch")]
    Runtime,

    #[error("Other error: {0}")]
    Other(String),
}

impl From<serde_json::Error> for DataError {
    fn from(error: serde_json::Error) -> Self {
        DataError::Parse(error.to_string())
    }
}

impl From<reqwest::Error> for DataError {
    fn from(error: reqwest::Error) -> Self {
        DataError::Network(error.to_string())
    }
}
