//! Source configuration

use std::path::Path;
use serde::{Serialize, Deserialize};
use gv_core::BlockSize;

use crate::DataError;

/// Block geometry and dataset location settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SourceConfig {
    /// Rows held by one cache block
    pub rows_per_block: usize,

    /// Columns held by one cache block
    pub cols_per_block: usize,

    /// Settings for partitioned-file sources
    pub partitioned: PartitionedConfig,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            rows_per_block: BlockSize::DEFAULT_ROWS,
            cols_per_block: BlockSize::DEFAULT_COLS,
            partitioned: PartitionedConfig::default(),
        }
    }
}

/// Where a partitioned dataset keeps its header descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionedConfig {
    /// Header file name, relative to the fetcher root
    pub header: String,
}

impl Default for PartitionedConfig {
    fn default() -> Self {
        Self {
            header: "header.json".to_string(),
        }
    }
}

impl SourceConfig {
    /// Block size with zero dimensions replaced by the defaults
    pub fn block_size(&self) -> BlockSize {
        let rows = if self.rows_per_block == 0 {
            tracing::warn!("rowsPerBlock is 0, using {}", BlockSize::DEFAULT_ROWS);
            BlockSize::DEFAULT_ROWS
        } else {
            self.rows_per_block
        };
        let cols = if self.cols_per_block == 0 {
            tracing::warn!("colsPerBlock is 0, using {}", BlockSize::DEFAULT_COLS);
            BlockSize::DEFAULT_COLS
        } else {
            self.cols_per_block
        };
        BlockSize::new(rows, cols)
    }

    pub fn from_json(json: &str) -> Result<Self, DataError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON configuration file
    pub fn load(path: &Path) -> Result<Self, DataError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        tracing::debug!("Loaded source config from {}: {:?}", path.display(), config);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SourceConfig::from_json(r#"{"rowsPerBlock": 50}"#).unwrap();
        assert_eq!(config.rows_per_block, 50);
        assert_eq!(config.cols_per_block, 100);
        assert_eq!(config.partitioned.header, "header.json");
    }

    #[test]
    fn test_zero_block_size_falls_back() {
        let config = SourceConfig {
            rows_per_block: 0,
            cols_per_block: 7,
            ..Default::default()
        };
        assert_eq!(config.block_size(), BlockSize::new(300, 7));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.json");
        std::fs::write(&path, r#"{"colsPerBlock": 8, "partitioned": {"header": "meta.json"}}"#).unwrap();

        let config = SourceConfig::load(&path).unwrap();
        assert_eq!(config.block_size(), BlockSize::new(300, 8));
        assert_eq!(config.partitioned.header, "meta.json");
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(SourceConfig::from_json("{"), Err(DataError::Parse(_))));
    }
}
