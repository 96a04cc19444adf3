use serde::{Serialize, Deserialize};

/// Identifies one cache block: `floor(index / block size)` per dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockCoordinate {
    pub block_row: usize,
    pub block_col: usize,
}

impl BlockCoordinate {
    pub fn new(block_row: usize, block_col: usize) -> Self {
        Self { block_row, block_col }
    }
}

impl std::fmt::Display for BlockCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.block_row, self.block_col)
    }
}

/// Rows and columns held by one block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSize {
    pub rows: usize,
    pub cols: usize,
}

impl BlockSize {
    pub const DEFAULT_ROWS: usize = 300;
    pub const DEFAULT_COLS: usize = 100;

    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        Self {
            rows: Self::DEFAULT_ROWS,
            cols: Self::DEFAULT_COLS,
        }
    }
}
