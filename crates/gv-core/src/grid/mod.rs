//! Grid addressing vocabulary: extents, block coordinates and ranges.

use serde::{Serialize, Deserialize};

mod position;
mod range;

pub use position::{BlockCoordinate, BlockSize};
pub use range::{DataRange, BlockRange, BlockRangeIter};

/// Logical size of the dataset.
///
/// Zero in both dimensions until a source learns its extent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridExtent {
    pub total_rows: usize,
    pub total_cols: usize,
}

impl GridExtent {
    pub fn new(total_rows: usize, total_cols: usize) -> Self {
        Self { total_rows, total_cols }
    }

    pub fn rows(&self) -> usize {
        self.total_rows
    }

    pub fn columns(&self) -> usize {
        self.total_cols
    }

    /// True when either dimension has no cells
    pub fn is_empty(&self) -> bool {
        self.total_rows == 0 || self.total_cols == 0
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.total_rows && col < self.total_cols
    }

    /// Range covering every cell, or `DataRange::EMPTY` for an empty extent
    pub fn full_range(&self) -> DataRange {
        if self.is_empty() {
            return DataRange::EMPTY;
        }
        DataRange::new([0, self.total_rows - 1], [0, self.total_cols - 1])
    }
}
