use serde::{Serialize, Deserialize};

use super::BlockCoordinate;

/// Inclusive `[min, max]` rectangle of cells.
///
/// Each dimension is always a two-element pair. A range is empty when
/// `min > max` in either dimension; [`DataRange::EMPTY`] is the canonical
/// empty selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataRange {
    pub rows: [usize; 2],
    pub cols: [usize; 2],
}

impl DataRange {
    pub const EMPTY: DataRange = DataRange {
        rows: [1, 0],
        cols: [1, 0],
    };

    pub fn new(rows: [usize; 2], cols: [usize; 2]) -> Self {
        Self { rows, cols }
    }

    /// Range holding a single cell
    pub fn cell(row: usize, col: usize) -> Self {
        Self::new([row, row], [col, col])
    }

    pub fn is_empty(&self) -> bool {
        self.rows[0] > self.rows[1] || self.cols[0] > self.cols[1]
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.rows[0]..=self.rows[1]).contains(&row) && (self.cols[0]..=self.cols[1]).contains(&col)
    }

    pub fn row_count(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.rows[1] - self.rows[0] + 1
        }
    }

    pub fn col_count(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.cols[1] - self.cols[0] + 1
        }
    }
}

/// Block-granularity span covering a [`DataRange`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRange {
    pub block_rows: [usize; 2],
    pub block_cols: [usize; 2],
}

impl BlockRange {
    pub fn new(block_rows: [usize; 2], block_cols: [usize; 2]) -> Self {
        Self { block_rows, block_cols }
    }

    /// Range holding exactly one block
    pub fn single(coord: BlockCoordinate) -> Self {
        Self::new(
            [coord.block_row, coord.block_row],
            [coord.block_col, coord.block_col],
        )
    }

    pub fn contains(&self, coord: BlockCoordinate) -> bool {
        (self.block_rows[0]..=self.block_rows[1]).contains(&coord.block_row)
            && (self.block_cols[0]..=self.block_cols[1]).contains(&coord.block_col)
    }

    /// Number of blocks covered
    pub fn len(&self) -> usize {
        let rows = (self.block_rows[1] + 1).saturating_sub(self.block_rows[0]);
        let cols = (self.block_cols[1] + 1).saturating_sub(self.block_cols[0]);
        rows * cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-major walk over every covered block
    pub fn iter(&self) -> BlockRangeIter {
        BlockRangeIter {
            range: *self,
            next: if self.is_empty() {
                None
            } else {
                Some(BlockCoordinate::new(self.block_rows[0], self.block_cols[0]))
            },
        }
    }
}

impl IntoIterator for BlockRange {
    type Item = BlockCoordinate;
    type IntoIter = BlockRangeIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct BlockRangeIter {
    range: BlockRange,
    next: Option<BlockCoordinate>,
}

impl Iterator for BlockRangeIter {
    type Item = BlockCoordinate;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = if current.block_col < self.range.block_cols[1] {
            Some(BlockCoordinate::new(current.block_row, current.block_col + 1))
        } else if current.block_row < self.range.block_rows[1] {
            Some(BlockCoordinate::new(current.block_row + 1, self.range.block_cols[0]))
        } else {
            None
        };
        Some(current)
    }
}
