//! Block addressing and storage
//!
//! [`BlockIndex`] is pure coordinate math plus a sparse 2-D store of
//! [`Block`]s. It does no I/O and holds no fetch state.

mod block;

pub use block::{Block, BlockStatus};

use gv_core::{BlockCoordinate, BlockRange, BlockSize, DataRange, GridExtent};

/// Fetch state of one block coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Absent,
    Pending,
    Loaded,
    Error,
}

/// Maps cell coordinates to blocks and stores the blocks
#[derive(Debug)]
pub struct BlockIndex {
    extent: GridExtent,
    block_size: BlockSize,
    /// Outer index is the block row; both levels may have holes
    blocks: Vec<Vec<Option<Block>>>,
}

impl BlockIndex {
    pub fn new(extent: GridExtent, block_size: BlockSize) -> Self {
        let block_size = BlockSize::new(block_size.rows.max(1), block_size.cols.max(1));
        Self {
            extent,
            block_size,
            blocks: Vec::new(),
        }
    }

    /// Index with the default 300x100 block size
    pub fn with_extent(extent: GridExtent) -> Self {
        Self::new(extent, BlockSize::default())
    }

    pub fn extent(&self) -> GridExtent {
        self.extent
    }

    pub fn block_size(&self) -> BlockSize {
        self.block_size
    }

    /// Replace the extent; all stored blocks are discarded
    pub fn set_extent(&mut self, extent: GridExtent) {
        self.extent = extent;
        self.clear();
    }

    pub fn to_block(&self, row: usize, col: usize) -> BlockCoordinate {
        BlockCoordinate::new(row / self.block_size.rows, col / self.block_size.cols)
    }

    /// Blocks covering `range`.
    ///
    /// Maxima beyond the extent are clamped. Returns `None` for an empty
    /// range, an empty extent, or a range that starts past the extent.
    pub fn to_block_range(&self, range: &DataRange) -> Option<BlockRange> {
        if range.is_empty() || self.extent.is_empty() {
            return None;
        }
        if range.rows[0] >= self.extent.total_rows || range.cols[0] >= self.extent.total_cols {
            return None;
        }

        let max_row = range.rows[1].min(self.extent.total_rows - 1);
        let max_col = range.cols[1].min(self.extent.total_cols - 1);
        let min = self.to_block(range.rows[0], range.cols[0]);
        let max = self.to_block(max_row, max_col);

        Some(BlockRange::new(
            [min.block_row, max.block_row],
            [min.block_col, max.block_col],
        ))
    }

    /// Cells covered by `block`, upper bounds clamped to the extent
    pub fn to_data_range(&self, block: BlockCoordinate) -> DataRange {
        let row_start = block.block_row * self.block_size.rows;
        let col_start = block.block_col * self.block_size.cols;
        let row_end = (row_start + self.block_size.rows - 1).min(self.extent.total_rows.saturating_sub(1));
        let col_end = (col_start + self.block_size.cols - 1).min(self.extent.total_cols.saturating_sub(1));

        DataRange::new([row_start, row_end], [col_start, col_end])
    }

    /// Number of blocks along each dimension as `(rows, cols)`
    pub fn blocks_per_dimension(&self) -> (usize, usize) {
        (
            self.extent.total_rows.div_ceil(self.block_size.rows),
            self.extent.total_cols.div_ceil(self.block_size.cols),
        )
    }

    /// Stored block, or `None` when never created or out of storage bounds
    pub fn get_cache_block(&self, coord: BlockCoordinate) -> Option<&Block> {
        self.blocks
            .get(coord.block_row)
            .and_then(|row| row.get(coord.block_col))
            .and_then(|slot| slot.as_ref())
    }

    pub fn get_cache_block_mut(&mut self, coord: BlockCoordinate) -> Option<&mut Block> {
        self.blocks
            .get_mut(coord.block_row)
            .and_then(|row| row.get_mut(coord.block_col))
            .and_then(|slot| slot.as_mut())
    }

    fn slot_mut(&mut self, coord: BlockCoordinate) -> &mut Option<Block> {
        if self.blocks.len() <= coord.block_row {
            self.blocks.resize_with(coord.block_row + 1, Vec::new);
        }
        let row = &mut self.blocks[coord.block_row];
        if row.len() <= coord.block_col {
            row.resize_with(coord.block_col + 1, || None);
        }
        &mut row[coord.block_col]
    }

    /// Allocate storage for `coord`, replacing any existing block there
    pub fn create_cache_block(&mut self, coord: BlockCoordinate) -> &mut Block {
        let block = Block::new(coord, self.to_data_range(coord));
        self.slot_mut(coord).insert(block)
    }

    /// Number of stored blocks
    pub fn len(&self) -> usize {
        self.blocks
            .iter()
            .map(|row| row.iter().filter(|slot| slot.is_some()).count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard all block storage
    pub fn clear(&mut self) {
        self.blocks.clear();
    }
}
