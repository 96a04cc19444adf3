//! A single cache block

use gv_core::{BlockCoordinate, Cell, DataRange};

/// Materialization status of a stored block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStatus {
    /// Allocated, nothing written yet
    Empty,
    /// Cells filled by a provider
    Loaded,
    /// The fetch failed; cells stay unset
    Error,
}

/// Rectangular piece of the grid.
///
/// Cells are addressed by absolute `(row, col)` and stored row-major. The
/// backing vector is allocated on the first write.
#[derive(Debug)]
pub struct Block {
    coord: BlockCoordinate,
    range: DataRange,
    status: BlockStatus,
    cells: Vec<Option<Cell>>,
}

impl Block {
    pub fn new(coord: BlockCoordinate, range: DataRange) -> Self {
        Self {
            coord,
            range,
            status: BlockStatus::Empty,
            cells: Vec::new(),
        }
    }

    pub fn coord(&self) -> BlockCoordinate {
        self.coord
    }

    /// Cells covered by this block, clamped to the extent it was created under
    pub fn range(&self) -> DataRange {
        self.range
    }

    pub fn status(&self) -> BlockStatus {
        self.status
    }

    pub fn is_loaded(&self) -> bool {
        self.status == BlockStatus::Loaded
    }

    pub fn rows(&self) -> usize {
        self.range.row_count()
    }

    pub fn cols(&self) -> usize {
        self.range.col_count()
    }

    fn offset(&self, row: usize, col: usize) -> Option<usize> {
        if !self.range.contains(row, col) {
            return None;
        }
        let local_row = row - self.range.rows[0];
        let local_col = col - self.range.cols[0];
        Some(local_row * self.cols() + local_col)
    }

    /// Cell at absolute coordinates, `None` if unset or outside the block
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        let offset = self.offset(row, col)?;
        self.cells.get(offset).and_then(|c| c.as_ref())
    }

    /// Store a cell; returns false for coordinates outside the block
    pub fn set_cell(&mut self, row: usize, col: usize, cell: Cell) -> bool {
        let Some(offset) = self.offset(row, col) else {
            return false;
        };
        if self.cells.is_empty() {
            self.cells.resize(self.rows() * self.cols(), None);
        }
        self.cells[offset] = Some(cell);
        true
    }

    /// Number of cells that hold a value
    pub fn filled(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub(crate) fn mark_loaded(&mut self) {
        self.status = BlockStatus::Loaded;
    }

    pub(crate) fn mark_error(&mut self) {
        self.status = BlockStatus::Error;
        self.cells.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_use_absolute_coordinates() {
        let mut block = Block::new(BlockCoordinate::new(1, 0), DataRange::new([10, 19], [0, 4]));
        assert_eq!(block.cell(10, 0), None);

        assert!(block.set_cell(12, 3, Cell::new("x")));
        assert!(!block.set_cell(20, 0, Cell::new("outside")));
        assert!(!block.set_cell(5, 0, Cell::new("outside")));

        assert_eq!(block.cell(12, 3).map(|c| c.value.to_string()), Some("x".to_string()));
        assert_eq!(block.cell(12, 2), None);
        assert_eq!(block.filled(), 1);
    }

    #[test]
    fn test_error_discards_cells() {
        let mut block = Block::new(BlockCoordinate::new(0, 0), DataRange::new([0, 1], [0, 1]));
        block.set_cell(0, 0, Cell::new(1.0));
        block.mark_error();
        assert_eq!(block.status(), BlockStatus::Error);
        assert_eq!(block.cell(0, 0), None);
    }
}
