//! Fully resident rows

use std::sync::Arc;
use async_trait::async_trait;
use gv_core::{Cell, CellValue, GridExtent};

use super::{BlockProvider, BlockRequest};
use crate::DataError;
use crate::cache::Block;

/// Provider over rows already held in memory
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    columns: Vec<String>,
    rows: Arc<Vec<Vec<CellValue>>>,
}

impl MemoryProvider {
    /// Rows may be ragged; missing trailing values stay unset
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            columns,
            rows: Arc::new(rows),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Row count by column count; the widest row counts when it exceeds the names
    pub fn extent(&self) -> GridExtent {
        let widest = self.rows.iter().map(|r| r.len()).max().unwrap_or(0);
        GridExtent::new(self.rows.len(), widest.max(self.columns.len()))
    }

    fn fill_from(rows: &[Vec<CellValue>], block: &mut Block) {
        let range = block.range();
        if range.is_empty() {
            return;
        }
        for row in range.rows[0]..=range.rows[1] {
            let Some(values) = rows.get(row) else {
                break;
            };
            for col in range.cols[0]..=range.cols[1] {
                if let Some(value) = values.get(col) {
                    block.set_cell(row, col, Cell::new(value.clone()));
                }
            }
        }
    }
}

#[async_trait]
impl BlockProvider for MemoryProvider {
    type Raw = Arc<Vec<Vec<CellValue>>>;

    fn fetch_now(&self, _request: &BlockRequest) -> Option<Result<Self::Raw, DataError>> {
        Some(Ok(self.rows.clone()))
    }

    async fn fetch(&self, _request: BlockRequest) -> Result<Self::Raw, DataError> {
        Ok(self.rows.clone())
    }

    fn fill(&self, raw: Self::Raw, block: &mut Block) -> Result<(), DataError> {
        Self::fill_from(&raw, block);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gv_core::{BlockCoordinate, DataRange};

    #[test]
    fn test_extent_uses_widest_row() {
        let provider = MemoryProvider::new(
            vec!["a".into()],
            vec![vec![1.0.into()], vec![1.0.into(), 2.0.into(), 3.0.into()]],
        );
        assert_eq!(provider.extent(), GridExtent::new(2, 3));
    }

    #[test]
    fn test_fill_copies_only_block_cells() {
        let rows: Vec<Vec<CellValue>> = (0..4)
            .map(|r| (0..4).map(|c| CellValue::Number((r * 10 + c) as f64)).collect())
            .collect();
        let provider = MemoryProvider::new(Vec::new(), rows);

        let request = BlockRequest {
            coord: BlockCoordinate::new(1, 1),
            range: DataRange::new([2, 3], [2, 3]),
        };
        let raw = provider.fetch_now(&request).unwrap().unwrap();

        let mut block = Block::new(request.coord, request.range);
        provider.fill(raw, &mut block).unwrap();

        assert_eq!(block.filled(), 4);
        assert_eq!(block.cell(3, 2).and_then(|c| c.value.as_f64()), Some(32.0));
        assert!(block.cell(1, 1).is_none());
    }
}
