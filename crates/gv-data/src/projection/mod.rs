//! Logical column views over a grid model
//!
//! A [`ColumnProjection`] presents a reordered or reduced set of columns.
//! It only remaps indices; the wrapped model's storage and fetch logic are
//! never touched.

use std::sync::Arc;
use parking_lot::RwLock;
use gv_core::{Cell, ColumnInfo, DataRange, EventMask, GridExtent, GridModel, Publisher};

use crate::DataError;

/// Logical-to-physical column remapping over `M`
pub struct ColumnProjection<M> {
    model: M,
    /// `order[logical] = physical`; `None` is the identity mapping
    order: RwLock<Option<Vec<usize>>>,
}

impl<M: GridModel> ColumnProjection<M> {
    /// Wrap `model`. The order may reorder, subset or repeat physical columns.
    pub fn new(model: M, order: Option<Vec<usize>>) -> Self {
        Self {
            model,
            order: RwLock::new(order),
        }
    }

    /// Identity passthrough
    pub fn identity(model: M) -> Self {
        Self::new(model, None)
    }

    pub fn inner(&self) -> &M {
        &self.model
    }

    /// Current order, `None` for identity
    pub fn order(&self) -> Option<Vec<usize>> {
        self.order.read().clone()
    }

    pub fn set_order(&self, order: Option<Vec<usize>>) {
        *self.order.write() = order;
        self.model.publisher().publish(EventMask::TOTAL_CHANGED);
    }

    /// Physical column behind `logical`
    pub fn physical_column(&self, logical: usize) -> Option<usize> {
        match self.order.read().as_ref() {
            Some(order) => order.get(logical).copied(),
            None => (logical < self.model.total().total_cols).then_some(logical),
        }
    }

    /// Apply `edit` to an explicit order, materializing identity first
    fn edit_order<R>(&self, edit: impl FnOnce(&mut Vec<usize>) -> R) -> R {
        let physical_cols = self.model.total().total_cols;
        let mut order = self.order.write();
        let order = order.get_or_insert_with(|| (0..physical_cols).collect());
        edit(order)
    }

    /// Drop a logical column. Out-of-range indices are logged and ignored.
    pub fn remove_column(&self, logical: usize) -> bool {
        let removed = self.edit_order(|order| {
            if logical >= order.len() {
                let err = DataError::Usage(format!(
                    "remove_column: index {} out of range (0..{})",
                    logical,
                    order.len()
                ));
                tracing::warn!("{}", err);
                return false;
            }
            order.remove(logical);
            true
        });

        if removed {
            self.model.publisher().publish(EventMask::TOTAL_CHANGED);
        }
        removed
    }

    /// Move logical column `from` so it ends up at position `to`
    pub fn move_column(&self, from: usize, to: usize) -> bool {
        let moved = self.edit_order(|order| {
            if from >= order.len() || to >= order.len() {
                let err = DataError::Usage(format!(
                    "move_column: {} -> {} out of range (0..{})",
                    from,
                    to,
                    order.len()
                ));
                tracing::warn!("{}", err);
                return false;
            }
            let physical = order.remove(from);
            order.insert(to, physical);
            true
        });

        if moved {
            self.model.publisher().publish(EventMask::TOTAL_CHANGED);
        }
        moved
    }

    /// Smallest contiguous physical column span covering logical `[min, max]`
    fn physical_span(&self, cols: [usize; 2]) -> Option<[usize; 2]> {
        let order = self.order.read();
        let Some(order) = order.as_ref() else {
            return Some(cols);
        };

        if order.is_empty() || cols[0] >= order.len() {
            return None;
        }
        let max = cols[1].min(order.len() - 1);

        let mut selected = order[cols[0]..=max].to_vec();
        selected.sort_unstable();
        Some([*selected.first()?, *selected.last()?])
    }
}

impl<M: GridModel> GridModel for ColumnProjection<M> {
    fn total(&self) -> GridExtent {
        let mut total = self.model.total();
        if let Some(order) = self.order.read().as_ref() {
            total.total_cols = order.len();
        }
        total
    }

    /// Descriptor of the physical column behind `index`
    fn column(&self, index: usize) -> Option<ColumnInfo> {
        self.model.column(self.physical_column(index)?)
    }

    fn cell(&self, col: usize, row: usize) -> Option<Cell> {
        self.model.cell(self.physical_column(col)?, row)
    }

    fn load_data(&self, range: DataRange) {
        if range.is_empty() {
            return;
        }
        match self.physical_span(range.cols) {
            Some(cols) => self.model.load_data(DataRange::new(range.rows, cols)),
            None => tracing::debug!("Projection: no physical columns for {:?}", range),
        }
    }

    fn reload(&self) {
        self.model.reload()
    }

    fn publisher(&self) -> Arc<Publisher> {
        self.model.publisher()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use gv_core::{CellValue, Event};
    use crate::config::SourceConfig;
    use crate::engine::SourceModel;
    use crate::sources::MemoryProvider;

    /// 4 rows, columns a..e, cell (r, c) = "<column><row>"
    fn letters() -> Arc<SourceModel<MemoryProvider>> {
        let names: Vec<String> = ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
        let rows = (0..4)
            .map(|r| names.iter().map(|n| CellValue::Text(format!("{n}{r}"))).collect())
            .collect();
        let config = SourceConfig {
            rows_per_block: 2,
            cols_per_block: 1,
            ..Default::default()
        };
        Arc::new(SourceModel::in_memory(MemoryProvider::new(names, rows), &config))
    }

    fn text(model: &impl GridModel, col: usize, row: usize) -> Option<String> {
        model.cell(col, row).map(|c| c.value.to_string())
    }

    fn masks<M: GridModel>(model: &M) -> Arc<Mutex<Vec<EventMask>>> {
        let masks = Arc::new(Mutex::new(Vec::new()));
        let sink = masks.clone();
        model.publisher().add_subscriber(move |event: &Event| sink.lock().push(event.mask));
        masks
    }

    #[test]
    fn test_remove_column_shifts_mapping() {
        let projection = ColumnProjection::new(letters(), Some(vec![1, 2]));
        assert_eq!(projection.physical_column(0), Some(1));

        assert!(projection.remove_column(0));
        assert_eq!(projection.physical_column(0), Some(2));
        assert_eq!(projection.total().total_cols, 1);

        assert!(!projection.remove_column(5));
        assert_eq!(projection.order(), Some(vec![2]));
    }

    #[test]
    fn test_load_covers_minimal_physical_span() {
        let model = letters();
        let projection = ColumnProjection::new(model.clone(), Some(vec![4, 0, 3, 3]));

        projection.load_data(DataRange::new([0, 1], [2, 3]));
        assert_eq!(model.last_range(), Some(DataRange::new([0, 1], [3, 3])));
        assert_eq!(text(&projection, 2, 1), Some("d1".to_string()));
        assert_eq!(text(&projection, 3, 0), Some("d0".to_string()));

        projection.load_data(DataRange::new([2, 3], [0, 9]));
        assert_eq!(model.last_range(), Some(DataRange::new([2, 3], [0, 4])));
        assert_eq!(text(&projection, 0, 3), Some("e3".to_string()));
        assert_eq!(text(&projection, 1, 2), Some("a2".to_string()));
    }

    #[test]
    fn test_identity_passthrough() {
        let model = letters();
        let projection = ColumnProjection::identity(model.clone());

        assert_eq!(projection.total(), model.total());
        projection.load_data(DataRange::new([0, 0], [1, 2]));
        assert_eq!(model.last_range(), Some(DataRange::new([0, 0], [1, 2])));
        assert_eq!(text(&projection, 2, 0), Some("c0".to_string()));
        assert_eq!(projection.column(1).map(|c| c.name), Some("b".to_string()));
        assert_eq!(projection.physical_column(5), None);
    }

    #[test]
    fn test_identity_materializes_on_edit() {
        let projection = ColumnProjection::identity(letters());
        assert!(projection.move_column(4, 0));
        assert_eq!(projection.order(), Some(vec![4, 0, 1, 2, 3]));
        assert_eq!(projection.column(0).map(|c| c.name), Some("e".to_string()));

        assert!(!projection.move_column(0, 5));
    }

    #[test]
    fn test_out_of_range_logical_columns() {
        let model = letters();
        let projection = ColumnProjection::new(model.clone(), Some(vec![1]));

        projection.load_data(DataRange::new([0, 1], [3, 4]));
        assert_eq!(model.last_range(), None);
        assert!(projection.cell(1, 0).is_none());
        assert!(projection.column(1).is_none());
    }

    #[test]
    fn test_wrapped_model_untouched() {
        let model = letters();
        let projection = ColumnProjection::new(model.clone(), Some(vec![3]));
        projection.load_data(DataRange::new([0, 3], [0, 0]));
        projection.remove_column(0);

        assert_eq!(model.total().total_cols, 5);
        assert_eq!(text(&*model, 3, 0), Some("d0".to_string()));
    }

    #[test]
    fn test_shares_wrapped_publisher() {
        let model = letters();
        let projection = ColumnProjection::identity(model.clone());
        assert!(Arc::ptr_eq(&projection.publisher(), &model.publisher()));
    }

    #[test]
    fn test_set_order_switches_mapping() {
        let model = letters();
        let projection = ColumnProjection::identity(model.clone());
        projection.load_data(DataRange::new([0, 3], [0, 4]));
        let seen = masks(&projection);

        projection.set_order(Some(vec![2, 0]));
        assert_eq!(projection.total().total_cols, 2);
        assert_eq!(text(&projection, 0, 1), Some("c1".to_string()));
        assert_eq!(text(&projection, 1, 3), Some("a3".to_string()));

        projection.set_order(None);
        assert_eq!(projection.total().total_cols, 5);
        assert_eq!(text(&projection, 0, 1), Some("a1".to_string()));
        assert_eq!(text(&projection, 4, 2), Some("e2".to_string()));

        projection.set_order(Some(vec![4]));
        assert_eq!(projection.total().total_cols, 1);
        assert_eq!(text(&projection, 0, 0), Some("e0".to_string()));
        assert!(projection.cell(1, 0).is_none());

        assert_eq!(*seen.lock(), vec![EventMask::TOTAL_CHANGED; 3]);
    }

    #[test]
    fn test_edits_notify_subscribers() {
        let model = letters();
        let projection = ColumnProjection::identity(model.clone());
        let seen = masks(&*model);

        assert!(projection.remove_column(1));
        assert!(projection.move_column(0, 3));
        assert_eq!(projection.order(), Some(vec![2, 3, 4, 0]));
        assert_eq!(*seen.lock(), vec![EventMask::TOTAL_CHANGED; 2]);

        // Rejected edits stay silent
        assert!(!projection.remove_column(9));
        assert!(!projection.move_column(7, 0));
        assert_eq!(seen.lock().len(), 2);
    }
}
