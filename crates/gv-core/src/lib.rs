//! Core vocabulary for virtualized grid access
//!
//! This crate provides the addressing types, cell values and change
//! notification shared by grid models and their consumers.

pub mod cell;
pub mod events;
pub mod grid;

// Re-export commonly used types
pub use cell::{Cell, CellValue};
pub use events::{Event, EventMask, Publisher, Subscriber, SubscriberId};
pub use grid::{BlockCoordinate, BlockRange, BlockSize, DataRange, GridExtent};
pub use model::{ColumnInfo, GridModel};

pub mod model {
    use std::sync::Arc;
    use serde::{Serialize, Deserialize};
    use crate::{Cell, DataRange, GridExtent, Publisher};

    /// Descriptor of one column
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ColumnInfo {
        pub index: usize,
        pub name: String,
    }

    /// The query surface a grid consumer works against.
    ///
    /// Every method is synchronous and non-blocking. `load_data` only
    /// schedules work; completion is announced through the publisher.
    pub trait GridModel: Send + Sync {
        /// Current extent
        fn total(&self) -> GridExtent;

        /// Column descriptor, `None` past the last column
        fn column(&self, index: usize) -> Option<ColumnInfo>;

        /// Cell at `(col, row)`, `None` while its block is unloaded
        fn cell(&self, col: usize, row: usize) -> Option<Cell>;

        /// Request that every cell in `range` becomes available
        fn load_data(&self, range: DataRange);

        /// Drop cached data and request the last range again
        fn reload(&self);

        fn publisher(&self) -> Arc<Publisher>;
    }

    impl<M: GridModel + ?Sized> GridModel for Arc<M> {
        fn total(&self) -> GridExtent {
            (**self).total()
        }

        fn column(&self, index: usize) -> Option<ColumnInfo> {
            (**self).column(index)
        }

        fn cell(&self, col: usize, row: usize) -> Option<Cell> {
            (**self).cell(col, row)
        }

        fn load_data(&self, range: DataRange) {
            (**self).load_data(range)
        }

        fn reload(&self) {
            (**self).reload()
        }

        fn publisher(&self) -> Arc<Publisher> {
            (**self).publisher()
        }
    }
}
