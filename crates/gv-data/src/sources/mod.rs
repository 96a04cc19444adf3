//! Block providers: how one block's raw data is obtained and shaped into cells

pub mod fetcher;
pub mod latency;
pub mod memory;
pub mod partitioned;

pub use fetcher::{DirFetcher, HttpFetcher, PartFetcher};
pub use latency::LatencyProvider;
pub use memory::MemoryProvider;
pub use partitioned::{PartitionHeader, PartitionedProvider};

use async_trait::async_trait;
use gv_core::{BlockCoordinate, DataRange};

use crate::DataError;
use crate::cache::Block;

/// One block the engine wants filled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRequest {
    pub coord: BlockCoordinate,
    /// Cells covered by the block, already clamped to the extent
    pub range: DataRange,
}

/// Pluggable fetch strategy.
///
/// The engine guarantees at most one outstanding `fetch` per block
/// coordinate; providers need no deduplication of their own.
#[async_trait]
pub trait BlockProvider: Send + Sync + 'static {
    /// Data as returned by the fetch, before it is turned into cells
    type Raw: Send + 'static;

    /// Resolve without suspending, if the data is already resident.
    ///
    /// Returning `Some` skips the pending phase entirely.
    fn fetch_now(&self, _request: &BlockRequest) -> Option<Result<Self::Raw, DataError>> {
        None
    }

    /// Obtain the raw data for one block
    async fn fetch(&self, request: BlockRequest) -> Result<Self::Raw, DataError>;

    /// Materialize `raw` into `block`
    fn fill(&self, raw: Self::Raw, block: &mut Block) -> Result<(), DataError>;

    /// Drop any provider-side caches; called when the model is cleared
    fn reset(&self) {}
}
