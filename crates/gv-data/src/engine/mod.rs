//! The source model engine
//!
//! [`SourceModel`] turns range requests into per-block fetches. For each
//! block coordinate at most one fetch is in flight; later requests for a
//! pending block attach to it. Completions may arrive in any order and are
//! announced per block through the model's [`Publisher`].
//!
//! `reload` and `set_total` advance a generation counter. A fetch remembers
//! the generation it was issued under and its result is dropped if the
//! counter has moved on, so late completions never write into cleared
//! storage. The block stays pending until that stale fetch returns; if it
//! still lies inside the last requested range it is then fetched again
//! under the current generation.

use std::sync::Arc;
use ahash::AHashMap;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use gv_core::{
    BlockCoordinate, Cell, ColumnInfo, DataRange, Event, EventMask, GridExtent, GridModel,
    Publisher,
};

use crate::DataError;
use crate::cache::{BlockIndex, BlockStatus, CacheState};
use crate::config::SourceConfig;
use crate::sources::{
    BlockProvider, BlockRequest, MemoryProvider, PartFetcher, PartitionedProvider,
};

/// Mutable engine state, guarded as a unit
struct EngineState {
    index: BlockIndex,
    column_names: Vec<String>,
    /// Generation each in-flight fetch was issued under
    pending: AHashMap<BlockCoordinate, u64>,
    generation: u64,
    last_range: Option<DataRange>,
}

impl EngineState {
    fn cache_state(&self, coord: BlockCoordinate) -> CacheState {
        if self.pending.contains_key(&coord) {
            return CacheState::Pending;
        }
        match self.index.get_cache_block(coord).map(|b| b.status()) {
            Some(BlockStatus::Loaded) => CacheState::Loaded,
            Some(BlockStatus::Error) => CacheState::Error,
            Some(BlockStatus::Empty) | None => CacheState::Absent,
        }
    }

    /// Start a new generation; in-flight results become stale.
    ///
    /// Pending entries are kept so a block never has two fetches running.
    fn invalidate(&mut self) {
        self.index.clear();
        self.generation += 1;
    }

    /// Whether `coord` is covered by the last requested range
    fn wanted(&self, coord: BlockCoordinate) -> bool {
        self.last_range
            .and_then(|range| self.index.to_block_range(&range))
            .is_some_and(|blocks| blocks.contains(coord))
    }
}

/// What a completion leaves to do once the state lock is released
enum Outcome {
    Publish(Event),
    Refetch(BlockRequest, u64),
    Dropped,
}

/// State shared with spawned fetch tasks
struct Shared<P> {
    provider: P,
    state: Mutex<EngineState>,
    publisher: Arc<Publisher>,
    idle: Notify,
    runtime: Option<Handle>,
}

impl<P: BlockProvider> Shared<P> {
    /// Run a single block fetch, synchronously when the provider allows it
    fn issue(self: &Arc<Self>, request: BlockRequest, generation: u64) {
        if let Some(result) = self.provider.fetch_now(&request) {
            self.complete(request, generation, result);
            return;
        }

        let Some(runtime) = &self.runtime else {
            self.complete(request, generation, Err(DataError::Runtime));
            return;
        };

        let shared = self.clone();
        runtime.spawn(async move {
            let result = shared.provider.fetch(request).await;
            shared.complete(request, generation, result);
        });
    }

    /// Apply a fetch result and announce it
    fn complete(
        self: &Arc<Self>,
        request: BlockRequest,
        generation: u64,
        result: Result<P::Raw, DataError>,
    ) {
        let coord = request.coord;

        let (outcome, idle) = {
            let mut state = self.state.lock();
            state.pending.remove(&coord);

            let outcome = if state.generation != generation {
                tracing::debug!(
                    "Discarding stale result for block {} (generation {} < {})",
                    coord,
                    generation,
                    state.generation
                );
                if state.wanted(coord) {
                    let current = state.generation;
                    state.pending.insert(coord, current);
                    let request = BlockRequest {
                        coord,
                        range: state.index.to_data_range(coord),
                    };
                    Outcome::Refetch(request, current)
                } else {
                    Outcome::Dropped
                }
            } else {
                let block = state.index.create_cache_block(coord);
                let outcome = result.and_then(|raw| self.provider.fill(raw, block));
                match outcome {
                    Ok(()) => {
                        block.mark_loaded();
                        tracing::debug!("Block {} loaded ({} cells)", coord, block.filled());
                        Outcome::Publish(Event::for_block(EventMask::DATA_AVAILABLE, coord))
                    }
                    Err(e) => {
                        block.mark_error();
                        tracing::warn!("Fetch for block {} failed: {}", coord, e);
                        Outcome::Publish(Event::for_block(EventMask::FETCH_ERROR, coord))
                    }
                }
            };
            (outcome, state.pending.is_empty())
        };

        match outcome {
            Outcome::Publish(event) => self.publisher.publish(event),
            Outcome::Refetch(request, generation) => {
                tracing::debug!("Refetching block {} under generation {}", coord, generation);
                self.issue(request, generation);
                return;
            }
            Outcome::Dropped => {}
        }
        if idle {
            self.idle.notify_waiters();
        }
    }
}

/// Block-cached model over a [`BlockProvider`]
pub struct SourceModel<P: BlockProvider> {
    shared: Arc<Shared<P>>,
}

impl<P: BlockProvider> SourceModel<P> {
    /// Create a model with zero extent.
    ///
    /// Asynchronous fetches run on the tokio runtime current at this call,
    /// if there is one.
    pub fn new(provider: P, config: &SourceConfig) -> Self {
        Self::build(provider, config, Handle::try_current().ok())
    }

    /// Create a model that spawns its fetches on `runtime`
    pub fn with_runtime(provider: P, config: &SourceConfig, runtime: Handle) -> Self {
        Self::build(provider, config, Some(runtime))
    }

    fn build(provider: P, config: &SourceConfig, runtime: Option<Handle>) -> Self {
        let state = EngineState {
            index: BlockIndex::new(GridExtent::default(), config.block_size()),
            column_names: Vec::new(),
            pending: AHashMap::new(),
            generation: 0,
            last_range: None,
        };

        Self {
            shared: Arc::new(Shared {
                provider,
                state: Mutex::new(state),
                publisher: Arc::new(Publisher::new()),
                idle: Notify::new(),
                runtime,
            }),
        }
    }

    pub fn provider(&self) -> &P {
        &self.shared.provider
    }

    /// Fix the extent and clear every cached block
    pub fn set_total(&self, columns: usize, rows: usize) {
        {
            let mut state = self.shared.state.lock();
            state.index.set_extent(GridExtent::new(rows, columns));
            state.invalidate();
        }
        self.shared.provider.reset();

        tracing::info!("Extent set to {} rows x {} columns", rows, columns);
        self.shared.publisher.publish(EventMask::TOTAL_CHANGED);
        self.shared.idle.notify_waiters();
    }

    pub fn set_column_names(&self, names: Vec<String>) {
        self.shared.state.lock().column_names = names;
    }

    /// Fetch state of one block coordinate
    pub fn block_state(&self, coord: BlockCoordinate) -> CacheState {
        self.shared.state.lock().cache_state(coord)
    }

    /// Number of fetches currently in flight
    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Range most recently passed to `load_data`
    pub fn last_range(&self) -> Option<DataRange> {
        self.shared.state.lock().last_range
    }

    /// Resolve once no fetch is in flight
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if self.shared.state.lock().pending.is_empty() {
                return;
            }
            notified.await;
        }
    }
}

impl SourceModel<MemoryProvider> {
    /// Model over resident rows, extent and column names already set
    pub fn in_memory(provider: MemoryProvider, config: &SourceConfig) -> Self {
        let extent = provider.extent();
        let names = provider.columns().to_vec();

        let model = Self::new(provider, config);
        model.set_total(extent.total_cols, extent.total_rows);
        model.set_column_names(names);
        model
    }
}

impl<F: PartFetcher> SourceModel<PartitionedProvider<F>> {
    /// Fetch the header named in `config`, then build a sized model
    pub async fn open_partitioned(fetcher: F, config: &SourceConfig) -> Result<Self, DataError> {
        let provider = PartitionedProvider::open(fetcher, &config.partitioned.header).await?;
        let header = provider.header().clone();

        let model = Self::new(provider, config);
        model.set_total(header.columns.len(), header.rows);
        model.set_column_names(header.columns);
        Ok(model)
    }
}

impl<P: BlockProvider> GridModel for SourceModel<P> {
    fn total(&self) -> GridExtent {
        self.shared.state.lock().index.extent()
    }

    fn column(&self, index: usize) -> Option<ColumnInfo> {
        let state = self.shared.state.lock();
        if index >= state.index.extent().total_cols {
            return None;
        }
        let name = state
            .column_names
            .get(index)
            .cloned()
            .unwrap_or_else(|| index.to_string());
        Some(ColumnInfo { index, name })
    }

    fn cell(&self, col: usize, row: usize) -> Option<Cell> {
        let state = self.shared.state.lock();
        if !state.index.extent().contains(row, col) {
            return None;
        }
        let coord = state.index.to_block(row, col);
        state
            .index
            .get_cache_block(coord)
            .and_then(|block| block.cell(row, col))
            .cloned()
    }

    fn load_data(&self, range: DataRange) {
        let (requests, generation) = {
            let mut state = self.shared.state.lock();
            state.last_range = Some(range);

            let Some(blocks) = state.index.to_block_range(&range) else {
                if range.is_empty() {
                    tracing::debug!("load_data: nothing to load for {:?}", range);
                } else {
                    let extent = state.index.extent();
                    let err = DataError::OutOfRange(format!(
                        "rows {:?} cols {:?} outside {} x {}",
                        range.rows, range.cols, extent.total_rows, extent.total_cols
                    ));
                    tracing::debug!("load_data ignored: {}", err);
                }
                return;
            };

            let generation = state.generation;
            let mut requests = Vec::new();
            for coord in blocks {
                match state.cache_state(coord) {
                    CacheState::Loaded => continue,
                    CacheState::Pending => {
                        tracing::trace!("Block {} already pending", coord);
                        continue;
                    }
                    CacheState::Absent | CacheState::Error => {}
                }
                state.pending.insert(coord, generation);
                requests.push(BlockRequest {
                    coord,
                    range: state.index.to_data_range(coord),
                });
            }
            (requests, generation)
        };

        if !requests.is_empty() {
            tracing::debug!("Fetching {} blocks for {:?}", requests.len(), range);
        }
        for request in requests {
            self.shared.issue(request, generation);
        }
    }

    fn reload(&self) {
        let range = {
            let mut state = self.shared.state.lock();
            state.invalidate();
            state.last_range
        };
        self.shared.provider.reset();

        tracing::info!("Reloading, last range {:?}", range);
        self.shared.publisher.publish(EventMask::RELOADED);
        self.shared.idle.notify_waiters();

        if let Some(range) = range {
            self.load_data(range);
        }
    }

    fn publisher(&self) -> Arc<Publisher> {
        self.shared.publisher.clone()
    }
}
