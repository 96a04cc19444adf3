//! In-memory rows behind a simulated network delay

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use async_trait::async_trait;
use gv_core::{CellValue, GridExtent};

use super::{BlockProvider, BlockRequest, MemoryProvider};
use crate::DataError;
use crate::cache::Block;

/// Same data as [`MemoryProvider`], but every fetch waits `delay` first.
///
/// Never resolves synchronously, so the pending phase is always
/// observable. Can be told to fail a number of fetches before succeeding.
#[derive(Debug)]
pub struct LatencyProvider {
    inner: MemoryProvider,
    delay: Duration,
    failures_remaining: AtomicUsize,
    fetches: AtomicUsize,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl LatencyProvider {
    pub fn new(inner: MemoryProvider, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            failures_remaining: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Fail the next `count` fetches with a network error
    pub fn with_failures(self, count: usize) -> Self {
        self.failures_remaining.store(count, Ordering::SeqCst);
        self
    }

    pub fn extent(&self) -> GridExtent {
        self.inner.extent()
    }

    pub fn columns(&self) -> &[String] {
        self.inner.columns()
    }

    /// Fetches started so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Most fetches ever running at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn delayed(&self, request: BlockRequest) -> Result<Arc<Vec<Vec<CellValue>>>, DataError> {
        tokio::time::sleep(self.delay).await;

        let fail = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(DataError::Network(format!(
                "simulated failure for block {}",
                request.coord
            )));
        }

        self.inner.fetch(request).await
    }
}

#[async_trait]
impl BlockProvider for LatencyProvider {
    type Raw = Arc<Vec<Vec<CellValue>>>;

    async fn fetch(&self, request: BlockRequest) -> Result<Self::Raw, DataError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);

        let result = self.delayed(request).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn fill(&self, raw: Self::Raw, block: &mut Block) -> Result<(), DataError> {
        self.inner.fill(raw, block)
    }
}
