//! Datasets split into row-banded JSON part files
//!
//! A header descriptor names the columns, the row count and how many rows
//! each part holds. A cache block's row band is independent of the part
//! size, so one block may need several parts, and several column blocks
//! share one part. Downloaded parts are memoized per index until `reset`.

use std::sync::Arc;
use ahash::AHashMap;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Serialize, Deserialize};
use serde_json::Value;
use tokio::sync::OnceCell;
use gv_core::{Cell, GridExtent};

use super::{BlockProvider, BlockRequest, PartFetcher};
use crate::DataError;
use crate::cache::Block;

type Part = Arc<Vec<Vec<Value>>>;

/// Header descriptor of a partitioned dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionHeader {
    pub rows: usize,
    pub columns: Vec<String>,
    pub rows_per_part: usize,
    /// Part file name with a single `%d` placeholder for the part index
    pub file_name: String,
}

impl PartitionHeader {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DataError> {
        let header: PartitionHeader = serde_json::from_slice(bytes)?;
        if header.rows_per_part == 0 {
            return Err(DataError::Parse("rowsPerPart must be positive".to_string()));
        }
        if !header.file_name.contains('%') {
            tracing::warn!("fileName '{}' has no part placeholder", header.file_name);
        }
        Ok(header)
    }

    pub fn extent(&self) -> GridExtent {
        GridExtent::new(self.rows, self.columns.len())
    }

    pub fn part_count(&self) -> usize {
        self.rows.div_ceil(self.rows_per_part)
    }

    /// Part holding `row`
    pub fn part_of_row(&self, row: usize) -> usize {
        row / self.rows_per_part
    }

    pub fn part_name(&self, index: usize) -> String {
        format_part_name(&self.file_name, index)
    }
}

/// Substitute `index` for the first `%d` (or `%0Nd` / `%Nd`) in `pattern`
fn format_part_name(pattern: &str, index: usize) -> String {
    for (start, _) in pattern.match_indices('%') {
        let rest = &pattern[start + 1..];
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if !rest[digits..].starts_with('d') {
            continue;
        }

        let flags = &rest[..digits];
        let width: usize = flags.parse().unwrap_or(0);
        let number = if flags.starts_with('0') {
            format!("{:0width$}", index, width = width)
        } else {
            format!("{:>width$}", index, width = width)
        };
        return format!("{}{}{}", &pattern[..start], number, &rest[digits + 1..]);
    }
    pattern.to_string()
}

/// Provider reading part files through a [`PartFetcher`]
pub struct PartitionedProvider<F> {
    fetcher: F,
    header: PartitionHeader,
    parts: Mutex<AHashMap<usize, Arc<OnceCell<Part>>>>,
}

impl<F: PartFetcher> PartitionedProvider<F> {
    pub fn new(fetcher: F, header: PartitionHeader) -> Self {
        Self {
            fetcher,
            header,
            parts: Mutex::new(AHashMap::new()),
        }
    }

    /// Fetch and parse the header, then build the provider
    pub async fn open(fetcher: F, header_name: &str) -> Result<Self, DataError> {
        let bytes = fetcher.fetch(header_name).await?;
        let header = PartitionHeader::from_slice(&bytes)?;

        tracing::info!(
            "Opened partitioned dataset at {}: {} rows x {} columns in {} parts",
            fetcher.location(),
            header.rows,
            header.columns.len(),
            header.part_count()
        );
        Ok(Self::new(fetcher, header))
    }

    pub fn header(&self) -> &PartitionHeader {
        &self.header
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Number of parts currently downloaded and memoized
    pub fn cached_parts(&self) -> usize {
        self.parts
            .lock()
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    async fn part(&self, index: usize) -> Result<Part, DataError> {
        let cell = self.parts.lock().entry(index).or_default().clone();
        cell.get_or_try_init(|| self.download_part(index))
            .await
            .cloned()
    }

    async fn download_part(&self, index: usize) -> Result<Part, DataError> {
        let name = self.header.part_name(index);
        let bytes = self.fetcher.fetch(&name).await?;

        let mut rows: Vec<Vec<Value>> = serde_json::from_slice(&bytes)
            .map_err(|e| DataError::Parse(format!("{}: {}", name, e)))?;
        if rows.len() > self.header.rows_per_part {
            tracing::warn!(
                "{} holds {} rows, expected at most {}",
                name,
                rows.len(),
                self.header.rows_per_part
            );
            rows.truncate(self.header.rows_per_part);
        }

        tracing::debug!("Downloaded {} ({} rows)", name, rows.len());
        Ok(Arc::new(rows))
    }
}

#[async_trait]
impl<F: PartFetcher> BlockProvider for PartitionedProvider<F> {
    /// Covering parts with their indices
    type Raw = Vec<(usize, Part)>;

    async fn fetch(&self, request: BlockRequest) -> Result<Self::Raw, DataError> {
        if request.range.is_empty() || self.header.rows == 0 {
            return Ok(Vec::new());
        }

        let first = self.header.part_of_row(request.range.rows[0]);
        let last = self
            .header
            .part_of_row(request.range.rows[1])
            .min(self.header.part_count() - 1);

        let mut parts = Vec::with_capacity(last + 1 - first);
        for index in first..=last {
            parts.push((index, self.part(index).await?));
        }
        Ok(parts)
    }

    fn fill(&self, raw: Self::Raw, block: &mut Block) -> Result<(), DataError> {
        let range = block.range();

        for (index, part) in raw {
            if part.is_empty() {
                continue;
            }
            let part_start = index * self.header.rows_per_part;
            let part_end = part_start + part.len() - 1;
            let from = range.rows[0].max(part_start);
            let to = range.rows[1].min(part_end);

            for row in from..=to {
                let values = &part[row - part_start];
                for col in range.cols[0]..=range.cols[1] {
                    if let Some(value) = values.get(col) {
                        block.set_cell(row, col, Cell::from_json(value));
                    }
                }
            }
        }
        Ok(())
    }

    fn reset(&self) {
        self.parts.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use gv_core::{BlockCoordinate, DataRange};
    use crate::sources::DirFetcher;

    /// Serves generated parts from memory and counts requests
    struct CountingFetcher {
        header: PartitionHeader,
        requests: AtomicUsize,
        fail_next: AtomicUsize,
    }

    impl CountingFetcher {
        fn new(header: PartitionHeader) -> Self {
            Self {
                header,
                requests: AtomicUsize::new(0),
                fail_next: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PartFetcher for CountingFetcher {
        async fn fetch(&self, name: &str) -> Result<Vec<u8>, DataError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self
                .fail_next
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(DataError::Network(format!("{} refused", name)));
            }

            let index = (0..self.header.part_count())
                .find(|&i| self.header.part_name(i) == name)
                .ok_or_else(|| DataError::Network(format!("{} not found", name)))?;
            let start = index * self.header.rows_per_part;
            let end = (start + self.header.rows_per_part).min(self.header.rows);
            let rows: Vec<Vec<Value>> = (start..end)
                .map(|r| {
                    (0..self.header.columns.len())
                        .map(|c| Value::from((r * 100 + c) as u64))
                        .collect()
                })
                .collect();
            Ok(serde_json::to_vec(&rows)?)
        }

        fn location(&self) -> String {
            "memory".to_string()
        }
    }

    fn header(rows: usize, cols: usize, rows_per_part: usize) -> PartitionHeader {
        PartitionHeader {
            rows,
            columns: (0..cols).map(|c| format!("c{c}")).collect(),
            rows_per_part,
            file_name: "part_%d.json".to_string(),
        }
    }

    fn request(rows: [usize; 2], cols: [usize; 2]) -> BlockRequest {
        BlockRequest {
            coord: BlockCoordinate::new(0, 0),
            range: DataRange::new(rows, cols),
        }
    }

    #[test]
    fn test_part_name_formatting() {
        assert_eq!(format_part_name("part_%d.json", 7), "part_7.json");
        assert_eq!(format_part_name("p%04d.json", 7), "p0007.json");
        assert_eq!(format_part_name("p%3d", 7), "p  7");
        assert_eq!(format_part_name("static.json", 7), "static.json");
        assert_eq!(format_part_name("p%_data%d.json", 7), "p%_data7.json");
        assert_eq!(format_part_name("%x_%02d", 3), "%x_03");
        assert_eq!(format_part_name("trailing%", 3), "trailing%");
    }

    #[test]
    fn test_header_parsing() {
        let header = PartitionHeader::from_slice(
            br#"{"rows": 25, "columns": ["a", "b"], "rowsPerPart": 10, "fileName": "part%d.json"}"#,
        )
        .unwrap();
        assert_eq!(header.extent(), GridExtent::new(25, 2));
        assert_eq!(header.part_count(), 3);
        assert_eq!(header.part_of_row(24), 2);

        let zero = PartitionHeader::from_slice(
            br#"{"rows": 1, "columns": [], "rowsPerPart": 0, "fileName": "p%d"}"#,
        );
        assert!(matches!(zero, Err(DataError::Parse(_))));
        assert!(matches!(PartitionHeader::from_slice(b"[1, 2]"), Err(DataError::Parse(_))));
    }

    #[tokio::test]
    async fn test_block_straddling_parts() {
        let provider = PartitionedProvider::new(CountingFetcher::new(header(25, 4, 10)), header(25, 4, 10));

        let req = request([5, 14], [1, 2]);
        let raw = provider.fetch(req).await.unwrap();
        assert_eq!(raw.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![0, 1]);

        let mut block = Block::new(req.coord, req.range);
        provider.fill(raw, &mut block).unwrap();
        assert_eq!(block.filled(), 20);
        assert_eq!(block.cell(5, 1).and_then(|c| c.value.as_f64()), Some(501.0));
        assert_eq!(block.cell(14, 2).and_then(|c| c.value.as_f64()), Some(1402.0));
        assert!(block.cell(14, 3).is_none());
    }

    #[tokio::test]
    async fn test_column_blocks_share_part_download() {
        let provider = PartitionedProvider::new(CountingFetcher::new(header(20, 6, 10)), header(20, 6, 10));

        let left = provider.fetch(request([0, 9], [0, 2]));
        let right = provider.fetch(request([0, 9], [3, 5]));
        let (left, right) = tokio::join!(left, right);
        left.unwrap();
        right.unwrap();

        assert_eq!(provider.fetcher().requests.load(Ordering::SeqCst), 1);
        assert_eq!(provider.cached_parts(), 1);

        provider.reset();
        assert_eq!(provider.cached_parts(), 0);
        provider.fetch(request([0, 9], [0, 2])).await.unwrap();
        assert_eq!(provider.fetcher().requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_part_is_not_memoized() {
        let fetcher = CountingFetcher::new(header(10, 2, 10));
        fetcher.fail_next.store(1, Ordering::SeqCst);
        let provider = PartitionedProvider::new(fetcher, header(10, 2, 10));

        let first = provider.fetch(request([0, 9], [0, 1])).await;
        assert!(matches!(first, Err(DataError::Network(_))));
        assert_eq!(provider.cached_parts(), 0);

        assert!(provider.fetch(request([0, 9], [0, 1])).await.is_ok());
        assert_eq!(provider.fetcher().requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_open_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("header.json"),
            r#"{"rows": 3, "columns": ["name", "score", "tags"], "rowsPerPart": 2, "fileName": "rows-%d.json"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("rows-0.json"), r#"[["ann", 1, ["x"]], ["bob", 2]]"#).unwrap();
        std::fs::write(dir.path().join("rows-1.json"), r#"[["cy", null, []]]"#).unwrap();

        let provider = PartitionedProvider::open(DirFetcher::new(dir.path()), "header.json")
            .await
            .unwrap();
        assert_eq!(provider.header().extent(), GridExtent::new(3, 3));

        let req = request([0, 2], [0, 2]);
        let raw = provider.fetch(req).await.unwrap();
        let mut block = Block::new(req.coord, req.range);
        provider.fill(raw, &mut block).unwrap();

        assert_eq!(block.cell(0, 0).and_then(|c| c.value.as_str().map(String::from)), Some("ann".to_string()));
        assert_eq!(block.cell(1, 1).and_then(|c| c.value.as_f64()), Some(2.0));
        assert!(block.cell(1, 2).is_none());
        assert_eq!(block.cell(2, 1).and_then(|c| c.raw.clone()), Some("null".to_string()));
    }

    #[tokio::test]
    async fn test_malformed_part_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("p0.json"), "{not json").unwrap();
        let header = PartitionHeader {
            rows: 1,
            columns: vec!["a".into()],
            rows_per_part: 1,
            file_name: "p%d.json".into(),
        };
        let provider = PartitionedProvider::new(DirFetcher::new(dir.path()), header);

        let result = provider.fetch(request([0, 0], [0, 0])).await;
        assert!(matches!(result, Err(DataError::Parse(_))));
    }
}
