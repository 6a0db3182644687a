pub mod parquet_dir;

pub use parquet_dir::ParquetDirStore;

use crate::error::Result;
use arrow::record_batch::RecordBatch;
use std::path::{Path, PathBuf};

/// Lazy sequence of batches, one per discovered file.
pub type BatchIter = Box<dyn Iterator<Item = Result<RecordBatch>> + Send>;

/// Storage interface for columnar batch directories.
///
/// Files are the unit of immutability and retry-safety: a partially written
/// batch never corrupts a sibling batch. The directory-of-parquet-files
/// store is the only in-tree implementation; object-store or queue-backed
/// variants slot in behind the same four operations.
pub trait BatchStore: Send + Sync {
    /// Persists a batch as one new immutable file. Generates a unique file
    /// name unless one is supplied; creates the directory if absent.
    fn write(&self, dir: &Path, batch: &RecordBatch, file_name: Option<&str>) -> Result<PathBuf>;

    /// Lazily yields one batch per discovered file, in directory-listing
    /// order. `batch_size` is advisory only: whole files are yielded
    /// regardless. Each call produces a fresh, restartable sequence.
    fn read(&self, dir: &Path, batch_size: usize) -> Result<BatchIter>;

    /// Eagerly concatenates every file's records into one combined batch,
    /// preserving file-then-row order.
    fn read_all(&self, dir: &Path) -> Result<RecordBatch>;

    /// Deletes all files (non-recursively) in the directory.
    fn clear(&self, dir: &Path) -> Result<()>;
}
