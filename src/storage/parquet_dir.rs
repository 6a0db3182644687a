use crate::constants::PARQUET_EXT;
use crate::error::{PipelineError, Result};
use crate::storage::{BatchIter, BatchStore};
use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Directory-of-parquet-files store: one immutable `.parquet` file per
/// batch, ZSTD-compressed.
#[derive(Debug, Default)]
pub struct ParquetDirStore;

impl ParquetDirStore {
    pub fn new() -> Self {
        Self
    }

    /// Lists the parquet files in a directory, in listing order.
    fn batch_files(dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(PipelineError::InvalidDataDir(dir.to_path_buf()));
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == PARQUET_EXT) {
                files.push(path);
            }
        }
        Ok(files)
    }

    /// Reads one file's row groups back as a single batch.
    fn read_file(path: &Path) -> Result<RecordBatch> {
        let file = File::open(path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let schema = builder.schema().clone();
        let reader = builder.build()?;
        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(concat_batches(&schema, &batches)?)
    }
}

impl BatchStore for ParquetDirStore {
    fn write(&self, dir: &Path, batch: &RecordBatch, file_name: Option<&str>) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let name = match file_name {
            Some(name) => name.to_string(),
            None => Uuid::new_v4().to_string(),
        };
        let path = dir.join(format!("{}.{}", name, PARQUET_EXT));
        let file = File::create(&path)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::ZSTD(ZstdLevel::default()))
            .build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        writer.write(batch)?;
        writer.close()?;
        debug!(path = %path.display(), rows = batch.num_rows(), "wrote batch file");
        Ok(path)
    }

    fn read(&self, dir: &Path, _batch_size: usize) -> Result<BatchIter> {
        let files = Self::batch_files(dir)?;
        Ok(Box::new(files.into_iter().map(|path| Self::read_file(&path))))
    }

    fn read_all(&self, dir: &Path) -> Result<RecordBatch> {
        let files = Self::batch_files(dir)?;
        if files.is_empty() {
            return Err(PipelineError::NoBatchFiles(dir.to_path_buf()));
        }
        let batches = files
            .iter()
            .map(|path| Self::read_file(path))
            .collect::<Result<Vec<_>>>()?;
        let schema = batches[0].schema();
        Ok(concat_batches(&schema, &batches)?)
    }

    fn clear(&self, dir: &Path) -> Result<()> {
        if !dir.is_dir() {
            return Err(PipelineError::InvalidDataDir(dir.to_path_buf()));
        }
        let mut removed = 0usize;
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        info!(dir = %dir.display(), removed, "cleared batch directory");
        Ok(())
    }
}
