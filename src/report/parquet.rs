//! Columnar typed encoding
//!
//! Buffers records into per-column Arrow builders and writes Parquet row
//! groups through an `ArrowWriter`. The schema is fixed (see
//! [`crate::report::schema`]); compression selects between uncompressed
//! pages and ZSTD.

use crate::config::Compression;
use crate::error::SinkError;
use crate::record::Record;
use crate::report::schema::report_schema_ref;
use crate::report::RecordSink;
use arrow::array::{
    ArrayRef, BooleanBuilder, Int64Builder, StringBuilder, UInt32Builder, UInt64Builder,
};
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression as ParquetCompression, ZstdLevel};
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Rows buffered before a batch is flushed to the writer
const BATCH_ROWS: usize = 8192;

/// Zstd level for columnar reports
const COLUMNAR_ZSTD_LEVEL: i32 = 3;

/// Per-column builders for one in-flight batch
struct RowBatch {
    inode: UInt64Builder,
    parent_inode: UInt64Builder,
    depth: UInt32Builder,
    filename: StringBuilder,
    extension: StringBuilder,
    uid: UInt32Builder,
    gid: UInt32Builder,
    size: UInt64Builder,
    st_dev: UInt64Builder,
    st_blocks: UInt64Builder,
    st_nlink: UInt64Builder,
    st_mode: UInt32Builder,
    atime: Int64Builder,
    mtime: Int64Builder,
    ctime: Int64Builder,
    file_count: Int64Builder,
    dir_sum: Int64Builder,
    is_hardlink: BooleanBuilder,
    rows: usize,
}

impl RowBatch {
    fn new() -> Self {
        Self {
            inode: UInt64Builder::new(),
            parent_inode: UInt64Builder::new(),
            depth: UInt32Builder::new(),
            filename: StringBuilder::new(),
            extension: StringBuilder::new(),
            uid: UInt32Builder::new(),
            gid: UInt32Builder::new(),
            size: UInt64Builder::new(),
            st_dev: UInt64Builder::new(),
            st_blocks: UInt64Builder::new(),
            st_nlink: UInt64Builder::new(),
            st_mode: UInt32Builder::new(),
            atime: Int64Builder::new(),
            mtime: Int64Builder::new(),
            ctime: Int64Builder::new(),
            file_count: Int64Builder::new(),
            dir_sum: Int64Builder::new(),
            is_hardlink: BooleanBuilder::new(),
            rows: 0,
        }
    }

    fn append(&mut self, r: &Record) {
        self.inode.append_value(r.inode);
        self.parent_inode.append_value(r.parent_inode);
        self.depth.append_value(r.depth);
        self.filename.append_value(&r.filename);
        self.extension.append_value(&r.extension);
        self.uid.append_value(r.uid);
        self.gid.append_value(r.gid);
        self.size.append_value(r.size);
        self.st_dev.append_value(r.device);
        self.st_blocks.append_value(r.blocks_allocated);
        self.st_nlink.append_value(r.link_count);
        self.st_mode.append_value(r.mode);
        self.atime.append_value(r.atime);
        self.mtime.append_value(r.mtime);
        self.ctime.append_value(r.ctime);
        self.file_count.append_value(r.file_count);
        self.dir_sum.append_value(r.dir_sum);
        self.is_hardlink.append_value(r.is_hardlink);
        self.rows += 1;
    }

    fn finish(&mut self, schema: &Arc<Schema>) -> Result<RecordBatch, SinkError> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(self.inode.finish()),
            Arc::new(self.parent_inode.finish()),
            Arc::new(self.depth.finish()),
            Arc::new(self.filename.finish()),
            Arc::new(self.extension.finish()),
            Arc::new(self.uid.finish()),
            Arc::new(self.gid.finish()),
            Arc::new(self.size.finish()),
            Arc::new(self.st_dev.finish()),
            Arc::new(self.st_blocks.finish()),
            Arc::new(self.st_nlink.finish()),
            Arc::new(self.st_mode.finish()),
            Arc::new(self.atime.finish()),
            Arc::new(self.mtime.finish()),
            Arc::new(self.ctime.finish()),
            Arc::new(self.file_count.finish()),
            Arc::new(self.dir_sum.finish()),
            Arc::new(self.is_hardlink.finish()),
        ];

        self.rows = 0;
        RecordBatch::try_new(Arc::clone(schema), columns).map_err(SinkError::Arrow)
    }
}

/// Columnar record sink
pub struct ParquetSink {
    writer: ArrowWriter<File>,
    schema: Arc<Schema>,
    batch: RowBatch,
}

impl ParquetSink {
    /// Create the output file and the Arrow writer.
    pub fn create(path: &Path, compression: Compression) -> Result<Self, SinkError> {
        let schema = report_schema_ref();
        let props = writer_properties(compression)?;

        let file = File::create(path).map_err(|e| SinkError::Create {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let writer = ArrowWriter::try_new(file, Arc::clone(&schema), Some(props))
            .map_err(SinkError::Parquet)?;

        Ok(Self {
            writer,
            schema,
            batch: RowBatch::new(),
        })
    }

    fn flush_batch(&mut self) -> Result<(), SinkError> {
        if self.batch.rows == 0 {
            return Ok(());
        }
        let batch = self.batch.finish(&self.schema)?;
        self.writer.write(&batch).map_err(SinkError::Parquet)
    }
}

impl RecordSink for ParquetSink {
    fn append(&mut self, record: &Record) -> Result<(), SinkError> {
        self.batch.append(record);
        if self.batch.rows >= BATCH_ROWS {
            self.flush_batch()?;
        }
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<(), SinkError> {
        self.flush_batch()?;
        self.writer.close().map_err(SinkError::Parquet)?;
        Ok(())
    }
}

/// Writer properties with column statistics and the selected compression
fn writer_properties(compression: Compression) -> Result<WriterProperties, SinkError> {
    let codec = match compression {
        Compression::None => ParquetCompression::UNCOMPRESSED,
        Compression::Zstd => ParquetCompression::ZSTD(
            ZstdLevel::try_new(COLUMNAR_ZSTD_LEVEL).map_err(SinkError::Parquet)?,
        ),
    };

    Ok(WriterProperties::builder()
        .set_compression(codec)
        .set_statistics_enabled(EnabledStatistics::Chunk)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::EntryKind;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn record(inode: u64, name: &str, is_hardlink: bool) -> Record {
        Record {
            kind: EntryKind::File,
            inode,
            parent_inode: 1,
            depth: 1,
            filename: name.to_string(),
            extension: crate::record::split_extension(name).to_string(),
            uid: 1000,
            gid: 1000,
            size: 512,
            device: 2,
            blocks_allocated: 8,
            link_count: 1,
            mode: 0o100644,
            atime: 1_700_000_000,
            mtime: 1_700_000_000,
            ctime: 1_700_000_000,
            file_count: -1,
            dir_sum: 0,
            is_hardlink,
        }
    }

    #[test]
    fn test_sink_writes_readable_parquet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");

        let mut sink = ParquetSink::create(&path, Compression::Zstd).unwrap();
        sink.append(&record(10, "a.txt", false)).unwrap();
        sink.append(&record(11, "b.txt", true)).unwrap();
        Box::new(sink).finish().unwrap();

        let file = File::open(&path).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();

        let mut total_rows = 0;
        for batch in reader {
            let batch = batch.unwrap();
            total_rows += batch.num_rows();
            assert_eq!(batch.num_columns(), 18);
            assert_eq!(batch.schema().field(0).name(), "inode");
            assert_eq!(batch.schema().field(17).name(), "is_hardlink");
        }
        assert_eq!(total_rows, 2);
    }

    #[test]
    fn test_empty_sink_still_carries_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.parquet");

        let sink = ParquetSink::create(&path, Compression::None).unwrap();
        Box::new(sink).finish().unwrap();

        let file = File::open(&path).unwrap();
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).unwrap();
        assert_eq!(builder.schema().fields().len(), 18);
    }
}
