//! Record sink: single-writer report serialization
//!
//! All workers send finalized records to one dedicated writer thread via
//! a bounded channel; the thread owns the output stream, so rows and
//! columnar batches are never interleaved. A serialization failure is
//! fatal: the writer stores the cause, raises the scan-wide abort flag,
//! and whatever was already flushed is left in place.
//!
//! # Module Structure
//!
//! - `csv`: pwalk-compatible text tabular encoding (optional zstd)
//! - `schema`: canonical Arrow schema for the columnar encoding
//! - `parquet`: columnar typed encoding (Parquet row groups)

pub mod csv;
pub mod parquet;
pub mod schema;

use crate::config::{ReportFormat, ScanConfig};
use crate::error::SinkError;
use crate::record::Record;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Capacity of the record channel feeding the writer thread
const CHANNEL_CAPACITY: usize = 8192;

/// One encoder behind the writer thread
pub trait RecordSink: Send {
    /// Serialize one record
    fn append(&mut self, record: &Record) -> Result<(), SinkError>;

    /// Flush buffered state and close the output
    fn finish(self: Box<Self>) -> Result<(), SinkError>;
}

/// Messages sent to the writer thread
#[derive(Debug)]
pub enum SinkMessage {
    /// Serialize this record
    Record(Record),

    /// Flush and stop
    Shutdown,
}

/// Statistics about the report writer
#[derive(Debug, Default)]
pub struct SinkStats {
    /// Rows serialized so far
    pub rows_written: AtomicU64,
}

impl SinkStats {
    /// Rows serialized so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written.load(Ordering::Relaxed)
    }
}

/// Handle for sending records to the writer
#[derive(Clone)]
pub struct WriterHandle {
    sender: Sender<SinkMessage>,
    stats: Arc<SinkStats>,
}

impl WriterHandle {
    /// Send one finalized record
    pub fn send(&self, record: Record) -> Result<(), SinkError> {
        self.sender
            .send(SinkMessage::Record(record))
            .map_err(|_| SinkError::ChannelClosed)
    }

    /// Request shutdown (the writer flushes pending rows first)
    pub fn shutdown(&self) {
        let _ = self.sender.send(SinkMessage::Shutdown);
    }

    /// Writer statistics
    pub fn stats(&self) -> &SinkStats {
        &self.stats
    }

    /// Channel-only handle for exercising producers without a writer
    /// thread.
    #[cfg(test)]
    pub(crate) fn for_tests() -> (Self, Receiver<SinkMessage>) {
        let (sender, receiver) = bounded(CHANNEL_CAPACITY);
        (
            Self {
                sender,
                stats: Arc::new(SinkStats::default()),
            },
            receiver,
        )
    }
}

/// Report writer running in its own thread
pub struct ReportWriter {
    handle: Option<JoinHandle<Result<(), SinkError>>>,
    writer_handle: WriterHandle,
    output_path: PathBuf,
}

impl ReportWriter {
    /// Create the output file for the configured format and spawn the
    /// writer thread.
    pub fn new(config: &ScanConfig, abort: Arc<AtomicBool>) -> Result<Self, SinkError> {
        let sink: Box<dyn RecordSink> = match config.format {
            ReportFormat::Text => Box::new(csv::CsvSink::create(
                &config.output_path,
                config.compression,
            )?),
            ReportFormat::Columnar => Box::new(parquet::ParquetSink::create(
                &config.output_path,
                config.compression,
            )?),
        };

        let (sender, receiver) = bounded(CHANNEL_CAPACITY);
        let stats = Arc::new(SinkStats::default());
        let writer_handle = WriterHandle {
            sender,
            stats: Arc::clone(&stats),
        };

        let handle = thread::Builder::new()
            .name("report-writer".into())
            .spawn(move || writer_thread(sink, receiver, stats, abort))
            .map_err(|e| SinkError::Create {
                path: PathBuf::from("report-writer"),
                reason: format!("Failed to spawn writer thread: {}", e),
            })?;

        Ok(Self {
            handle: Some(handle),
            writer_handle,
            output_path: config.output_path.clone(),
        })
    }

    /// Get a handle for sending records to the writer
    pub fn handle(&self) -> WriterHandle {
        self.writer_handle.clone()
    }

    /// Resolved output path
    pub fn output_path(&self) -> &PathBuf {
        &self.output_path
    }

    /// Flush, close the output, and return the serialization verdict.
    pub fn finish(mut self) -> Result<(), SinkError> {
        self.writer_handle.shutdown();

        match self.handle.take() {
            Some(handle) => match handle.join() {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!("Report writer thread panicked");
                    Err(SinkError::ChannelClosed)
                }
            },
            None => Ok(()),
        }
    }
}

/// Internal writer thread: drain the channel into the sink.
fn writer_thread(
    mut sink: Box<dyn RecordSink>,
    receiver: Receiver<SinkMessage>,
    stats: Arc<SinkStats>,
    abort: Arc<AtomicBool>,
) -> Result<(), SinkError> {
    loop {
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(SinkMessage::Record(record)) => {
                if let Err(e) = sink.append(&record) {
                    tracing::error!(error = %e, "Report write failed, aborting scan");
                    abort.store(true, Ordering::SeqCst);
                    return Err(e);
                }
                stats.rows_written.fetch_add(1, Ordering::Relaxed);
            }
            Ok(SinkMessage::Shutdown) => break,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if let Err(e) = sink.finish() {
        tracing::error!(error = %e, "Report finalization failed");
        abort.store(true, Ordering::SeqCst);
        return Err(e);
    }

    Ok(())
}
