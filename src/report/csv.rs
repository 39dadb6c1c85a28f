//! Text tabular encoding
//!
//! Writes the pwalk CSV layout: a fixed header then one row per record,
//! 17 columns in a fixed order. `filename`, `fileExtension`, and
//! `st_mode` are always double-quoted (embedded quotes doubled, mode
//! rendered octal); every other field is decimal text. The layout quotes
//! a fixed subset of columns unconditionally, so rows are formatted by
//! hand rather than through a generic CSV serializer.
//!
//! With zstd compression enabled the whole stream (header included)
//! passes through a streaming encoder before hitting the file.

use crate::config::Compression;
use crate::error::SinkError;
use crate::record::Record;
use crate::report::RecordSink;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Header row, byte-compatible with the pwalk report format
pub const CSV_HEADER: &str = "inode,parent-inode,directory-depth,\"filename\",\"fileExtension\",\
UID,GID,st_size,st_dev,st_blocks,st_nlink,\"st_mode\",st_atime,st_mtime,st_ctime,\
pw_fcount,pw_dirsum";

/// Zstd level for text reports
#[cfg(feature = "zstd")]
const TEXT_ZSTD_LEVEL: i32 = 3;

/// Output stream, optionally wrapped in a streaming compressor
enum TextOut {
    Plain(BufWriter<File>),
    #[cfg(feature = "zstd")]
    Zstd(zstd::stream::write::Encoder<'static, BufWriter<File>>),
}

impl Write for TextOut {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            TextOut::Plain(w) => w.write(buf),
            #[cfg(feature = "zstd")]
            TextOut::Zstd(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            TextOut::Plain(w) => w.flush(),
            #[cfg(feature = "zstd")]
            TextOut::Zstd(w) => w.flush(),
        }
    }
}

impl TextOut {
    fn finish(self) -> std::io::Result<()> {
        match self {
            TextOut::Plain(mut w) => w.flush(),
            #[cfg(feature = "zstd")]
            TextOut::Zstd(encoder) => encoder.finish()?.flush(),
        }
    }
}

/// Text tabular record sink
pub struct CsvSink {
    out: TextOut,
}

impl CsvSink {
    /// Create the output file and write the header row.
    pub fn create(path: &Path, compression: Compression) -> Result<Self, SinkError> {
        let file = File::create(path).map_err(|e| SinkError::Create {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let buffered = BufWriter::new(file);

        let mut out = match compression {
            Compression::None => TextOut::Plain(buffered),
            #[cfg(feature = "zstd")]
            Compression::Zstd => TextOut::Zstd(
                zstd::stream::write::Encoder::new(buffered, TEXT_ZSTD_LEVEL).map_err(
                    |e| SinkError::Create {
                        path: path.to_path_buf(),
                        reason: format!("zstd encoder: {}", e),
                    },
                )?,
            ),
            #[cfg(not(feature = "zstd"))]
            Compression::Zstd => {
                return Err(SinkError::Create {
                    path: path.to_path_buf(),
                    reason: "zstd support not compiled in".to_string(),
                })
            }
        };

        writeln!(out, "{}", CSV_HEADER)?;
        Ok(Self { out })
    }
}

impl RecordSink for CsvSink {
    fn append(&mut self, record: &Record) -> Result<(), SinkError> {
        write_row(&mut self.out, record)?;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<(), SinkError> {
        self.out.finish()?;
        Ok(())
    }
}

/// Double embedded quotes, the only escaping the format needs
fn escape(field: &str) -> Cow<'_, str> {
    if field.contains('"') {
        Cow::Owned(field.replace('"', "\"\""))
    } else {
        Cow::Borrowed(field)
    }
}

/// Format one record as a report row
fn write_row<W: Write>(out: &mut W, r: &Record) -> std::io::Result<()> {
    writeln!(
        out,
        "{},{},{},\"{}\",\"{}\",{},{},{},{},{},{},\"{:o}\",{},{},{},{},{}",
        r.inode,
        r.parent_inode,
        r.depth,
        escape(&r.filename),
        escape(&r.extension),
        r.uid,
        r.gid,
        r.size,
        r.device,
        r.blocks_allocated,
        r.link_count,
        r.mode,
        r.atime,
        r.mtime,
        r.ctime,
        r.file_count,
        r.dir_sum,
    )
}
