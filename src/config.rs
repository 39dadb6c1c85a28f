//! Configuration types for pwalk
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - The raw scan request (library-facing, selector strings unparsed)
//! - Validated runtime configuration, built before any traversal or
//!   output happens

use crate::error::ConfigError;
use clap::Parser;
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Base name used when no output path is given
const DEFAULT_OUTPUT_STEM: &str = "scan";

/// Environment variables carrying a CPU allotment, checked in order
const CPU_ALLOTMENT_VARS: [&str; 2] = ["PWALK_CPUS_ON_NODE", "SLURM_CPUS_ON_NODE"];

/// Directory name skipped by default (filer snapshot trees)
pub const SNAPSHOT_DIR_NAME: &str = ".snapshot";

/// Parallel filesystem inventory walker with CSV/Parquet reports
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pwalk",
    version,
    about = "Parallel filesystem inventory walker with CSV/Parquet reports",
    long_about = "Walks a filesystem subtree with a fixed pool of worker threads and writes \
                  one report row per entry, including recursive per-directory file counts \
                  and byte sums computed during the walk.",
    after_help = "EXAMPLES:\n    \
        pwalk /data -o scan.csv\n    \
        pwalk /data --format columnar -o scan.parquet -w 16\n    \
        pwalk /data --compress zstd\n    \
        pwalk /data --include-snapshots --follow-symlinks"
)]
pub struct CliArgs {
    /// Root directory to scan
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Output file (default: scan.csv / scan.csv.zst / scan.parquet)
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Report format: text or columnar
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: String,

    /// Compression: none or zstd
    #[arg(long, default_value = "none", value_name = "ALGO")]
    pub compress: String,

    /// Number of worker threads (default: environment CPU allotment or core count)
    #[arg(short = 'w', long, value_name = "NUM")]
    pub workers: Option<usize>,

    /// Descend into directories named .snapshot (skipped by default)
    #[arg(long)]
    pub include_snapshots: bool,

    /// Follow symbolic links (with cycle detection)
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Quiet mode - suppress the summary output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (show per-entry errors as they happen)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Raw scan request, selectors still unparsed
///
/// This mirrors the report-call surface: every field that the CLI can
/// set is settable programmatically, and validation happens in one place
/// ([`ScanConfig::from_request`]) so library callers get the same
/// descriptive errors as CLI users.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Root directory to scan (required)
    pub root: PathBuf,

    /// Output file; `None` selects the default name for the format
    pub output: Option<PathBuf>,

    /// Report format selector: "text" or "columnar"
    pub format: String,

    /// Compression selector: "none" or "zstd"
    pub compress: String,

    /// Worker thread count; `None` selects the environment default
    pub max_threads: Option<usize>,

    /// Skip directories literally named `.snapshot`
    pub skip_snapshot_dirs: bool,

    /// Follow symbolic links
    pub follow_symlinks: bool,
}

impl ScanRequest {
    /// Request with defaults for everything but the root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output: None,
            format: "text".into(),
            compress: "none".into(),
            max_threads: None,
            skip_snapshot_dirs: true,
            follow_symlinks: false,
        }
    }
}

impl From<CliArgs> for ScanRequest {
    fn from(args: CliArgs) -> Self {
        Self {
            root: args.root,
            output: args.output,
            format: args.format,
            compress: args.compress,
            max_threads: args.workers,
            skip_snapshot_dirs: !args.include_snapshots,
            follow_symlinks: args.follow_symlinks,
        }
    }
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Text tabular rows (pwalk CSV layout)
    Text,
    /// Columnar typed batches (Parquet)
    Columnar,
}

impl ReportFormat {
    /// Parse a format selector string
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value {
            "text" => Ok(ReportFormat::Text),
            "columnar" => Ok(ReportFormat::Columnar),
            other => Err(ConfigError::InvalidFormat {
                value: other.to_string(),
            }),
        }
    }

    /// Selector string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Text => "text",
            ReportFormat::Columnar => "columnar",
        }
    }
}

/// Report compression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// No compression
    None,
    /// Zstandard streaming (text) or page (columnar) compression
    Zstd,
}

impl Compression {
    /// Parse a compression selector string, rejecting selectors that are
    /// valid but not compiled into this build.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value {
            "none" => Ok(Compression::None),
            "zstd" => Ok(Compression::Zstd),
            other => Err(ConfigError::InvalidCompression {
                value: other.to_string(),
            }),
        }
    }

    /// Selector string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Zstd => "zstd",
        }
    }
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Root directory to scan
    pub root: PathBuf,

    /// Resolved output file path
    pub output_path: PathBuf,

    /// Report format
    pub format: ReportFormat,

    /// Report compression
    pub compression: Compression,

    /// Number of worker threads
    pub worker_count: usize,

    /// Literal directory names excluded from traversal
    pub skip_names: Vec<OsString>,

    /// Follow symbolic links
    pub follow_symlinks: bool,
}

impl ScanConfig {
    /// Validate a raw request into a runnable configuration.
    ///
    /// Fails before anything is written: bad selectors, a missing or
    /// non-directory root, a directory output target, and out-of-range
    /// worker counts are all rejected here.
    pub fn from_request(request: ScanRequest) -> Result<Self, ConfigError> {
        let format = ReportFormat::parse(&request.format)?;
        let compression = Compression::parse(&request.compress)?;

        #[cfg(not(feature = "zstd"))]
        if format == ReportFormat::Text && compression == Compression::Zstd {
            return Err(ConfigError::CompressionUnavailable {
                value: request.compress.clone(),
            });
        }

        let root_meta = std::fs::metadata(&request.root).map_err(|e| {
            ConfigError::RootNotAccessible {
                path: request.root.clone(),
                reason: e.to_string(),
            }
        })?;
        if !root_meta.is_dir() {
            return Err(ConfigError::RootNotADirectory {
                path: request.root.clone(),
            });
        }

        let worker_count = match request.max_threads {
            Some(n) if n == 0 || n > MAX_WORKERS => {
                return Err(ConfigError::InvalidWorkerCount {
                    count: n,
                    max: MAX_WORKERS,
                });
            }
            Some(n) => n,
            None => default_workers(),
        };

        let output_path = resolve_output_path(request.output, format, compression)?;

        let skip_names = if request.skip_snapshot_dirs {
            vec![OsString::from(SNAPSHOT_DIR_NAME)]
        } else {
            Vec::new()
        };

        Ok(Self {
            root: request.root,
            output_path,
            format,
            compression,
            worker_count,
            skip_names,
            follow_symlinks: request.follow_symlinks,
        })
    }

    /// True if a directory with this name must not be expanded
    pub fn skip_name(&self, name: &std::ffi::OsStr) -> bool {
        self.skip_names.iter().any(|skip| skip.as_os_str() == name)
    }
}

/// Resolve the output path, deriving the default name from the format
/// when none is given. An existing directory is rejected.
fn resolve_output_path(
    output: Option<PathBuf>,
    format: ReportFormat,
    compression: Compression,
) -> Result<PathBuf, ConfigError> {
    let path = match output {
        Some(path) => path,
        None => {
            let name = match (format, compression) {
                (ReportFormat::Text, Compression::None) => {
                    format!("{}.csv", DEFAULT_OUTPUT_STEM)
                }
                (ReportFormat::Text, Compression::Zstd) => {
                    format!("{}.csv.zst", DEFAULT_OUTPUT_STEM)
                }
                (ReportFormat::Columnar, _) => format!("{}.parquet", DEFAULT_OUTPUT_STEM),
            };
            PathBuf::from(name)
        }
    };

    if path.is_dir() {
        return Err(ConfigError::OutputIsDirectory { path });
    }

    Ok(path)
}

/// Default worker count: the first valid environment-provided CPU
/// allotment, otherwise the detected core count.
pub fn default_workers() -> usize {
    CPU_ALLOTMENT_VARS
        .iter()
        .filter_map(|var| env::var(var).ok())
        .filter_map(|v| v.parse::<usize>().ok())
        .find(|&n| n > 0 && n <= MAX_WORKERS)
        .unwrap_or_else(num_cpus::get)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!(ReportFormat::parse("text").unwrap(), ReportFormat::Text);
        assert_eq!(
            ReportFormat::parse("columnar").unwrap(),
            ReportFormat::Columnar
        );
        assert!(matches!(
            ReportFormat::parse("json"),
            Err(ConfigError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_compression_parse() {
        assert_eq!(Compression::parse("none").unwrap(), Compression::None);
        assert_eq!(Compression::parse("zstd").unwrap(), Compression::Zstd);
        assert!(matches!(
            Compression::parse("gzip"),
            Err(ConfigError::InvalidCompression { .. })
        ));
    }

    #[test]
    fn test_default_output_names() {
        let csv =
            resolve_output_path(None, ReportFormat::Text, Compression::None).unwrap();
        assert_eq!(csv, PathBuf::from("scan.csv"));

        let zst =
            resolve_output_path(None, ReportFormat::Text, Compression::Zstd).unwrap();
        assert_eq!(zst, PathBuf::from("scan.csv.zst"));

        let parquet =
            resolve_output_path(None, ReportFormat::Columnar, Compression::Zstd).unwrap();
        assert_eq!(parquet, PathBuf::from("scan.parquet"));
    }

    #[test]
    fn test_output_directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_output_path(
            Some(dir.path().to_path_buf()),
            ReportFormat::Text,
            Compression::None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::OutputIsDirectory { .. }));
    }

    #[test]
    fn test_request_validation() {
        let dir = tempfile::tempdir().unwrap();

        let mut request = ScanRequest::new(dir.path());
        request.output = Some(dir.path().join("out.csv"));
        let config = ScanConfig::from_request(request.clone()).unwrap();
        assert_eq!(config.format, ReportFormat::Text);
        assert!(config.skip_name(std::ffi::OsStr::new(".snapshot")));
        assert!(!config.skip_name(std::ffi::OsStr::new("data")));
        assert!(config.worker_count >= 1);

        request.format = "invalid".into();
        assert!(matches!(
            ScanConfig::from_request(request.clone()),
            Err(ConfigError::InvalidFormat { .. })
        ));

        request.format = "text".into();
        request.compress = "lz4".into();
        assert!(matches!(
            ScanConfig::from_request(request.clone()),
            Err(ConfigError::InvalidCompression { .. })
        ));

        request.compress = "none".into();
        request.max_threads = Some(0);
        assert!(matches!(
            ScanConfig::from_request(request.clone()),
            Err(ConfigError::InvalidWorkerCount { .. })
        ));
    }

    #[test]
    fn test_missing_root_rejected() {
        let request = ScanRequest::new("/definitely/not/a/real/path");
        assert!(matches!(
            ScanConfig::from_request(request),
            Err(ConfigError::RootNotAccessible { .. })
        ));
    }

    #[test]
    fn test_root_must_be_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        std::fs::write(&file, b"x").unwrap();

        let request = ScanRequest::new(&file);
        assert!(matches!(
            ScanConfig::from_request(request),
            Err(ConfigError::RootNotADirectory { .. })
        ));
    }

    #[test]
    fn test_snapshots_included_on_request() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = ScanRequest::new(dir.path());
        request.output = Some(dir.path().join("out.csv"));
        request.skip_snapshot_dirs = false;

        let config = ScanConfig::from_request(request).unwrap();
        assert!(!config.skip_name(std::ffi::OsStr::new(".snapshot")));
    }
}
