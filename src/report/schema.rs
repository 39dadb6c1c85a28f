//! Canonical Arrow schema for the columnar report
//!
//! Single source of truth for the 18-column schema. The schema is
//! identical across runs regardless of the data observed, so downstream
//! tools can rely on column presence and types even for empty scans.
//! Nothing is nullable: rows carry sentinel values instead of nulls
//! (`file_count = -1` and `dir_sum = 0` on non-directory rows).

use arrow::datatypes::{DataType, Field, Schema};
use std::sync::Arc;

/// Build the canonical Arrow schema for inventory records.
pub fn report_schema() -> Schema {
    Schema::new(vec![
        Field::new("inode", DataType::UInt64, false),
        Field::new("parent_inode", DataType::UInt64, false),
        Field::new("depth", DataType::UInt32, false),
        Field::new("filename", DataType::Utf8, false),
        Field::new("extension", DataType::Utf8, false),
        Field::new("uid", DataType::UInt32, false),
        Field::new("gid", DataType::UInt32, false),
        Field::new("size", DataType::UInt64, false),
        Field::new("st_dev", DataType::UInt64, false),
        Field::new("st_blocks", DataType::UInt64, false),
        Field::new("st_nlink", DataType::UInt64, false),
        Field::new("st_mode", DataType::UInt32, false),
        Field::new("atime", DataType::Int64, false),
        Field::new("mtime", DataType::Int64, false),
        Field::new("ctime", DataType::Int64, false),
        Field::new("file_count", DataType::Int64, false),
        Field::new("dir_sum", DataType::Int64, false),
        Field::new("is_hardlink", DataType::Boolean, false),
    ])
}

/// Get the schema wrapped in an Arc (for Arrow writer APIs).
pub fn report_schema_ref() -> Arc<Schema> {
    Arc::new(report_schema())
}
