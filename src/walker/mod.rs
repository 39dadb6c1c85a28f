//! Parallel traversal engine
//!
//! A fixed pool of worker threads expands directories from a shared work
//! queue while an in-memory node tree performs the bottom-up aggregation
//! inline, so directory totals come out of the same single pass that
//! lists the tree.
//!
//! # Architecture
//!
//! ```text
//!                  ┌───────────────────────────┐
//!                  │      ScanCoordinator      │
//!                  │  - seeds the root task    │
//!                  │  - watches for completion │
//!                  └─────────────┬─────────────┘
//!                                │
//!        ┌───────────────────────┼───────────────────────┐
//!        │                       │                       │
//!  ┌─────▼─────┐           ┌─────▼─────┐           ┌─────▼─────┐
//!  │  Worker 1 │           │  Worker 2 │           │  Worker N │
//!  │  readdir  │           │  readdir  │           │  readdir  │
//!  │  + lstat  │           │  + lstat  │           │  + lstat  │
//!  └─────┬─────┘           └─────┬─────┘           └─────┬─────┘
//!        │        fold-up        │        fold-up        │
//!        └───────────────────────┼───────────────────────┘
//!                                ▼
//!                  ┌───────────────────────────┐
//!                  │        NodeTree           │
//!                  │  open dirs + accumulators │
//!                  └─────────────┬─────────────┘
//!                                │ finalized records
//!                                ▼
//!                  ┌───────────────────────────┐
//!                  │       ReportWriter        │
//!                  │   (single writer thread)  │
//!                  └───────────────────────────┘
//! ```

pub mod coordinator;
pub mod queue;
pub mod tree;
pub mod worker;

pub use coordinator::{ScanCoordinator, ScanOutcome, ScanSummary};
pub use queue::{DirTask, WorkQueue};
pub use tree::{DirNode, NodeId, NodeTree};
pub use worker::{Worker, WorkerStats};
