//! Audio ingestion pipeline.
//!
//! Recordings flow through the stages in order:
//!
//! ```text
//! filesystem events → watcher (debounce) ─┐
//!                                         ├→ ready channel → pipeline
//! existing files → backfill scanner ──────┘        │
//!                                    hash → dedup → convert+transcribe
//!                                           → store → notify
//! ```
//!
//! The watcher and scanner feed one queue; the pipeline drains it on a
//! single loop with per-file error isolation.

pub mod hash;
pub mod pipeline;
pub mod processor;
pub mod scanner;
pub mod watcher;

pub use hash::{content_hash, ReadError};
pub use pipeline::{Pipeline, PipelineResult};
pub use processor::{AudioProcessor, ProcessorConfig};
pub use scanner::{parse_filename_timestamp, BackfillScanner, ScanConfig, ScanSummary};
pub use watcher::{DebouncedWatcher, WatchConfig, WatchHandle, WatcherError};
