//! memoscribe - voice memo ingestion and transcription service
//!
//! Watches recording directories for new audio files, deduplicates them by
//! content hash, converts and transcribes each exactly once via external
//! tools (ffmpeg + whisper.cpp), and persists transcripts in SQLite.
//!
//! # Modules
//!
//! - `ingest`: watcher, backfill scanner, processor and pipeline loop
//! - `store`: durable transcript records
//! - `adapters`: external tool invocation (ffmpeg, whisper, notifications)
//! - `config` / `settings`: resolved paths and the mutable language preference
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Watch for new recordings (backfills first)
//! memoscribe watch
//!
//! # One-shot backfill of existing files
//! memoscribe scan
//!
//! # Browse what has been transcribed
//! memoscribe list
//! memoscribe search "standup"
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod ingest;
pub mod settings;
pub mod store;

// Re-export main types at crate root for convenience
pub use config::{ResolvedConfig, ToolConfig};
pub use domain::{NewTranscript, ProcessOutcome, TranscriptRecord};
pub use ingest::{
    AudioProcessor, BackfillScanner, DebouncedWatcher, Pipeline, PipelineResult, ProcessorConfig,
    ScanConfig, WatchConfig,
};
pub use settings::SettingsSource;
pub use store::{StoreError, TranscriptStore};
