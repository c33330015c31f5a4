//! Domain types for the transcription service.
//!
//! - `TranscriptRecord`: one durable row per distinct audio content
//! - `ProcessOutcome`: per-file result of the conversion/transcription stage

pub mod outcome;
pub mod record;

pub use outcome::{FailureKind, ProcessOutcome, SkipReason, Transcription};
pub use record::{NewTranscript, TranscriptRecord};
