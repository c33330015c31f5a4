//! Per-file outcomes of the conversion/transcription stage.
//!
//! The orchestrator inspects these instead of relying on exceptions or
//! sentinel values. A skip is not a failure: the file stays eligible for
//! a future event.

use std::fmt;

/// Why a file was skipped without being treated as an error.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Below the minimum size threshold, likely still being written.
    TooSmall { size: u64 },

    /// Extension not in the supported audio set.
    UnsupportedExtension,

    /// File disappeared before or during processing.
    Vanished,
}

/// Hard failures that abandon the file (logged; operator can re-drop it).
#[derive(Debug, Clone, PartialEq)]
pub enum FailureKind {
    /// External converter exited non-zero or produced no output.
    ConversionFailed(String),

    /// Transcription engine could not be invoked.
    EngineFailed(String),
}

/// A successful transcription, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    pub text: String,
    pub duration_seconds: f64,
    pub language: String,
}

/// Result of running one file through conversion and transcription.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// No-op skip; the file may come back on a later event.
    Skipped(SkipReason),

    /// Transcript produced.
    Transcribed(Transcription),

    /// Engine ran but returned nothing. Distinct from failure: the file
    /// is not recorded and stays eligible for retry.
    NoTranscript,

    /// Hard failure; the file is abandoned for this run.
    Failed(FailureKind),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TooSmall { size } => write!(f, "too small ({} bytes)", size),
            SkipReason::UnsupportedExtension => write!(f, "unsupported extension"),
            SkipReason::Vanished => write!(f, "file vanished"),
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::ConversionFailed(msg) => write!(f, "conversion failed: {}", msg),
            FailureKind::EngineFailed(msg) => write!(f, "transcription engine failed: {}", msg),
        }
    }
}
