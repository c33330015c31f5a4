//! Transcript records stored in the database.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A durable transcript record. One row per distinct audio content,
/// keyed by `content_hash` (unique).
///
/// Records are created only after transcription produced text; there is
/// no placeholder state. `None` in `transcript` never occurs for rows
/// written by this process (the column is nullable for compatibility with
/// externally written rows).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    /// Row id, assigned by the store on insert. Immutable.
    pub id: i64,

    /// Display name of the source file at time of processing.
    pub filename: String,

    /// Absolute path to the source file. The record only references it;
    /// the file itself is owned by the filesystem.
    pub original_path: PathBuf,

    /// SHA-256 hex digest of the file bytes. Unique across all records.
    pub content_hash: String,

    /// Transcript text, present once transcription succeeded.
    pub transcript: Option<String>,

    /// Best-effort audio duration; 0.0 when undeterminable.
    pub duration_seconds: f64,

    /// Language code used for transcription, or "auto".
    pub language: String,

    /// When the record was inserted. Set once.
    pub created_at: DateTime<Utc>,

    /// When transcription completed successfully.
    pub transcribed_at: Option<DateTime<Utc>>,
}

/// Input for inserting a new record. The store assigns `id`, `created_at`
/// and `transcribed_at`.
#[derive(Debug, Clone)]
pub struct NewTranscript {
    pub filename: String,
    pub original_path: PathBuf,
    pub content_hash: String,
    pub transcript: String,
    pub duration_seconds: f64,
    pub language: String,
}

impl TranscriptRecord {
    /// Short transcript preview for notifications and listings.
    pub fn preview(&self, max_chars: usize) -> String {
        preview(self.transcript.as_deref().unwrap_or(""), max_chars)
    }
}

/// Truncate text to `max_chars`, appending an ellipsis when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_short_text_unchanged() {
        assert_eq!(preview("hello", 100), "hello");
    }

    #[test]
    fn preview_long_text_truncated() {
        let text = "a".repeat(150);
        let p = preview(&text, 100);
        assert_eq!(p.len(), 103);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn preview_is_char_safe() {
        let text = "åäö".repeat(50);
        let p = preview(&text, 100);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), 103);
    }
}
