//! Durable transcript store backed by SQLite.
//!
//! Source of truth for dedup and for downstream display. Every call is a
//! short, independent transaction; nothing holds the connection across
//! pipeline stages. The `content_hash` column carries a UNIQUE constraint,
//! which is the dedup invariant: a violation on insert means the
//! check-then-insert sequence raced and must be surfaced, not swallowed.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;

use crate::domain::{NewTranscript, TranscriptRecord};

/// Errors from the transcript store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with this content hash already exists. The only
    /// correctness-critical store error: under the serialized pipeline it
    /// indicates a dedup race.
    #[error("duplicate content hash: {0}")]
    DuplicateHash(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle to the transcript database. Opened once at process start;
/// schema is created if absent.
pub struct TranscriptStore {
    conn: Connection,
}

impl TranscriptStore {
    /// Open (or create) the database at `path`. Failure here is fatal to
    /// the process; the caller does not catch it per-file.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory store. Test convenience.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS transcripts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                original_path TEXT NOT NULL,
                content_hash TEXT UNIQUE NOT NULL,
                transcript TEXT,
                duration_seconds REAL NOT NULL DEFAULT 0,
                language TEXT NOT NULL DEFAULT 'auto',
                created_at TEXT NOT NULL,
                transcribed_at TEXT
            )",
            [],
        )?;
        Ok(())
    }

    /// Dedup check: is this content hash already recorded?
    pub fn exists(&self, content_hash: &str) -> Result<bool, StoreError> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM transcripts WHERE content_hash = ?1",
                params![content_hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Insert a finished transcript. Returns the assigned row id, or
    /// `DuplicateHash` when the content hash is already present.
    pub fn insert(&self, new: &NewTranscript) -> Result<i64, StoreError> {
        let now = Utc::now();
        let result = self.conn.execute(
            "INSERT INTO transcripts
                (filename, original_path, content_hash, transcript,
                 duration_seconds, language, created_at, transcribed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                new.filename,
                new.original_path.to_string_lossy(),
                new.content_hash,
                new.transcript,
                new.duration_seconds,
                new.language,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::DuplicateHash(new.content_hash.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch a record by id.
    pub fn get(&self, id: i64) -> Result<Option<TranscriptRecord>, StoreError> {
        let record = self
            .conn
            .query_row(
                "SELECT id, filename, original_path, content_hash, transcript,
                        duration_seconds, language, created_at, transcribed_at
                 FROM transcripts WHERE id = ?1",
                params![id],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// List records, most recently transcribed first.
    pub fn list(&self, limit: usize) -> Result<Vec<TranscriptRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, filename, original_path, content_hash, transcript,
                    duration_seconds, language, created_at, transcribed_at
             FROM transcripts
             ORDER BY transcribed_at DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], row_to_record)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Search transcripts and filenames by substring.
    pub fn search(&self, query: &str) -> Result<Vec<TranscriptRecord>, StoreError> {
        let pattern = format!("%{}%", query);
        let mut stmt = self.conn.prepare(
            "SELECT id, filename, original_path, content_hash, transcript,
                    duration_seconds, language, created_at, transcribed_at
             FROM transcripts
             WHERE transcript LIKE ?1 OR filename LIKE ?1
             ORDER BY transcribed_at DESC",
        )?;
        let rows = stmt.query_map(params![pattern], row_to_record)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Delete a record by id. Returns whether a row was removed. Owned by
    /// the external viewer; uniqueness is unaffected.
    pub fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let affected = self
            .conn
            .execute("DELETE FROM transcripts WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    /// Total number of records.
    pub fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM transcripts", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

/// Only a UNIQUE violation is a dedup race; other constraint failures
/// (NOT NULL, CHECK) are ordinary store errors.
fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<TranscriptRecord> {
    let original_path: String = row.get(2)?;
    let created_at: String = row.get(7)?;
    let transcribed_at: Option<String> = row.get(8)?;

    Ok(TranscriptRecord {
        id: row.get(0)?,
        filename: row.get(1)?,
        original_path: PathBuf::from(original_path),
        content_hash: row.get(3)?,
        transcript: row.get(4)?,
        duration_seconds: row.get(5)?,
        language: row.get(6)?,
        created_at: parse_timestamp(&created_at),
        transcribed_at: transcribed_at.as_deref().map(parse_timestamp),
    })
}

/// Timestamps are stored as RFC 3339. Rows written by other tools may hold
/// arbitrary strings; fall back to the epoch rather than failing the read.
fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| DateTime::<Utc>::UNIX_EPOCH)
}
