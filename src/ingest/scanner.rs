//! Backfill scanner.
//!
//! One-shot pass over files that existed before the watcher started: the
//! primary recordings directory (bounded by a recency window derived from
//! filename-embedded timestamps) and the manual drop folder (no age bound).
//! Candidates go into the same ready channel as live events, so anything
//! already in the store is a cheap dedup no-op downstream.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Configuration for a backfill pass.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Primary watched directory (recency-bounded).
    pub watch_dir: PathBuf,

    /// Manual drop folder (all files, any age).
    pub input_dir: PathBuf,

    /// Recency window for the watched directory.
    pub backfill_days: i64,

    /// Accepted extensions, lowercase.
    pub extensions: Vec<String>,
}

/// What a backfill pass found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanSummary {
    /// Candidates pushed into the ready channel.
    pub queued: usize,

    /// Files skipped because their filename timestamp fell outside the
    /// recency window.
    pub too_old: usize,

    /// Non-audio entries ignored.
    pub ignored: usize,
}

/// Feeds existing files through the pipeline's ready channel.
pub struct BackfillScanner {
    config: ScanConfig,
}

impl BackfillScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Run one backfill pass, sending candidates on `ready_tx`.
    pub async fn run(&self, ready_tx: &mpsc::Sender<PathBuf>) -> Result<ScanSummary> {
        let mut summary = ScanSummary::default();
        let cutoff = Local::now().naive_local() - ChronoDuration::days(self.config.backfill_days);

        if self.config.watch_dir.is_dir() {
            self.scan_dir(&self.config.watch_dir, Some(cutoff), ready_tx, &mut summary)
                .await?;
        } else {
            warn!(path = %self.config.watch_dir.display(), "watch directory missing, skipping backfill");
        }

        if self.config.input_dir.is_dir() {
            self.scan_dir(&self.config.input_dir, None, ready_tx, &mut summary)
                .await?;
        }

        info!(
            queued = summary.queued,
            too_old = summary.too_old,
            ignored = summary.ignored,
            "backfill scan complete"
        );
        Ok(summary)
    }

    async fn scan_dir(
        &self,
        dir: &Path,
        cutoff: Option<NaiveDateTime>,
        ready_tx: &mpsc::Sender<PathBuf>,
        summary: &mut ScanSummary,
    ) -> Result<()> {
        let mut entries = tokio::fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if !self.is_audio(&path) {
                summary.ignored += 1;
                continue;
            }

            if let Some(cutoff) = cutoff {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                // Undated filenames are always included rather than
                // silently dropped.
                if let Some(ts) = parse_filename_timestamp(&name) {
                    if ts < cutoff {
                        summary.too_old += 1;
                        continue;
                    }
                }
            }

            if ready_tx.send(path).await.is_err() {
                break;
            }
            summary.queued += 1;
        }

        Ok(())
    }

    fn is_audio(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.config
                    .extensions
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

/// Parse the timestamp Voice Memos embeds in filenames, e.g.
/// `20251212 013354-3A5F.m4a` → 2025-12-12 01:33:54. Returns `None` for
/// any other shape.
pub fn parse_filename_timestamp(filename: &str) -> Option<NaiveDateTime> {
    let date: String = filename.chars().take(8).collect();
    if date.len() != 8 || !date.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let rest = filename[8..].trim_start();
    let time: String = rest.chars().take(6).collect();
    if time.len() != 6 || !time.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    NaiveDateTime::parse_from_str(&format!("{}{}", date, time), "%Y%m%d%H%M%S").ok()
}
