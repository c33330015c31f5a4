//! Pipeline orchestrator.
//!
//! Drains ready paths sequentially: content hash → dedup check → convert +
//! transcribe → persist → notify. All heavy work happens on this single
//! loop, so no two files are ever transcribed concurrently. Failures are
//! strictly per-file: each outcome becomes a log entry and the loop moves
//! on; nothing here aborts the process.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::adapters::Notifier;
use crate::domain::{record::preview, NewTranscript, ProcessOutcome, SkipReason};
use crate::settings::SettingsSource;
use crate::store::{StoreError, TranscriptStore};

use super::hash::content_hash;
use super::processor::AudioProcessor;

const NOTIFY_PREVIEW_CHARS: usize = 100;

/// How long the in-flight file may keep running after a stop is signalled.
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// What happened to one ready path. Returned for tests and logging; never
/// propagated as an error.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineResult {
    /// Transcript persisted under this record id.
    Recorded(i64),

    /// Content hash already in the store; nothing to do.
    Duplicate,

    /// Hashing failed (file vanished or unreadable). Transient; the next
    /// event retries naturally.
    ReadFailed(String),

    /// Processor skipped the file.
    Skipped(SkipReason),

    /// Engine returned an empty transcript; file left unrecorded.
    NoTranscript,

    /// Conversion or engine failure; file abandoned for this run.
    Failed(String),
}

/// The control loop tying watcher output to the store.
pub struct Pipeline {
    store: TranscriptStore,
    processor: AudioProcessor,
    settings: SettingsSource,
    notifier: Arc<dyn Notifier>,
    shutdown_grace: Duration,
}

impl Pipeline {
    pub fn new(
        store: TranscriptStore,
        processor: AudioProcessor,
        settings: SettingsSource,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            processor,
            settings,
            notifier,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Drain the ready channel until it closes or a stop is signalled.
    ///
    /// A stop terminates the loop without draining the backlog: at most the
    /// in-flight file continues, bounded by the shutdown grace period.
    /// Abandoning it drops the processing future, which kills any external
    /// child still running (children are spawned kill-on-drop).
    pub async fn run(
        &self,
        mut ready_rx: mpsc::Receiver<PathBuf>,
        mut stop_rx: watch::Receiver<bool>,
    ) {
        loop {
            if *stop_rx.borrow() {
                info!("stop requested, pipeline stopping");
                break;
            }

            let path = tokio::select! {
                _ = stop_rx.changed() => {
                    info!("stop requested, pipeline stopping");
                    break;
                }
                next = ready_rx.recv() => match next {
                    Some(path) => path,
                    None => {
                        info!("ready channel closed, pipeline stopping");
                        break;
                    }
                },
            };

            tokio::select! {
                _ = self.process_ready(&path) => {}
                _ = stop_then_grace(&mut stop_rx, self.shutdown_grace) => {
                    warn!(path = %path.display(), "grace period elapsed, abandoning in-flight file");
                    break;
                }
            }
        }
    }

    /// Run one ready path through the full pipeline.
    pub async fn process_ready(&self, path: &Path) -> PipelineResult {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let hash = match content_hash(path).await {
            Ok(h) => h,
            Err(e) => {
                info!(file = %filename, error = %e, "could not hash file, will retry on next event");
                return PipelineResult::ReadFailed(e.to_string());
            }
        };

        match self.store.exists(&hash) {
            Ok(true) => {
                info!(file = %filename, "already transcribed, skipping");
                return PipelineResult::Duplicate;
            }
            Ok(false) => {}
            Err(e) => {
                error!(file = %filename, error = %e, "dedup check failed");
                return PipelineResult::Failed(e.to_string());
            }
        }

        // Read fresh per file so a preference change applies to the next
        // recording, not the next restart.
        let language = self.settings.language();
        info!(file = %filename, language = %language, "processing");

        let transcription = match self.processor.process(path, &language).await {
            ProcessOutcome::Transcribed(t) => t,
            ProcessOutcome::Skipped(reason) => {
                info!(file = %filename, %reason, "skipped");
                return PipelineResult::Skipped(reason);
            }
            ProcessOutcome::NoTranscript => {
                warn!(file = %filename, "no transcript produced, leaving file unrecorded");
                return PipelineResult::NoTranscript;
            }
            ProcessOutcome::Failed(kind) => {
                warn!(file = %filename, error = %kind, "processing failed");
                return PipelineResult::Failed(kind.to_string());
            }
        };

        let new = NewTranscript {
            filename: filename.clone(),
            original_path: path.to_path_buf(),
            content_hash: hash,
            transcript: transcription.text,
            duration_seconds: transcription.duration_seconds,
            language: transcription.language,
        };

        let id = match self.store.insert(&new) {
            Ok(id) => id,
            Err(StoreError::DuplicateHash(h)) => {
                // Should be impossible under the serialized loop; if it
                // fires, the dedup check raced an insert.
                error!(file = %filename, hash = %h, "duplicate hash on insert, dedup race");
                return PipelineResult::Duplicate;
            }
            Err(e) => {
                error!(file = %filename, error = %e, "failed to persist transcript");
                return PipelineResult::Failed(e.to_string());
            }
        };

        info!(file = %filename, id, "transcript recorded");
        self.notifier
            .notify(
                "Transcription Complete",
                &preview(&new.transcript, NOTIFY_PREVIEW_CHARS),
            )
            .await;

        PipelineResult::Recorded(id)
    }
}

/// Resolves once a stop has been signalled and the grace period has elapsed.
/// Never resolves while no stop is pending; a dropped stop sender without a
/// signal means the loop runs until the ready channel closes.
async fn stop_then_grace(stop_rx: &mut watch::Receiver<bool>, grace: Duration) {
    let already_stopped = *stop_rx.borrow();
    if !already_stopped && stop_rx.changed().await.is_err() {
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(grace).await;
}
