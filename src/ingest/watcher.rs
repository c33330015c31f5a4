//! Debounced filesystem watcher.
//!
//! Voice-recording apps write files incrementally, so acting on the raw
//! creation event would read a truncated file. Each observed path moves
//! through `Unseen → Pending(last_event) → Ready`: any create/modify event
//! (re)stamps the pending entry, and a periodic sweep promotes paths that
//! have stayed quiet for the full quiescence window. A promoted path is
//! handed to the pipeline exactly once and forgotten; if it changes again
//! later, a fresh cycle starts.
//!
//! Event delivery runs on notify's own thread and only sends on a channel;
//! the pending map is owned by the single watcher task, so there is no
//! shared mutable state to lock.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Errors that can occur setting up the watcher.
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("no watchable directory exists among {0:?}")]
    NoWatchableDirectory(Vec<PathBuf>),

    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for the debounced watcher.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Directories to observe (non-recursive). Missing ones are skipped
    /// with a warning; at least one must exist.
    pub paths: Vec<PathBuf>,

    /// How long a path must stay quiet before promotion.
    pub quiescence: Duration,

    /// Sweep interval.
    pub sweep_tick: Duration,

    /// Accepted extensions, lowercase.
    pub extensions: Vec<String>,
}

/// Watches directories and emits quiesced paths on a channel.
pub struct DebouncedWatcher {
    config: WatchConfig,
}

/// Handle to stop a running watcher.
pub struct WatchHandle {
    stop_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl WatchHandle {
    pub async fn stop(self) -> anyhow::Result<()> {
        let _ = self.stop_tx.send(()).await;
        self.task.await?;
        Ok(())
    }
}

impl DebouncedWatcher {
    pub fn new(config: WatchConfig) -> Self {
        Self { config }
    }

    /// Start watching, sending ready paths on `ready_tx`. The backfill
    /// scanner feeds the same channel, so the pipeline drains one queue.
    pub fn watch(&self, ready_tx: mpsc::Sender<PathBuf>) -> Result<WatchHandle, WatcherError> {
        let existing: Vec<PathBuf> = self
            .config
            .paths
            .iter()
            .filter(|p| p.is_dir())
            .cloned()
            .collect();

        if existing.is_empty() {
            return Err(WatcherError::NoWatchableDirectory(self.config.paths.clone()));
        }
        for missing in self.config.paths.iter().filter(|p| !p.is_dir()) {
            warn!(path = %missing.display(), "watch directory missing, skipping");
        }

        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);

        let config = self.config.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = run_watcher(config, existing, ready_tx, &mut stop_rx).await {
                warn!(error = %e, "watcher loop exited with error");
            }
        });

        Ok(WatchHandle { stop_tx, task })
    }
}

/// Internal watcher loop: drain events into the pending map, sweep, repeat.
async fn run_watcher(
    config: WatchConfig,
    dirs: Vec<PathBuf>,
    ready_tx: mpsc::Sender<PathBuf>,
    stop_rx: &mut mpsc::Receiver<()>,
) -> anyhow::Result<()> {
    let mut pending: HashMap<PathBuf, Instant> = HashMap::new();

    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;
    for dir in &dirs {
        debouncer.watcher().watch(dir, RecursiveMode::NonRecursive)?;
        info!(path = %dir.display(), "watching for new recordings");
    }

    loop {
        if stop_rx.try_recv().is_ok() {
            info!("watcher stopping");
            break;
        }

        // Drain file events (bounded wait keeps the sweep ticking).
        match rx.recv_timeout(config.sweep_tick) {
            Ok(Ok(events)) => {
                let now = Instant::now();
                for event in events {
                    if is_audio_candidate(&event.path, &config.extensions) {
                        pending.insert(event.path, now);
                    }
                }
                // Keep draining without blocking so a burst of events is
                // absorbed in one pass.
                while let Ok(batch) = rx.try_recv() {
                    if let Ok(events) = batch {
                        let now = Instant::now();
                        for event in events {
                            if is_audio_candidate(&event.path, &config.extensions) {
                                pending.insert(event.path, now);
                            }
                        }
                    }
                }
            }
            Ok(Err(e)) => warn!(error = ?e, "filesystem notification error"),
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                warn!("notification channel disconnected");
                break;
            }
        }

        for path in promote_quiet(&mut pending, Instant::now(), config.quiescence) {
            info!(path = %path.display(), "file quiesced, ready for processing");
            if ready_tx.send(path).await.is_err() {
                // Pipeline went away; nothing left to do.
                return Ok(());
            }
        }

        // Yield so the rest of the runtime makes progress between ticks.
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    Ok(())
}

/// Remove and return every pending path whose last event is older than the
/// quiescence window. Promotion is exactly-once: promoted entries leave the
/// map.
fn promote_quiet(
    pending: &mut HashMap<PathBuf, Instant>,
    now: Instant,
    window: Duration,
) -> Vec<PathBuf> {
    let ready: Vec<PathBuf> = pending
        .iter()
        .filter(|(_, last)| now.duration_since(**last) > window)
        .map(|(path, _)| path.clone())
        .collect();

    for path in &ready {
        pending.remove(path);
    }
    ready
}

fn is_audio_candidate(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
